use std::{fmt, io};
use std::path::Path;
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::sync::Arc;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The build-time error taxonomy. Every variant is a data-correctness problem:
/// none of them is transient and none of them is worth retrying.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The front matter block is unterminated, unparseable, or lacks a
    /// required key (`title`, `layout`, `date`), or its date is unusable.
    MalformedFrontMatter,
    /// The document body is empty.
    EmptyBody,
    /// A document or layout names a layout that doesn't exist.
    UnknownLayout,
    /// A layout chain is longer than `maxLayoutChainDepth`.
    LayoutChainTooDeep,
    /// A layout chain revisits a layout.
    LayoutCycle,
    /// A layout template has no `content` slot.
    MissingSlot,
    /// A timezone name isn't a known IANA zone.
    UnknownTimezone,
    /// Two documents map to the same permalink.
    PermalinkCollision,
    /// A code region names a language with no highlighter and plain fallback
    /// was switched off.
    UnknownLanguage,
    /// The configuration file is unreadable or holds an invalid value.
    InvalidConfig,
    /// Reading sources or writing artifacts failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedFrontMatter => "malformed front matter",
            ErrorKind::EmptyBody => "empty body",
            ErrorKind::UnknownLayout => "unknown layout",
            ErrorKind::LayoutChainTooDeep => "layout chain too deep",
            ErrorKind::LayoutCycle => "layout cycle",
            ErrorKind::MissingSlot => "missing content slot",
            ErrorKind::UnknownTimezone => "unknown timezone",
            ErrorKind::PermalinkCollision => "permalink collision",
            ErrorKind::UnknownLanguage => "unknown code language",
            ErrorKind::InvalidConfig => "invalid configuration",
            ErrorKind::Io => "i/o failure",
        };

        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: Option<ErrorKind>,
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    pub fn from_detail(detail: &dyn ErrorDetail) -> Self {
        Error::from(MakeshiftError::from(detail))
    }

    /// Tags `self` with `kind`. An existing tag is kept.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind.get_or_insert(kind);
        self
    }

    /// The kind of this error: the outermost tag in the chain, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind.or_else(|| self.prev.as_ref().and_then(|prev| prev.kind()))
    }

    /// Returns `true` if this error is tagged with `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }

    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty) => {
        impl $crate::error::ErrorDetail for $T {
            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error);
impl_error_detail_with_std_error!(toml::de::Error);
impl_error_detail_with_std_error!(serde_yaml_ng::Error);
impl_error_detail_with_std_error!(jwalk::Error);
impl_error_detail_with_std_error!(syntect::Error);

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            kind: self.kind,
            detail: self.detail.iter()
                .map(|detail| MakeshiftError::from(&**detail))
                .map(|error| Box::new(error) as Box<dyn ErrorDetail>)
                .collect(),
            prev: self.prev.clone(),
            _location: self._location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            kind: None,
            prev: None,
            detail: vec![Box::new(detail)],
            _location: std::panic::Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    match e.kind {
                        Some(kind) => writeln!(f, "{indent}[{kind}] {}",
                            format!("{:#}", detail).replace('\n', &indent_line))?,
                        None => writeln!(f, "{indent}{}",
                            format!("{:#}", detail).replace('\n', &indent_line))?,
                    }

                    if let Some(prev) = &e.prev {
                        NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                    }

                    for (key, value) in detail.context() {
                        let value = value.to_string().replace('\n', &indent_line);
                        if let Some(key) = key {
                            writeln!(f, "{indent}{key}: {value}")?;
                        } else {
                            writeln!(f, "{indent}{value}")?;
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
}

impl From<&dyn ErrorDetail> for MakeshiftError {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        MakeshiftError {
            message: detail.to_string(),
            parameters: detail.context()
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

/// Like [`error!`], but tags the error with an [`ErrorKind`] variant.
///
/// ```rust
/// use quire::error::ErrorKind;
///
/// let error = quire::fault!(UnknownLayout, "no such layout", "layout" => "post");
/// assert_eq!(error.kind(), Some(ErrorKind::UnknownLayout));
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! fault {
    ($kind:ident, $($token:tt)*) => (
        $crate::error!($($token)*).with_kind($crate::error::ErrorKind::$kind)
    );
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

impl ErrorDetail for Infallible {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

/// What a reported [`Failure`] is attributable to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Subject {
    /// A layout, by name. Layout failures are reported once per layout.
    Layout(Arc<str>),
    /// A document, by source path relative to the posts directory.
    Document(Arc<Path>),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Layout(name) => write!(f, "layout `{name}`"),
            Subject::Document(path) => write!(f, "document `{}`", path.display()),
        }
    }
}

/// An error attributed to the layout or document that caused it.
#[derive(Debug, Clone)]
pub struct Failure {
    pub subject: Subject,
    pub error: Error,
}

impl Failure {
    pub fn new(subject: Subject, error: Error) -> Self {
        Failure { subject, error }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.kind()
    }

    /// Converts `self` into an [`Error`] that names the subject.
    pub fn into_error(self) -> Error {
        let subject = self.subject.to_string();
        self.error.chain(error!("build aborted", "cause" => subject))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_chaining() {
        let inner = fault!(UnknownTimezone, "unknown timezone", "timezone" => "Mars/Olympus");
        let outer = Err::<(), _>(inner).chain(error!("scheduling failed")).unwrap_err();
        assert_eq!(outer.kind(), Some(ErrorKind::UnknownTimezone));
        assert!(outer.is(ErrorKind::UnknownTimezone));

        let display = outer.to_string();
        assert!(display.contains("scheduling failed"));
        assert!(display.contains("Mars/Olympus"));
    }

    #[test]
    fn outer_kind_wins() {
        let inner = fault!(Io, "read failed");
        let outer = inner.chain(fault!(MalformedFrontMatter, "bad document"));
        assert_eq!(outer.kind(), Some(ErrorKind::MalformedFrontMatter));
        assert_eq!(outer.clone().kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn failure_names_its_subject() {
        let failure = Failure::new(
            Subject::Document(Path::new("2024/hello.html").into()),
            fault!(EmptyBody, "document body is empty"),
        );

        let error = failure.into_error();
        assert_eq!(error.kind(), Some(ErrorKind::EmptyBody));
        assert!(error.to_string().contains("2024/hello.html"));
    }
}

use std::path::Path;
use std::sync::Arc;

use crate::error::{Chainable, Result};
use super::{split, FrontMatter};

/// How a document's body is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Markup {
    /// Literal HTML, optionally with fenced or `<pre><code>` code regions.
    Html,
    /// CommonMark.
    Markdown,
}

impl Markup {
    /// The markup of the file at `path`, by extension, or `None` if `path`
    /// isn't a document.
    ///
    /// ```rust
    /// use std::path::Path;
    /// use quire::document::Markup;
    ///
    /// assert_eq!(Markup::from_path(Path::new("a/b.html")), Some(Markup::Html));
    /// assert_eq!(Markup::from_path(Path::new("b.MD")), Some(Markup::Markdown));
    /// assert_eq!(Markup::from_path(Path::new("b.css")), None);
    /// assert_eq!(Markup::from_path(Path::new("html")), None);
    /// ```
    pub fn from_path(path: &Path) -> Option<Markup> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm") {
            Some(Markup::Html)
        } else if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") {
            Some(Markup::Markdown)
        } else {
            None
        }
    }
}

/// A parsed source document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source path, relative to the posts directory. Unique per document.
    pub path: Arc<Path>,
    pub markup: Markup,
    pub front: FrontMatter,
    /// The raw body, everything after the closing front matter delimiter.
    pub body: String,
}

impl Document {
    /// Reads and parses the document at `root.join(path)`.
    pub fn read(root: &Path, path: Arc<Path>) -> Result<Document> {
        let full = root.join(&path);
        let source = std::fs::read_to_string(&full)
            .chain_with(|| fault!(Io, "failed to read document", "path" => full.display()))?;

        Document::parse(path, &source)
    }

    /// Parses `source`. The markup kind follows `path`'s extension and
    /// defaults to HTML.
    ///
    /// ```rust
    /// use std::path::Path;
    /// use quire::document::{Document, Markup};
    ///
    /// let source = "---\ntitle: Hi\nlayout: post\ndate: 2024-01-01\n---\n# Hello\n";
    /// let doc = Document::parse(Path::new("hi.md").into(), source).unwrap();
    /// assert_eq!(doc.markup, Markup::Markdown);
    /// assert_eq!(doc.front.title, "Hi");
    /// assert_eq!(doc.body, "# Hello\n");
    /// ```
    pub fn parse(path: Arc<Path>, source: &str) -> Result<Document> {
        let (block, body) = split(source)?;
        let front = FrontMatter::parse(block)?;
        if body.trim().is_empty() {
            return Err(fault!(EmptyBody, "document body is empty"));
        }

        Ok(Document {
            markup: Markup::from_path(&path).unwrap_or(Markup::Html),
            path,
            front,
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn parse(source: &str) -> Result<Document> {
        Document::parse(Path::new("2024/post.html").into(), source)
    }

    #[test]
    fn body_is_kept_verbatim() {
        let doc = parse("---\ntitle: T\nlayout: post\ndate: 2024-01-01\n---\n\n<p>a</p>\n\n").unwrap();
        assert_eq!(doc.markup, Markup::Html);
        assert_eq!(doc.body, "\n<p>a</p>\n\n");
        assert_eq!(&*doc.path, Path::new("2024/post.html"));
    }

    #[test]
    fn blank_body() {
        let error = parse("---\ntitle: T\nlayout: post\ndate: 2024-01-01\n---\n \n\t\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::EmptyBody));

        let error = parse("---\ntitle: T\nlayout: post\ndate: 2024-01-01\n---").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::EmptyBody));
    }

    #[test]
    fn front_matter_errors_win() {
        let error = parse("---\ntitle: T\nlayout: post\n---\n").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn read_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let error = Document::read(dir.path(), Path::new("nope.html").into()).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Io));
        assert!(error.to_string().contains("nope.html"));
    }
}

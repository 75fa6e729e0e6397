use std::path::Path;

/// Times the evaluation of an expression and logs the elapsed time at the
/// `debug` level.
macro_rules! time {
    ($label:expr, $($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        log::debug!("{} took {}ms", $label, start.elapsed().as_millis());
        value
    });
}

pub(crate) use time;

/// Transliterate to ASCII and lowercase. Runs of whitespace and separator
/// punctuation (`-`, `_`, `/`, `.`, `:`, ...) become a single hyphen. Every
/// other character is dropped, so `don't` becomes `dont`. Leading and trailing
/// hyphens never appear in the output.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        if ch.is_whitespace() {
            need_dash = !output.is_empty();
            continue;
        }

        for b in deunicode::deunicode_char(ch).unwrap_or("").bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                b if is_separator(b) => need_dash = !output.is_empty(),
                _ => { /* stripped */ }
            }
        }
    }

    output
}

#[inline]
fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'-' | b'_' | b'/' | b'\\' | b'.' | b',' | b':' | b';' | b'|')
}

/// Returns `true` if any component of `path` is hidden (`.`-prefixed) or
/// private (`_`-prefixed).
pub fn is_hidden(path: &Path) -> bool {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|c| (c.starts_with('.') && c != "." && c != "..") || c.starts_with('_'))
}

use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::{SyntaxSet, SyntaxReference};
use syntect::util::LinesWithEndings;
use once_cell::sync::Lazy;

use crate::error::{Chainable, Result};
use super::escape_html;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Tags that name a bundled grammar by another name.
static ALIASES: &[(&str, &str)] = &[
    ("typescript", "js"),
    ("ts", "js"),
    ("tsx", "js"),
    ("jsx", "js"),
    ("javascript", "js"),
    ("node", "js"),
    ("shell", "sh"),
    ("console", "sh"),
    ("zsh", "sh"),
    ("shellscript", "sh"),
    ("yml", "yaml"),
    ("py3", "python"),
    ("c++", "cpp"),
    ("golang", "go"),
    ("objc", "Objective-C"),
];

/// Tags that explicitly ask for no highlighting.
static PLAIN: &[&str] = &["text", "plain", "plaintext", "txt", "nohighlight", "none"];

/// The outcome of resolving a code region's language tag.
#[derive(Debug, Clone, Copy)]
pub enum Language {
    /// A bundled grammar highlights this tag.
    Known(&'static SyntaxReference),
    /// The tag asks for plain code, or there is no tag.
    Plain,
    /// No grammar is known for this tag.
    Unknown,
}

/// Classed-span syntax highlighting over the bundled grammars.
pub struct Highlighter;

impl Highlighter {
    /// Loads the grammars in the background so the first highlighted region
    /// doesn't pay for it.
    #[inline]
    pub fn warm_up() {
        rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
    }

    /// Resolves a language tag (`rust`, `ts`, `Python`, ...).
    ///
    /// ```rust
    /// use quire::markup::{Highlighter, Language};
    ///
    /// assert!(matches!(Highlighter::language(Some("rust")), Language::Known(_)));
    /// assert!(matches!(Highlighter::language(Some("TypeScript")), Language::Known(_)));
    /// assert!(matches!(Highlighter::language(Some("txt")), Language::Plain));
    /// assert!(matches!(Highlighter::language(None), Language::Plain));
    /// assert!(matches!(Highlighter::language(Some("klingon")), Language::Unknown));
    /// ```
    pub fn language(tag: Option<&str>) -> Language {
        let Some(tag) = tag.map(str::trim).filter(|tag| !tag.is_empty()) else {
            return Language::Plain;
        };

        let tag = tag.to_ascii_lowercase();
        if PLAIN.contains(&tag.as_str()) {
            return Language::Plain;
        }

        let token = ALIASES.iter()
            .find(|(alias, _)| *alias == tag)
            .map(|(_, token)| *token)
            .unwrap_or(tag.as_str());

        SYNTAX_SET.find_syntax_by_token(token)
            .map(Language::Known)
            .unwrap_or(Language::Unknown)
    }

    /// Highlights raw (unescaped) `code` with `syntax`, returning the complete
    /// highlight container for a region tagged `tag`.
    pub fn highlight(syntax: &SyntaxReference, tag: &str, code: &str) -> Result<String> {
        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax, &SYNTAX_SET, ClassStyle::Spaced);

        let mut lines = 0;
        for line in LinesWithEndings::from(code) {
            lines += 1;
            let result = if line.ends_with('\n') {
                generator.parse_html_for_line_which_includes_newline(line)
            } else {
                generator.parse_html_for_line_which_includes_newline(&format!("{line}\n"))
            };

            result.chain_with(|| error! {
                "failed to highlight code",
                "language" => tag,
                "line" => lines,
            })?;
        }

        Ok(code_div(tag, lines.max(1), &generator.finalize()))
    }

    /// Like [`Highlighter::highlight()`], but a grammar that fails on `code`
    /// yields plain code instead of an error. `escaped` is `code`, escaped.
    pub fn highlight_or_plain(syntax: &SyntaxReference, tag: &str, code: &str, escaped: &str) -> String {
        or_plain(Highlighter::highlight(syntax, tag, code), escaped)
    }
}

fn or_plain(highlighted: Result<String>, escaped: &str) -> String {
    highlighted.unwrap_or_else(|e| {
        log::warn!("rendering as plain code: {e}");
        plain_div(escaped)
    })
}

/// The container for plain code. `text` is already escaped.
pub fn plain_div(text: &str) -> String {
    format!("<pre class=\"code\"><code>{text}</code></pre>")
}

#[allow(unused_must_use)]
fn code_div(tag: &str, lines: usize, code: &str) -> String {
    use std::fmt::Write;

    let mut div = String::with_capacity(code.len() + 128);
    write!(&mut div, "<div class=\"highlight\" data-lang=\"{}\">", escape_html(tag));

    write!(&mut div, "<pre class=\"line-nums\">");
    for i in 1..=lines {
        if i < lines { write!(&mut div, "{}\n", i); }
        else { write!(&mut div, "{}", i); }
    }
    write!(&mut div, "</pre>");

    write!(&mut div, "<pre class=\"code\"><code>{}</code></pre>", code);
    write!(&mut div, "</div>");

    div
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlight(tag: &str, code: &str) -> String {
        match Highlighter::language(Some(tag)) {
            Language::Known(syntax) => Highlighter::highlight(syntax, tag, code).unwrap(),
            other => panic!("{tag}: expected a known language, found {other:?}"),
        }
    }

    #[test]
    fn container_and_line_numbers() {
        let html = highlight("rust", "fn main() {\n    let x = 1;\n}\n");
        assert!(html.starts_with("<div class=\"highlight\" data-lang=\"rust\">"));
        assert!(html.contains("<pre class=\"line-nums\">1\n2\n3</pre>"));
        assert!(html.contains("<pre class=\"code\"><code>"));
        assert!(html.ends_with("</code></pre></div>"));
        assert!(html.contains("<span class=\""));
    }

    #[test]
    fn missing_final_newline() {
        let html = highlight("py", "print(1)");
        assert!(html.contains("<pre class=\"line-nums\">1</pre>"));
        assert!(html.contains("print"));
    }

    #[test]
    fn code_is_escaped() {
        let html = highlight("js", "if (a < b && c) {}\n");
        assert!(html.contains("&lt;"));
        assert!(html.contains("&amp;&amp;"));
        assert!(!html.contains("a < b"));
    }

    #[test]
    fn aliases() {
        for tag in ["ts", "typescript", "tsx", "shell", "console", "yml", "zsh"] {
            assert!(matches!(Highlighter::language(Some(tag)), Language::Known(_)), "{tag}");
        }
    }

    #[test]
    fn failed_highlighting_is_plain() {
        let failed = Err(error!("failed to highlight code", "language" => "rust"));
        assert_eq!(or_plain(failed, "a &lt; b"), "<pre class=\"code\"><code>a &lt; b</code></pre>");
        assert_eq!(or_plain(Ok("<div></div>".into()), "x"), "<div></div>");

        let Language::Known(rust) = Highlighter::language(Some("rust")) else { panic!("rust") };
        let html = Highlighter::highlight_or_plain(rust, "rust", "a < b", "a &lt; b");
        assert!(html.starts_with("<div class=\"highlight\" data-lang=\"rust\">"));
    }

    #[test]
    fn empty_code() {
        let html = highlight("rust", "");
        assert!(html.contains("<pre class=\"line-nums\">1</pre>"));
    }
}

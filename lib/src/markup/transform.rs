use std::borrow::Cow;

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Tag, TagEnd, CodeBlockKind, Parser, Options};
use regex::{Captures, Regex};

use crate::document::Markup;
use crate::error::{Error, Result};
use super::{escape_html, unescape_html, plain_div, Highlighter, Language};

/// Matches, in order of preference at any one position:
///
///   * a bare `<pre><code ...>` region, optionally with a class attribute,
///     whose (escaped) code holds no markup,
///   * a fenced region: a line of three backticks, an optional tag, the code,
///     and a closing line of three backticks,
///   * any other `<pre ...>` element, which is passed through untouched.
static CODE_REGION: Lazy<Regex> = Lazy::new(|| {
    let pattern = concat!(
        r#"(?s)<pre>\s*<code(?:\s+class="(?P<class>[^"]*)")?\s*>(?P<code>[^<]*)</code>\s*</pre>"#,
        r#"|(?sm:^```[ \t]*(?P<tag>[^\s`,]*)[^\n]*\n(?P<fenced>.*?)^```[ \t\r]*$)"#,
        r#"|(?s)<pre\b[^>]*>.*?</pre>"#,
    );

    Regex::new(pattern).unwrap()
});

/// A code region: an optional language tag and the code text, HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    pub lang: Option<&'a str>,
    pub text: Cow<'a, str>,
}

/// Converts document bodies into output HTML.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    plain_fallback: bool,
}

impl Transformer {
    /// With `plain_fallback`, code in an unknown language is rendered as plain
    /// code. Without it, such code is an `UnknownLanguage` error.
    pub fn new(plain_fallback: bool) -> Self {
        Transformer { plain_fallback }
    }

    /// Transforms `body`, written in `markup`, into HTML.
    ///
    /// ```rust
    /// use quire::document::Markup;
    /// use quire::markup::Transformer;
    ///
    /// let transformer = Transformer::new(true);
    /// let html = transformer.transform("<p>Hi</p>\n```\nx &lt; y\n```\n", Markup::Html).unwrap();
    /// assert_eq!(html, "<p>Hi</p>\n<pre class=\"code\"><code>x &lt; y</code></pre>\n");
    ///
    /// let html = transformer.transform("*Hi*", Markup::Markdown).unwrap();
    /// assert_eq!(html, "<p><em>Hi</em></p>\n");
    /// ```
    pub fn transform(&self, body: &str, markup: Markup) -> Result<String> {
        match markup {
            Markup::Html => self.transform_html(body),
            Markup::Markdown => self.transform_markdown(body),
        }
    }

    /// Renders one code region into its container.
    pub fn render_code(&self, block: &CodeBlock<'_>) -> Result<String> {
        match Highlighter::language(block.lang) {
            Language::Known(syntax) => {
                let tag = block.lang.unwrap_or_default().trim();
                Ok(Highlighter::highlight_or_plain(syntax, tag, &unescape_html(&block.text), &block.text))
            }
            Language::Plain => Ok(plain_div(&block.text)),
            Language::Unknown if self.plain_fallback => {
                log::warn!("no highlighter for `{}`: rendering as plain code",
                    block.lang.unwrap_or_default());

                Ok(plain_div(&block.text))
            }
            Language::Unknown => Err(fault! {
                UnknownLanguage, "code region names an unknown language",
                "language" => block.lang.unwrap_or_default(),
            }),
        }
    }

    fn transform_html(&self, body: &str) -> Result<String> {
        let mut output = String::with_capacity(body.len() + body.len() / 2);
        let mut last = 0;
        for caps in CODE_REGION.captures_iter(body) {
            let Some(block) = code_block(&caps) else {
                continue;
            };

            let region = caps.get(0).map_or(0..0, |m| m.range());
            output.push_str(&body[last..region.start]);
            output.push_str(&self.render_code(&block)?);
            last = region.end;
        }

        output.push_str(&body[last..]);
        Ok(output)
    }

    fn transform_markdown(&self, body: &str) -> Result<String> {
        let options = Options::all().difference(Options::ENABLE_SMART_PUNCTUATION);
        let parser = Parser::new_ext(body, options);

        let mut error = None;
        let events = CodeBlocks { transformer: self, code: None, error: &mut error, inner: parser };

        let mut output = String::with_capacity(body.len() + body.len() / 2);
        pulldown_cmark::html::push_html(&mut output, events);
        match error {
            Some(error) => Err(error),
            None => Ok(output),
        }
    }
}

/// Extracts the code block from a region match, or `None` if the match is a
/// pass-through `<pre>` element.
fn code_block<'a>(caps: &Captures<'a>) -> Option<CodeBlock<'a>> {
    if let Some(code) = caps.name("code") {
        let lang = caps.name("class").and_then(|class| {
            class.as_str()
                .split_ascii_whitespace()
                .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        });

        return Some(CodeBlock { lang, text: Cow::Borrowed(code.as_str()) });
    }

    let fenced = caps.name("fenced")?.as_str();
    let text = fenced.strip_suffix('\n')
        .map(|text| text.strip_suffix('\r').unwrap_or(text))
        .unwrap_or(fenced);

    let lang = caps.name("tag").map(|m| m.as_str()).filter(|tag| !tag.is_empty());
    Some(CodeBlock { lang, text: Cow::Borrowed(text) })
}

/// Replaces every code block in a Markdown event stream with its rendered
/// container. The first rendering error is stored in `error` and ends the
/// stream.
struct CodeBlocks<'t, 'e, 'a, I> {
    transformer: &'t Transformer,
    code: Option<(Option<pulldown_cmark::CowStr<'a>>, String)>,
    error: &'e mut Option<Error>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for CodeBlocks<'_, '_, 'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        loop {
            match self.inner.next()? {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(label) => Some(label),
                        CodeBlockKind::Indented => None,
                    };

                    self.code = Some((lang, String::new()));
                }
                Event::Text(text) if self.code.is_some() => {
                    if let Some((_, code)) = self.code.as_mut() {
                        code.push_str(&escape_html(&text));
                    }
                }
                Event::End(TagEnd::CodeBlock) if self.code.is_some() => {
                    let (label, code) = self.code.take()?;
                    let lang = label.as_deref()
                        .and_then(|label| label.split([',', ' ', '\t']).next())
                        .filter(|lang| !lang.is_empty());

                    let text = code.strip_suffix('\n').unwrap_or(&code);
                    let block = CodeBlock { lang, text: Cow::Borrowed(text) };
                    match self.transformer.render_code(&block) {
                        Ok(html) => return Some(Event::Html(format!("{html}\n").into())),
                        Err(e) => {
                            *self.error = Some(e);
                            return None;
                        }
                    }
                }
                ev => return Some(ev),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn html(body: &str) -> String {
        Transformer::new(true).transform(body, Markup::Html).unwrap()
    }

    #[test]
    fn typescript_region_is_highlighted() {
        let body = "<p>Intro</p>\n<pre><code class=\"language-typescript\">const x: number = 1;</code></pre>\n<p>Outro</p>";
        let output = html(body);
        assert!(output.starts_with("<p>Intro</p>\n<div class=\"highlight\" data-lang=\"typescript\">"));
        assert!(output.ends_with("</div>\n<p>Outro</p>"));
        for token in ["const", "x", "number", "1"] {
            assert!(output.contains(token), "{token}");
        }
    }

    #[test]
    fn untagged_region_is_plain() {
        let output = html("<pre><code>a &lt; b</code></pre>");
        assert_eq!(output, "<pre class=\"code\"><code>a &lt; b</code></pre>");

        let output = html("<pre><code class=\"wide\">a</code></pre>");
        assert_eq!(output, "<pre class=\"code\"><code>a</code></pre>");
    }

    #[test]
    fn unknown_language() {
        let body = "```klingon\nQapla'\n```\n";
        assert_eq!(html(body), "<pre class=\"code\"><code>Qapla'</code></pre>\n");

        let error = Transformer::new(false).transform(body, Markup::Html).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::UnknownLanguage));
        assert!(error.to_string().contains("klingon"));

        // An absent tag is never an error.
        let body = "<pre><code>Qapla'</code></pre>";
        assert!(Transformer::new(false).transform(body, Markup::Html).is_ok());
    }

    #[test]
    fn fenced_region_with_lang_class() {
        let body = "<pre><code class=\"lang-rust\">let a = &amp;b;</code></pre>";
        let output = html(body);
        assert!(output.starts_with("<div class=\"highlight\" data-lang=\"rust\">"));
        assert!(output.contains("&amp;"));
        assert!(!output.contains("&amp;amp;"));
    }

    #[test]
    fn fence_with_attributes() {
        let body = "```rust,ignore\nfn f() {}\n```";
        let output = html(body);
        assert!(output.starts_with("<div class=\"highlight\" data-lang=\"rust\">"));
        assert!(output.contains("<pre class=\"line-nums\">1</pre>"));
    }

    #[test]
    fn other_pre_elements_pass_through() {
        let body = "<pre class=\"poem\">```rust\nfn f() {}\n```</pre>";
        assert_eq!(html(body), body);

        let body = "<pre>no code here</pre>";
        assert_eq!(html(body), body);
    }

    #[test]
    fn transform_is_idempotent() {
        let body = "<h1>T</h1>\n```python\nprint(\"hi\")\n```\n<pre><code>x &amp; y</code></pre>\n\
            <pre><code class=\"language-unknowable\">?</code></pre>\n";
        let once = html(body);
        let twice = html(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn html_outside_regions_is_untouched() {
        let body = "<div>&amp; <b>bold</b> ``` not a fence</div>\n<code>inline</code>";
        assert_eq!(html(body), body);
    }

    #[test]
    fn markdown_code_blocks() {
        let transformer = Transformer::new(true);
        let output = transformer.transform("# T\n\n```rust\nlet x = 1 < 2;\n```\n", Markup::Markdown).unwrap();
        assert!(output.starts_with("<h1>T</h1>\n<div class=\"highlight\" data-lang=\"rust\">"));
        assert!(output.contains("&lt;"));

        let output = transformer.transform("    a < b\n", Markup::Markdown).unwrap();
        assert_eq!(output, "<pre class=\"code\"><code>a &lt; b</code></pre>\n");

        let error = Transformer::new(false)
            .transform("```klingon\nx\n```\n", Markup::Markdown)
            .unwrap_err();

        assert_eq!(error.kind(), Some(ErrorKind::UnknownLanguage));
    }

    #[test]
    fn markdown_is_not_smart() {
        let output = Transformer::new(true).transform("\"don't\" -- ...", Markup::Markdown).unwrap();
        assert!(output.contains("don't"));
        assert!(output.contains("--"));
        assert!(!output.contains('\u{2019}'));
        assert!(!output.contains('\u{2026}'));
    }
}

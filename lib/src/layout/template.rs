use std::ops::Range;

use derive_more::Debug;
use rustc_hash::FxHashMap;

use crate::markup::escape_html;

/// The slot every layout must have: where the wrapped content goes.
pub const CONTENT: &str = "content";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Range<usize>),
    Slot(Box<str>),
}

/// A layout body, parsed once into literal text and `{{ name }}` slots.
///
/// Slot names are ASCII alphanumerics, `_`, and `-`, optionally padded by
/// spaces. Anything else between braces is literal text.
#[derive(Debug, Clone)]
pub struct Template {
    #[debug(ignore)]
    source: Box<str>,
    segments: Vec<Segment>,
}

/// Values for a template's slots.
///
/// Values are stored ready for insertion: text is escaped on the way in, and
/// HTML is inserted as-is.
#[derive(Debug, Default, Clone)]
pub struct Slots {
    values: FxHashMap<Box<str>, String>,
}

impl Template {
    /// Parses `source`.
    ///
    /// ```rust
    /// use quire::layout::{Template, Slots};
    ///
    /// let template = Template::parse("<h1>{{ title }}</h1>{{content}}{{ nope! }}");
    /// assert!(template.has_slot("content"));
    /// assert!(!template.has_slot("nope!"));
    ///
    /// let mut slots = Slots::new();
    /// slots.insert_text("title", "Q&A");
    /// assert_eq!(template.render("<p>x</p>", &slots), "<h1>Q&amp;A</h1><p>x</p>{{ nope! }}");
    /// ```
    pub fn parse(source: &str) -> Template {
        let bytes = source.as_bytes();
        let mut segments = vec![];
        let mut literal_start = 0;
        let mut i = 0;
        while let Some(open) = memchr::memmem::find(&bytes[i..], b"{{").map(|k| i + k) {
            let Some(close) = memchr::memmem::find(&bytes[open + 2..], b"}}").map(|k| open + 2 + k) else {
                break;
            };

            let name = source[open + 2..close].trim_matches(' ');
            if !is_slot_name(name) {
                i = open + 1;
                continue;
            }

            if literal_start < open {
                segments.push(Segment::Literal(literal_start..open));
            }

            segments.push(Segment::Slot(name.into()));
            literal_start = close + 2;
            i = literal_start;
        }

        if literal_start < source.len() {
            segments.push(Segment::Literal(literal_start..source.len()));
        }

        Template { source: source.into(), segments }
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Slot(slot) if &**slot == name))
    }

    /// Renders the template, filling [`CONTENT`] with `content` and every
    /// other slot from `slots`. Slots without a value render empty. Inserted
    /// values are never scanned for slots.
    pub fn render(&self, content: &str, slots: &Slots) -> String {
        let mut output = String::with_capacity(self.source.len() + content.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(range) => output.push_str(&self.source[range.clone()]),
                Segment::Slot(name) if &**name == CONTENT => output.push_str(content),
                Segment::Slot(name) => output.push_str(slots.get(name).unwrap_or_default()),
            }
        }

        output
    }
}

fn is_slot_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

impl Slots {
    pub fn new() -> Self {
        Slots::default()
    }

    /// Sets `name` to `text`, HTML-escaped.
    pub fn insert_text(&mut self, name: &str, text: &str) -> &mut Self {
        self.values.insert(name.into(), escape_html(text).into_owned());
        self
    }

    /// Sets `name` to `html`, inserted verbatim.
    pub fn insert_html(&mut self, name: &str, html: String) -> &mut Self {
        self.values.insert(name.into(), html);
        self
    }

    /// Sets `name` to `text`, escaped, unless `name` already has a value.
    pub fn insert_text_if_absent(&mut self, name: &str, text: &str) -> &mut Self {
        if !self.values.contains_key(name) {
            self.insert_text(name, text);
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_only() {
        let template = Template::parse("<p>no slots { here }</p>");
        assert!(!template.has_slot(CONTENT));
        assert_eq!(template.render("ignored", &Slots::new()), "<p>no slots { here }</p>");
    }

    #[test]
    fn unknown_slots_render_empty() {
        let template = Template::parse("[{{ missing }}]{{ content }}");
        assert_eq!(template.render("x", &Slots::new()), "[]x");
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let template = Template::parse("{{ title }}|{{ content }}");
        let mut slots = Slots::new();
        slots.insert_html("title", "{{ content }}".into());
        assert_eq!(template.render("{{ title }}", &slots), "{{ content }}|{{ title }}");
    }

    #[test]
    fn odd_braces() {
        let template = Template::parse("{{{ content }}} {{ a b }} {{}} {{ unclosed");
        assert!(template.has_slot(CONTENT));
        assert_eq!(template.render("X", &Slots::new()), "{X} {{ a b }} {{}} {{ unclosed");
    }

    #[test]
    fn text_is_escaped_html_is_not() {
        let template = Template::parse("{{ a }} {{ b }}");
        let mut slots = Slots::new();
        slots.insert_text("a", "<i>").insert_html("b", "<i>".into());
        assert_eq!(template.render("", &slots), "&lt;i&gt; <i>");
    }

    #[test]
    fn insert_if_absent() {
        let mut slots = Slots::new();
        slots.insert_text("title", "Real").insert_text_if_absent("title", "Extra");
        slots.insert_text_if_absent("author", "Ada");
        assert_eq!(slots.get("title"), Some("Real"));
        assert_eq!(slots.get("author"), Some("Ada"));
    }
}

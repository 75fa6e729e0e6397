use std::borrow::Cow;

/// Escapes `&`, `<`, `>`, `"`, and `'`.
///
/// ```rust
/// use quire::markup::escape_html;
///
/// assert_eq!(escape_html("a < b && \"c\""), "a &lt; b &amp;&amp; &quot;c&quot;");
/// assert_eq!(escape_html("plain"), "plain");
/// ```
pub fn escape_html(string: &str) -> Cow<'_, str> {
    let needs_escape = |b: u8| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'');
    let Some(first) = string.bytes().position(needs_escape) else {
        return Cow::Borrowed(string);
    };

    let mut output = String::with_capacity(string.len() + 16);
    output.push_str(&string[..first]);
    for ch in string[first..].chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            ch => output.push(ch),
        }
    }

    Cow::Owned(output)
}

/// Decodes numeric character references and the common named entities.
/// Anything that isn't a recognized reference is kept as written.
///
/// ```rust
/// use quire::markup::unescape_html;
///
/// assert_eq!(unescape_html("a &lt; b &amp;&amp; &#x27;c&#39;"), "a < b && 'c'");
/// assert_eq!(unescape_html("&bogus; & &#xZZ;"), "&bogus; & &#xZZ;");
/// ```
pub fn unescape_html(string: &str) -> Cow<'_, str> {
    let Some(mut i) = memchr::memchr(b'&', string.as_bytes()) else {
        return Cow::Borrowed(string);
    };

    let mut output = String::with_capacity(string.len());
    output.push_str(&string[..i]);
    while i < string.len() {
        let rest = &string[i..];
        if let Some((ch, len)) = rest.strip_prefix('&').and_then(reference) {
            output.push(ch);
            i += len + 1;
            continue;
        }

        // Copy up to the next `&`, which may begin a reference.
        let next = memchr::memchr(b'&', &rest.as_bytes()[1..])
            .map(|k| k + 1)
            .unwrap_or(rest.len());

        output.push_str(&rest[..next]);
        i += next;
    }

    Cow::Owned(output)
}

/// Parses the reference at the start of `s` (just after the `&`), returning
/// the character and the length of the reference including its `;`.
fn reference(s: &str) -> Option<(char, usize)> {
    let end = s.bytes().take(12).position(|b| b == b';')?;
    let name = &s[..end];
    let ch = match name.strip_prefix('#') {
        Some(num) => {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };

            char::from_u32(code)?
        }
        None => match name {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            _ => return None,
        },
    };

    Some((ch, end + 1))
}

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::util::slugify;

/// Where a page lives: its slug, its path in the output tree, and its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permalink {
    /// `YYYY-MM-DD-title-slug`. Unique among the pages of a build.
    pub slug: String,
    /// `slug/index.html`, relative to the output root.
    pub path: PathBuf,
    /// `base_url/slug/`.
    pub url: String,
}

impl Permalink {
    pub const INDEX: &'static str = "index.html";

    /// The permalink for a post titled `title` dated `date`.
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use quire::schedule::Permalink;
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
    /// let link = Permalink::new(date, "Tell don't ask", "/");
    /// assert_eq!(link.slug, "2024-03-30-tell-dont-ask");
    /// assert_eq!(link.url, "/2024-03-30-tell-dont-ask/");
    /// assert_eq!(link.path, std::path::Path::new("2024-03-30-tell-dont-ask/index.html"));
    ///
    /// let link = Permalink::new(date, "Tell don't ask", "https://blog.example/posts/");
    /// assert_eq!(link.url, "https://blog.example/posts/2024-03-30-tell-dont-ask/");
    /// ```
    pub fn new(date: NaiveDate, title: &str, base_url: &str) -> Permalink {
        let date = date.format("%Y-%m-%d");
        let title = slugify(title);
        let slug = if title.is_empty() {
            date.to_string()
        } else {
            format!("{date}-{title}")
        };

        Permalink {
            path: PathBuf::from(&slug).join(Self::INDEX),
            url: join_url(base_url, &slug),
            slug,
        }
    }
}

/// `base` and `slug` joined by exactly one `/`, with a trailing `/`.
pub fn join_url(base: &str, slug: &str) -> String {
    format!("{}/{slug}/", base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 9).unwrap()
    }

    #[test]
    fn untitled() {
        let link = Permalink::new(date(), "???", "/");
        assert_eq!(link.slug, "2023-01-09");
        assert_eq!(link.url, "/2023-01-09/");
    }

    #[test]
    fn unicode_titles() {
        assert_eq!(Permalink::new(date(), "Crème brûlée: a guide", "/").slug, "2023-01-09-creme-brulee-a-guide");
        assert_eq!(Permalink::new(date(), "C++ / Rust", "").slug, "2023-01-09-c-rust");
        assert_eq!(Permalink::new(date(), "C++ / Rust", "").url, "/2023-01-09-c-rust/");
    }
}

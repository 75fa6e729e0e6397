use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{Chainable, Result};
use crate::schedule;

/// Build configuration, read from `quire.toml` in the site root.
///
/// Keys are camelCase (`failFast`, `defaultTimezone`, ...); snake_case
/// spellings are accepted as aliases. Every key is optional.
///
/// ```rust
/// use quire::Config;
///
/// let config = Config::from_toml(r#"
///     failFast = false
///     defaultTimezone = "Europe/Madrid"
///     max_layout_chain_depth = 4
/// "#).unwrap();
///
/// assert!(!config.fail_fast);
/// assert_eq!(config.default_timezone, "Europe/Madrid");
/// assert_eq!(config.max_layout_chain_depth, 4);
/// assert!(config.highlight_unknown_language_as_plain);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Abort on the first failure (`true`) or render everything that can be
    /// rendered and report the failures at the end (`false`).
    #[serde(alias = "fail_fast")]
    pub fail_fast: bool,

    /// IANA zone applied to documents that don't declare a `timezone`.
    #[serde(alias = "default_timezone")]
    pub default_timezone: String,

    /// The longest permitted layout chain, counting the document's own layout.
    #[serde(alias = "max_layout_chain_depth")]
    pub max_layout_chain_depth: usize,

    /// Render code in unknown languages as plain code. Only an explicit
    /// `false` in the configuration file (or `--strict-highlighting`) turns
    /// unknown languages into build failures.
    #[serde(alias = "highlight_unknown_language_as_plain")]
    pub highlight_unknown_language_as_plain: bool,

    /// Local time of day (`HH:MM`) for documents whose `date` has no time.
    #[serde(alias = "default_publish_time")]
    pub default_publish_time: String,

    /// Prefix for every permalink URL.
    #[serde(alias = "base_url")]
    pub base_url: String,

    /// The site title, available to layouts as `{{ site_title }}`.
    pub title: String,

    /// How many neighbouring posts a page links to as related.
    #[serde(alias = "related_posts")]
    pub related_posts: usize,

    #[serde(alias = "posts_dir")]
    pub posts_dir: PathBuf,

    #[serde(alias = "layouts_dir")]
    pub layouts_dir: PathBuf,

    /// The site root. `posts_dir` and `layouts_dir` are relative to it.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fail_fast: true,
            default_timezone: "UTC".into(),
            max_layout_chain_depth: 10,
            highlight_unknown_language_as_plain: true,
            default_publish_time: "09:00".into(),
            base_url: "/".into(),
            title: String::new(),
            related_posts: 2,
            posts_dir: "posts".into(),
            layouts_dir: "layouts".into(),
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    pub const FILE: &'static str = "quire.toml";

    /// Reads `quire.toml` from `root` if it exists, falling back to defaults
    /// otherwise, and validates the result.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Config> {
        let root = root.as_ref();
        let path = root.join(Self::FILE);
        let mut config = if path.is_file() {
            let source = std::fs::read_to_string(&path)
                .chain_with(|| fault! {
                    InvalidConfig, "failed to read configuration file",
                    "path" => path.display(),
                })?;

            Self::parse(&source).chain_with(|| fault! {
                InvalidConfig, "invalid configuration file",
                "path" => path.display(),
            })?
        } else {
            Config::default()
        };

        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML source.
    pub fn from_toml(source: &str) -> Result<Config> {
        let config = Self::parse(source)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(source: &str) -> Result<Config> {
        toml::from_str(source).chain(fault!(InvalidConfig, "configuration is not valid TOML"))
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        self.publish_time()?;

        if self.max_layout_chain_depth == 0 {
            return Err(fault! {
                InvalidConfig, "`maxLayoutChainDepth` must be at least 1",
                "value" => self.max_layout_chain_depth,
            });
        }

        Ok(())
    }

    /// The parsed `default_timezone`.
    pub fn timezone(&self) -> Result<Tz> {
        schedule::timezone(&self.default_timezone)
            .chain(fault!(InvalidConfig, "invalid `defaultTimezone`"))
    }

    /// The parsed `default_publish_time`.
    pub fn publish_time(&self) -> Result<NaiveTime> {
        let time = self.default_publish_time.trim();
        NaiveTime::parse_from_str(time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
            .map_err(|_| fault! {
                InvalidConfig, "`defaultPublishTime` must be formatted as `HH:MM`",
                "value" => &self.default_publish_time,
            })
    }

    pub fn posts_path(&self) -> PathBuf {
        self.root.join(&self.posts_dir)
    }

    pub fn layouts_path(&self) -> PathBuf {
        self.root.join(&self.layouts_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.default_timezone, "UTC");
        assert_eq!(config.max_layout_chain_depth, 10);
        assert!(config.highlight_unknown_language_as_plain);
        assert_eq!(config.publish_time().unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn strict_highlighting_is_explicit() {
        let config = Config::from_toml("highlightUnknownLanguageAsPlain = false").unwrap();
        assert!(!config.highlight_unknown_language_as_plain);
    }

    #[test]
    fn rejects_invalid_values() {
        let error = Config::from_toml(r#"defaultTimezone = "Mars/Olympus""#).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::InvalidConfig));

        let error = Config::from_toml("maxLayoutChainDepth = 0").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::InvalidConfig));

        let error = Config::from_toml(r#"defaultPublishTime = "noon""#).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::InvalidConfig));

        let error = Config::from_toml("failFast = 3").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::InvalidConfig));
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.posts_path(), dir.path().join("posts"));
        assert_eq!(config.layouts_path(), dir.path().join("layouts"));
    }

    #[test]
    fn discover_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(Config::FILE), "title = \"Notes\"\nrelatedPosts = 4\n").unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.title, "Notes");
        assert_eq!(config.related_posts, 4);
    }
}

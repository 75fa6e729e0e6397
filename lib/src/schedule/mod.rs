//! Publish instants, the publish order, and permalinks.

mod permalink;

use std::cmp::Reverse;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use crate::Config;
use crate::document::FrontMatter;
use crate::error::Result;

pub use permalink::{Permalink, join_url};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Looks up an IANA zone by name.
///
/// ```rust
/// assert!(quire::schedule::timezone("Europe/Madrid").is_ok());
/// assert!(quire::schedule::timezone("Mars/Olympus").is_err());
/// ```
pub fn timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name.trim()).map_err(|_| fault! {
        UnknownTimezone, "unknown timezone",
        "timezone" => name,
    })
}

/// Parses a front matter date: `YYYY-MM-DD`, optionally followed by a time
/// of day, `HH:MM` or `HH:MM:SS`, separated by a space or `T`.
pub fn parse_date(date: &str) -> Result<(NaiveDate, Option<NaiveTime>)> {
    let date = date.trim();
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok((day, None));
    }

    DATE_TIME_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
        .map(|dt| (dt.date(), Some(dt.time())))
        .ok_or_else(|| fault! {
            MalformedFrontMatter, "`date` must be formatted as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM`",
            "date" => date,
        })
}

/// When and where a document is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// The publish instant.
    pub instant: DateTime<Utc>,
    /// The publish date and time in `timezone`, as written (or defaulted).
    pub local: NaiveDateTime,
    pub timezone: Tz,
    pub permalink: Permalink,
}

impl Schedule {
    /// `YYYY-MM-DD`, local.
    pub fn date(&self) -> String {
        self.local.format("%Y-%m-%d").to_string()
    }

    /// `HH:MM`, local.
    pub fn time(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    /// The instant in RFC 3339 form, in UTC: `2024-03-30T08:00:00Z`.
    pub fn published(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// The publish order: newest first, then by source path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub instant: Reverse<DateTime<Utc>>,
    pub path: Arc<Path>,
}

impl SortKey {
    pub fn new(instant: DateTime<Utc>, path: Arc<Path>) -> Self {
        SortKey { instant: Reverse(instant), path }
    }
}

/// Resolves a document's front matter into its [`Schedule`].
#[derive(Debug, Clone)]
pub struct Scheduler {
    timezone: Tz,
    publish_time: NaiveTime,
    base_url: String,
}

impl Scheduler {
    pub fn new(config: &Config) -> Result<Scheduler> {
        Ok(Scheduler {
            timezone: config.timezone()?,
            publish_time: config.publish_time()?,
            base_url: config.base_url.clone(),
        })
    }

    /// Schedules a document.
    ///
    /// Fails with `UnknownTimezone` if the document names an unknown zone, and
    /// with `MalformedFrontMatter` if its date is unparseable or falls in a
    /// daylight saving gap. A local time that occurs twice resolves to the
    /// earlier instant.
    ///
    /// ```rust
    /// use quire::Config;
    /// use quire::document::FrontMatter;
    /// use quire::schedule::Scheduler;
    ///
    /// let front = FrontMatter::parse("\
    /// title: Tell don't ask
    /// layout: post
    /// date: 2024-03-30
    /// timezone: Europe/Madrid
    /// ").unwrap();
    ///
    /// let schedule = Scheduler::new(&Config::default()).unwrap().schedule(&front).unwrap();
    /// assert_eq!(schedule.permalink.slug, "2024-03-30-tell-dont-ask");
    /// assert_eq!(schedule.published(), "2024-03-30T08:00:00Z");
    /// ```
    pub fn schedule(&self, front: &FrontMatter) -> Result<Schedule> {
        let timezone = match &front.timezone {
            Some(name) => timezone(name)?,
            None => self.timezone,
        };

        let (date, time) = parse_date(&front.date)?;
        let local = date.and_time(time.unwrap_or(self.publish_time));
        let instant = timezone.from_local_datetime(&local)
            .earliest()
            .ok_or_else(|| fault! {
                MalformedFrontMatter, "`date` does not exist in its timezone",
                "date" => &front.date,
                "timezone" => timezone.name(),
            })?;

        Ok(Schedule {
            instant: instant.with_timezone(&Utc),
            local,
            timezone,
            permalink: Permalink::new(date, &front.title, &self.base_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn front(date: &str, timezone: Option<&str>) -> FrontMatter {
        let mut source = format!("title: A post\nlayout: post\ndate: \"{date}\"\n");
        if let Some(tz) = timezone {
            source.push_str(&format!("timezone: {tz}\n"));
        }

        FrontMatter::parse(&source).unwrap()
    }

    fn schedule(date: &str, timezone: Option<&str>) -> Result<Schedule> {
        Scheduler::new(&Config::default()).unwrap().schedule(&front(date, timezone))
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn date_formats() {
        assert_eq!(schedule("2024-01-02", None).unwrap().instant, utc("2024-01-02T09:00:00Z"));
        assert_eq!(schedule("2024-01-02 13:05", None).unwrap().instant, utc("2024-01-02T13:05:00Z"));
        assert_eq!(schedule("2024-01-02T13:05:07", None).unwrap().instant, utc("2024-01-02T13:05:07Z"));

        for bad in ["2024-13-01", "02/01/2024", "2024-01-02 25:00", "yesterday", "2024-01-02T"] {
            let error = schedule(bad, None).unwrap_err();
            assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter), "{bad}");
        }
    }

    #[test]
    fn document_timezone_wins() {
        let s = schedule("2024-07-01 12:00", Some("America/New_York")).unwrap();
        assert_eq!(s.instant, utc("2024-07-01T16:00:00Z"));
        assert_eq!(s.time(), "12:00");
        assert_eq!(s.date(), "2024-07-01");
        assert_eq!(s.published(), "2024-07-01T16:00:00Z");
    }

    #[test]
    fn unknown_timezone() {
        let error = schedule("2024-07-01", Some("Europe/Atlantis")).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::UnknownTimezone));
        assert!(error.to_string().contains("Europe/Atlantis"));
    }

    #[test]
    fn daylight_saving_transitions() {
        // Clocks went back from 03:00 to 02:00: 02:30 happened twice.
        let s = schedule("2024-10-27 02:30", Some("Europe/Madrid")).unwrap();
        assert_eq!(s.instant, utc("2024-10-27T00:30:00Z"));

        // Clocks jumped from 02:00 to 03:00: 02:30 never happened.
        let error = schedule("2024-03-31 02:30", Some("Europe/Madrid")).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::MalformedFrontMatter));
    }

    #[test]
    fn sort_keys() {
        let old = SortKey::new(utc("2020-01-01T00:00:00Z"), Path::new("b.html").into());
        let new = SortKey::new(utc("2024-01-01T00:00:00Z"), Path::new("z.html").into());
        let tie = SortKey::new(utc("2020-01-01T00:00:00Z"), Path::new("a.html").into());

        let mut keys = vec![old.clone(), tie.clone(), new.clone()];
        keys.sort();
        assert_eq!(keys, vec![new, tie, old]);
    }
}

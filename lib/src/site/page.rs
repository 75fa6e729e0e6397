use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::error::{Failure, Result, Subject};
use crate::layout::Slots;
use crate::markup::escape_html;
use crate::schedule::{Permalink, SortKey};
use super::{Prepared, Site, Timeline, write_file};

/// The name of the optional layout that wraps the index page.
pub const INDEX_LAYOUT: &str = "index";

/// A fully composed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Output path, relative to the output root.
    pub path: PathBuf,
    pub url: String,
    pub html: String,
    pub instant: DateTime<Utc>,
    /// The local publish date, `YYYY-MM-DD`.
    pub date: String,
    pub key: SortKey,
    pub title: String,
}

/// The result of rendering a site.
#[derive(Debug, Clone)]
pub struct Rendering {
    /// Every rendered page, in publish order.
    pub pages: Vec<RenderedPage>,
    /// The index page, `index.html` at the output root.
    pub index: String,
    /// Everything that failed. Always empty for a fail-fast build.
    pub failures: Vec<Failure>,
}

impl Rendering {
    /// Whether nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The rendered page at output path `path`, if any.
    pub fn page<P: AsRef<Path>>(&self, path: P) -> Option<&RenderedPage> {
        self.pages.iter().find(|page| page.path == path.as_ref())
    }

    /// Writes every page and the index below `output`. Each output path is
    /// written by exactly one worker.
    pub fn write(&self, output: &Path) -> Result<()> {
        let results: Vec<Result<()>> = self.pages.par_iter()
            .map(|page| write_file(&output.join(&page.path), &page.html))
            .collect();

        results.into_iter().collect::<Result<()>>()?;
        write_file(&output.join(Permalink::INDEX), &self.index)
    }
}

/// Composes the `i`th post of `timeline` into its page.
pub(super) fn compose(site: &Site, timeline: &Timeline, i: usize) -> Result<RenderedPage, Failure> {
    let post = &timeline.posts()[i];
    let slots = slots(site, timeline, i);
    let html = site.layouts().compose(&post.front.layout, &post.html, &slots)
        .map_err(|e| Failure::new(Subject::Document(post.path.clone()), e))?;

    Ok(RenderedPage {
        path: post.schedule.permalink.path.clone(),
        url: post.schedule.permalink.url.clone(),
        html,
        instant: post.schedule.instant,
        date: post.schedule.date(),
        key: post.sort_key(),
        title: post.front.title.clone(),
    })
}

/// The slot values for the `i`th post of `timeline`.
fn slots(site: &Site, timeline: &Timeline, i: usize) -> Slots {
    let config = site.config();
    let post = &timeline.posts()[i];
    let (front, schedule) = (&post.front, &post.schedule);

    let mut slots = Slots::new();
    slots.insert_text("title", &front.title)
        .insert_text("subtitle", front.subtitle.as_deref().unwrap_or_default())
        .insert_text("background", front.background.as_deref().unwrap_or_default())
        .insert_text("date", &schedule.date())
        .insert_text("time", &schedule.time())
        .insert_text("timezone", schedule.timezone.name())
        .insert_text("published", &schedule.published())
        .insert_text("url", &schedule.permalink.url)
        .insert_text("slug", &schedule.permalink.slug)
        .insert_text("site_title", &config.title)
        .insert_text("base_url", &config.base_url)
        .insert_html("related", related(timeline, i, config.related_posts));

    if let Some(newer) = timeline.newer(i) {
        slots.insert_text("newer", &newer.schedule.permalink.url)
            .insert_text("newer_title", &newer.front.title);
    }

    if let Some(older) = timeline.older(i) {
        slots.insert_text("older", &older.schedule.permalink.url)
            .insert_text("older_title", &older.front.title);
    }

    for key in front.extra.keys() {
        if let Some(value) = front.extra_scalar(key) {
            slots.insert_text_if_absent(key, &value);
        }
    }

    slots
}

/// A list linking to the posts related to the `i`th one.
fn related(timeline: &Timeline, i: usize, n: usize) -> String {
    let related = timeline.related(i, n);
    if related.is_empty() {
        return String::new();
    }

    let mut html = String::from("<ul class=\"related\">");
    for post in related {
        link(&mut html, post);
    }

    html.push_str("</ul>");
    html
}

#[allow(unused_must_use)]
fn link(html: &mut String, post: &Prepared) {
    write!(html, "<li><a href=\"{}\">{}</a></li>",
        escape_html(&post.schedule.permalink.url),
        escape_html(&post.front.title));
}

/// The index page: every rendered page, in publish order, wrapped by the
/// `index` layout if there is a usable one and by a built-in page otherwise.
pub(super) fn index(site: &Site, pages: &[RenderedPage]) -> String {
    let config = site.config();

    let mut list = String::from("<ul class=\"posts\">\n");
    for page in pages {
        let published = page.instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let _ = writeln!(list, "<li><time datetime=\"{published}\">{}</time> <a href=\"{}\">{}</a></li>",
            page.date,
            escape_html(&page.url),
            escape_html(&page.title));
    }

    list.push_str("</ul>\n");

    if site.layouts().contains(INDEX_LAYOUT) {
        let mut slots = Slots::new();
        slots.insert_text("title", &config.title)
            .insert_text("site_title", &config.title)
            .insert_text("base_url", &config.base_url);

        match site.layouts().compose(INDEX_LAYOUT, &list, &slots) {
            Ok(html) => return html,
            Err(e) => log::warn!("`{INDEX_LAYOUT}` layout is unusable, using the built-in index: {e}"),
        }
    }

    let title = escape_html(&config.title);
    format!("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
        </head>\n<body>\n<h1>{title}</h1>\n{list}</body>\n</html>\n")
}

//! Builds a whole site: discovery, the per-document stage, the reduction,
//! composition, and writing.

mod discover;
mod ledger;
mod page;

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::Config;
use crate::document::{Document, FrontMatter};
use crate::error::{Chainable, Error, Failure, Result, Subject};
use crate::layout::LayoutSet;
use crate::markup::Transformer;
use crate::schedule::{Schedule, Scheduler, SortKey};
use crate::util::time;

pub use discover::discover;
pub use ledger::{Ledger, Timeline};
pub use page::{RenderedPage, Rendering};

/// A document that made it through the per-document stage: parsed,
/// transformed, and scheduled, with a usable layout.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub path: Arc<Path>,
    pub front: FrontMatter,
    /// The transformed body.
    pub html: String,
    pub schedule: Schedule,
}

impl Prepared {
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.schedule.instant, self.path.clone())
    }
}

/// Everything needed to render a site.
#[derive(Debug)]
pub struct Site {
    config: Config,
    layouts: LayoutSet,
    transformer: Transformer,
    scheduler: Scheduler,
}

impl Site {
    pub fn new(config: Config, layouts: LayoutSet) -> Result<Site> {
        config.validate()?;
        Ok(Site {
            transformer: Transformer::new(config.highlight_unknown_language_as_plain),
            scheduler: Scheduler::new(&config)?,
            layouts,
            config,
        })
    }

    /// Loads the layouts named by `config`.
    pub fn load(config: Config) -> Result<Site> {
        let layouts = time!("loading layouts",
            LayoutSet::load(&config.layouts_path(), config.max_layout_chain_depth)?);

        log::info!("loaded {} layout(s)", layouts.names().len());
        Site::new(config, layouts)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layouts(&self) -> &LayoutSet {
        &self.layouts
    }

    /// Transforms and schedules `document`, and checks that its layout is
    /// usable.
    pub fn prepare(&self, document: Document) -> Result<Prepared> {
        let Document { path, markup, front, body } = document;
        let html = self.transformer.transform(&body, markup)?;
        let schedule = self.scheduler.schedule(&front)?;
        self.layouts.chain(&front.layout)?;
        Ok(Prepared { path, front, html, schedule })
    }

    /// Renders every document in the posts directory.
    pub fn render(&self) -> Result<Rendering> {
        let root = self.config.posts_path();
        let paths = time!("discovery", discover(&root)?);
        log::info!("discovered {} document(s) in {}", paths.len(), root.display());
        self.render_with(paths, |path| Document::read(&root, path.clone()))
    }

    /// Renders documents given as `(path, source)` pairs. The order of
    /// `sources` doesn't matter.
    pub fn render_sources<I, P, S>(&self, sources: I) -> Result<Rendering>
        where I: IntoIterator<Item = (P, S)>, P: AsRef<Path>, S: Into<String>
    {
        let mut sources: Vec<(Arc<Path>, String)> = sources.into_iter()
            .map(|(path, source)| (Arc::from(path.as_ref()), source.into()))
            .collect();

        sources.sort_by(|a, b| a.0.cmp(&b.0));
        let paths = sources.iter().map(|(path, _)| path.clone()).collect();
        self.render_with(paths, |path| {
            let i = sources.binary_search_by(|(p, _)| p.cmp(path))
                .map_err(|_| fault!(Io, "no source for document", "path" => path.display()))?;

            Document::parse(path.clone(), &sources[i].1)
        })
    }

    fn render_with<F>(&self, mut paths: Vec<Arc<Path>>, load: F) -> Result<Rendering>
        where F: Fn(&Arc<Path>) -> Result<Document> + Sync
    {
        let fail_fast = self.config.fail_fast;
        let mut failures = self.layouts.faults();
        if fail_fast {
            if let Some(failure) = failures.drain(..).next() {
                return Err(failure.into_error());
            }
        }

        paths.sort();
        paths.dedup();

        let prepared: Vec<Result<Prepared, Failure>> = time!("preparing documents", paths.par_iter()
            .map(|path| load(path)
                .and_then(|document| self.prepare(document))
                .map_err(|e| Failure::new(Subject::Document(path.clone()), e)))
            .collect());

        let mut ledger = Ledger::new();
        for result in prepared {
            match result {
                Ok(prepared) => ledger.record(prepared),
                Err(failure) if fail_fast => return Err(failure.into_error()),
                Err(failure) => {
                    log::warn!("skipping {}", failure.subject);
                    failures.push(failure);
                }
            }
        }

        let (timeline, collisions) = ledger.close();
        if fail_fast {
            if let Some(failure) = collisions.into_iter().next() {
                return Err(failure.into_error());
            }
        } else {
            for failure in &collisions {
                log::warn!("skipping {}: permalink collision", failure.subject);
            }

            failures.extend(collisions);
        }

        log::info!("composing {} page(s)", timeline.len());
        let composed: Vec<Result<RenderedPage, Failure>> = time!("composing pages", (0..timeline.len())
            .into_par_iter()
            .map(|i| page::compose(self, &timeline, i))
            .collect());

        let mut pages = Vec::with_capacity(composed.len());
        for result in composed {
            match result {
                Ok(page) => pages.push(page),
                Err(failure) if fail_fast => return Err(failure.into_error()),
                Err(failure) => failures.push(failure),
            }
        }

        let index = page::index(self, &pages);
        for failure in &failures {
            log::error!("{failure}");
        }

        Ok(Rendering { pages, index, failures })
    }
}

/// Loads the site at `config.root`, renders it, and writes it to `output`.
///
/// Under a fail-fast configuration, any failure aborts the build before
/// anything is written. Otherwise every page that could be rendered is
/// written and the failures are returned in the [`Rendering`].
pub fn build(config: Config, output: &Path) -> Result<Rendering> {
    let site = Site::load(config)?;
    let rendering = site.render()?;
    time!("writing", rendering.write(output)?);
    log::info!("wrote {} page(s) to {}", rendering.pages.len() + 1, output.display());
    Ok(rendering)
}

/// Writes `contents` to `path`, creating parent directories as needed.
fn write_file(path: &Path, contents: &str) -> Result<()> {
    let error = || -> Error { fault!(Io, "failed to write output file", "path" => path.display()) };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).chain_with(error)?;
    }

    std::fs::write(path, contents).chain_with(error)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

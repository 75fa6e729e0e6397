//! Named layouts and their composition chains.
//!
//! A layout is an HTML template in the layouts directory, named by its file
//! stem. It may declare a parent in a front matter header:
//!
//! ```html
//! ---
//! layout: base
//! ---
//! <article><h1>{{ title }}</h1>{{ content }}</article>
//! ```
//!
//! Composing a document wraps its body in its layout, that output in the
//! parent, and so on up to a layout with no parent. Every layout is parsed
//! and its chain resolved exactly once, when the [`LayoutSet`] is built.

mod template;

use std::path::Path;
use std::sync::Arc;

use derive_more::Debug;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::document::split;
use crate::error::{Chainable, Error, Failure, Result, Subject};

pub use template::{Template, Slots, CONTENT};

/// A parsed layout.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: Arc<str>,
    pub parent: Option<Arc<str>>,
    #[debug(ignore)]
    pub template: Template,
}

#[derive(Deserialize)]
struct Header {
    layout: Option<String>,
}

/// A chain of layout names, innermost first.
pub type Chain = Arc<[Arc<str>]>;

/// Every layout, with every layout's chain resolved up front.
#[derive(Debug)]
pub struct LayoutSet {
    layouts: FxHashMap<Arc<str>, Layout>,
    chains: FxHashMap<Arc<str>, Result<Chain>>,
    max_depth: usize,
}

impl Layout {
    /// Parses the layout named `name` from its `source`.
    ///
    /// Fails with `MissingSlot` if the template has no `{{ content }}` slot,
    /// and with `MalformedFrontMatter` if its header is unusable.
    pub fn parse(name: &str, source: &str) -> Result<Layout> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let (parent, body) = if source.starts_with("---") {
            let (header, body) = split(source)?;
            let header: Option<Header> = serde_yaml_ng::from_str(header)
                .chain(fault!(MalformedFrontMatter, "invalid layout header"))?;

            let parent = header.and_then(|h| h.layout)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());

            (parent, body)
        } else {
            (None, source)
        };

        let template = Template::parse(body);
        if !template.has_slot(CONTENT) {
            return Err(fault! {
                MissingSlot, "layout has no `{{ content }}` slot",
                "layout" => name,
            });
        }

        Ok(Layout { name: name.into(), parent: parent.map(Arc::from), template })
    }
}

impl LayoutSet {
    /// Loads every `*.html` file directly inside `dir`. A missing directory
    /// yields an empty set.
    pub fn load(dir: &Path, max_depth: usize) -> Result<LayoutSet> {
        if !dir.is_dir() {
            log::warn!("layout directory {} does not exist", dir.display());
            return Ok(LayoutSet::from_sources(Vec::<(String, String)>::new(), max_depth));
        }

        let mut sources = vec![];
        let entries = std::fs::read_dir(dir)
            .chain_with(|| fault!(Io, "failed to read layout directory", "path" => dir.display()))?;

        for entry in entries {
            let path = entry.chain(fault!(Io, "failed to read layout directory"))?.path();
            let is_html = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
            if !is_html || !path.is_file() {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("skipping layout with non UTF-8 name: {}", path.display());
                continue;
            };

            let source = std::fs::read_to_string(&path)
                .chain_with(|| fault!(Io, "failed to read layout", "path" => path.display()))?;

            sources.push((name.to_string(), source));
        }

        Ok(LayoutSet::from_sources(sources, max_depth))
    }

    /// Builds a set from `(name, source)` pairs. Layouts that fail to parse or
    /// whose chain is invalid are kept, and their errors are reported by
    /// [`LayoutSet::faults()`] and by every attempt to use them.
    ///
    /// ```rust
    /// use quire::layout::{LayoutSet, Slots};
    ///
    /// let layouts = LayoutSet::from_sources([
    ///     ("base", "<html>{{ content }}</html>"),
    ///     ("post", "---\nlayout: base\n---\n<article>{{ content }}</article>"),
    /// ], 10);
    ///
    /// assert!(layouts.faults().is_empty());
    /// let chain = layouts.chain("post").unwrap();
    /// assert_eq!(chain.iter().map(|name| &**name).collect::<Vec<_>>(), ["post", "base"]);
    ///
    /// let page = layouts.compose("post", "<p>Hi</p>", &Slots::new()).unwrap();
    /// assert_eq!(page, "<html><article><p>Hi</p></article></html>");
    /// ```
    pub fn from_sources<I, N, S>(sources: I, max_depth: usize) -> LayoutSet
        where I: IntoIterator<Item = (N, S)>, N: AsRef<str>, S: AsRef<str>
    {
        let mut layouts = FxHashMap::default();
        let mut broken = FxHashMap::default();
        for (name, source) in sources {
            let name = name.as_ref();
            match Layout::parse(name, source.as_ref()) {
                Ok(layout) => { layouts.insert(layout.name.clone(), layout); }
                Err(e) => { broken.insert(Arc::<str>::from(name), e); }
            }
        }

        let names = layouts.keys().chain(broken.keys()).cloned().collect::<Vec<_>>();
        let chains = names.into_iter()
            .map(|name| {
                let chain = resolve(&name, &layouts, &broken, max_depth);
                (name, chain)
            })
            .collect();

        LayoutSet { layouts, chains, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether a layout named `name` exists, usable or not.
    pub fn contains(&self, name: &str) -> bool {
        self.chains.contains_key(name)
    }

    /// The names of every layout, usable or not, sorted.
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.chains.keys().cloned().collect();
        names.sort();
        names
    }

    /// The chain for the layout `name`, innermost first.
    pub fn chain(&self, name: &str) -> Result<Chain> {
        match self.chains.get(name) {
            Some(Ok(chain)) => Ok(chain.clone()),
            Some(Err(e)) => Err(e.clone().chain(error!("layout is unusable", "layout" => name))),
            None => Err(fault!(UnknownLayout, "no such layout", "layout" => name)),
        }
    }

    /// Wraps `content` in every layout of `name`'s chain, filling the other
    /// slots from `slots` at every level.
    pub fn compose(&self, name: &str, content: &str, slots: &Slots) -> Result<String> {
        let chain = self.chain(name)?;
        let mut html = content.to_string();
        for name in chain.iter() {
            let layout = self.layouts.get(name)
                .ok_or_else(|| fault!(UnknownLayout, "no such layout", "layout" => name))?;

            html = layout.template.render(&html, slots);
        }

        Ok(html)
    }

    /// One failure per unusable layout, ordered by layout name.
    pub fn faults(&self) -> Vec<Failure> {
        self.names().into_iter()
            .filter_map(|name| match self.chains.get(&name) {
                Some(Err(e)) => Some(Failure::new(Subject::Layout(name), e.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Resolves `name`'s chain by walking parents, innermost first.
fn resolve(
    name: &Arc<str>,
    layouts: &FxHashMap<Arc<str>, Layout>,
    broken: &FxHashMap<Arc<str>, Error>,
    max_depth: usize,
) -> Result<Chain> {
    let mut chain: Vec<Arc<str>> = vec![];
    let mut visited = FxHashSet::default();
    let mut current = name.clone();
    loop {
        if !visited.insert(current.clone()) {
            let path = chain.iter().map(|n| &**n).collect::<Vec<_>>().join(" -> ");
            return Err(fault! {
                LayoutCycle, "layout chain revisits a layout",
                "chain" => format!("{path} -> {current}"),
            });
        }

        if let Some(error) = broken.get(&current) {
            return match chain.last() {
                None => Err(error.clone()),
                Some(child) => Err(error.clone().chain(error! {
                    "parent layout is unusable",
                    "layout" => child,
                    "parent" => &current,
                })),
            };
        }

        let Some(layout) = layouts.get(&current) else {
            return Err(fault! {
                UnknownLayout, "parent layout does not exist",
                "layout" => chain.last().map_or("", |n| &**n),
                "parent" => &current,
            });
        };

        chain.push(current.clone());
        if chain.len() > max_depth {
            return Err(fault! {
                LayoutChainTooDeep, "layout chain is too deep",
                "layout" => name,
                "maximum depth" => max_depth,
            });
        }

        match &layout.parent {
            Some(parent) => current = parent.clone(),
            None => return Ok(chain.into()),
        }
    }
}

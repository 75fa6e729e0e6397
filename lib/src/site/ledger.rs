use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::{Failure, Subject};
use super::Prepared;

/// The single owner of cross-document state.
///
/// Every prepared document is [recorded](Ledger::record()) here, in any order.
/// [Closing](Ledger::close()) the ledger rejects documents whose permalinks
/// collide and orders the rest into a [`Timeline`].
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<Prepared>,
    slugs: FxHashMap<String, Vec<usize>>,
}

/// Published documents in publish order: newest first.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    posts: Vec<Prepared>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    pub fn record(&mut self, prepared: Prepared) {
        let slug = prepared.schedule.permalink.slug.clone();
        self.slugs.entry(slug).or_default().push(self.entries.len());
        self.entries.push(prepared);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Orders every recorded document. Documents that share a permalink are
    /// all withheld from the timeline, and each gets a `PermalinkCollision`
    /// failure; failures are ordered by source path.
    pub fn close(self) -> (Timeline, Vec<Failure>) {
        let mut collided = vec![false; self.entries.len()];
        let mut failures = BTreeMap::new();
        for (slug, indices) in &self.slugs {
            if indices.len() < 2 {
                continue;
            }

            for &i in indices {
                collided[i] = true;
                let path = &self.entries[i].path;
                let others = indices.iter()
                    .filter(|&&j| j != i)
                    .map(|&j| self.entries[j].path.display().to_string())
                    .collect::<Vec<_>>();

                let error = fault! {
                    PermalinkCollision, "another document has the same permalink",
                    "permalink" => slug,
                    "other documents" => others.join(", "),
                };

                failures.insert(path.clone(), Failure::new(Subject::Document(path.clone()), error));
            }
        }

        let mut posts = self.entries.into_iter()
            .zip(collided)
            .filter_map(|(entry, collided)| (!collided).then_some(entry))
            .collect::<Vec<_>>();

        posts.sort_by_cached_key(|post| post.sort_key());
        (Timeline { posts }, failures.into_values().collect())
    }
}

impl Timeline {
    pub fn posts(&self) -> &[Prepared] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The post published just after the `i`th one.
    pub fn newer(&self, i: usize) -> Option<&Prepared> {
        self.posts.get(i.checked_sub(1)?)
    }

    /// The post published just before the `i`th one.
    pub fn older(&self, i: usize) -> Option<&Prepared> {
        self.posts.get(i + 1)
    }

    /// Up to `n` posts nearest the `i`th one, alternating newer and older
    /// starting with newer, in publish order.
    pub fn related(&self, i: usize, n: usize) -> Vec<&Prepared> {
        let mut indices = vec![];
        let mut distance = 1;
        while indices.len() < n && (distance <= i || i + distance < self.posts.len()) {
            if let Some(newer) = i.checked_sub(distance) {
                indices.push(newer);
            }

            if indices.len() < n && i + distance < self.posts.len() {
                indices.push(i + distance);
            }

            distance += 1;
        }

        indices.sort_unstable();
        indices.into_iter().map(|j| &self.posts[j]).collect()
    }
}

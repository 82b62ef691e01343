//! Lookup from a requested translation direction to a checkpoint.
//!
//! Checkpoints named `<source>__<target>` declare the direction they serve.
//! A side declared without a region acts as a wildcard for every region of
//! that language (`en__it` serves `en-US > it-CH`); a side declared with a
//! region only matches that exact region. Exact matches win over wildcard
//! ones, otherwise registration order decides.
//!
//! Language rules rewrite a requested language before matching, e.g. `zh`
//! to `zh-CN`. A language some checkpoint declares with its region is never
//! rewritten.

use crate::lang::{Language, LanguagePair};
use crate::pool::CheckpointPool;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Rewrite of a requested language. A `from` without region matches every
/// region of that language; with a region it matches only that tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRule {
    pub from: Language,
    pub to: Language,
}

impl LanguageRule {
    pub fn new(from: Language, to: Language) -> Self {
        Self { from, to }
    }

    fn matches(&self, language: &Language) -> bool {
        side_matches(&self.from, language)
    }
}

/// Which way round a pair resolved in
/// [`resolve_ignoring_direction`](LanguageIndex::resolve_ignoring_direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reversed,
}

#[derive(Debug, Clone)]
struct Entry {
    pair: LanguagePair,
    position: usize,
}

impl Entry {
    fn matches(&self, requested: &LanguagePair) -> bool {
        side_matches(&self.pair.source, &requested.source)
            && side_matches(&self.pair.target, &requested.target)
    }
}

fn side_matches(declared: &Language, requested: &Language) -> bool {
    match declared.region() {
        Some(_) => declared == requested,
        None => declared.language() == requested.language(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct LanguageIndex {
    entries: Vec<Entry>,
    rules: Vec<LanguageRule>,
    /// Regional languages declared by checkpoints; rules leave them alone.
    rules_skip_list: HashSet<Language>,
    resolved: HashMap<LanguagePair, Option<usize>>,
}

impl LanguageIndex {
    pub fn from_pool(pool: &CheckpointPool) -> Self {
        let mut entries = Vec::with_capacity(pool.len());
        let mut rules_skip_list = HashSet::new();

        for (position, checkpoint) in pool.iter().enumerate() {
            let Some(pair) = checkpoint.language_pair() else {
                debug!(
                    name = checkpoint.name(),
                    "checkpoint name declares no language direction; not indexed"
                );
                continue;
            };
            for side in [&pair.source, &pair.target] {
                if side.region().is_some() {
                    rules_skip_list.insert(side.clone());
                }
            }
            entries.push(Entry { pair, position });
        }

        Self {
            entries,
            rules: Vec::new(),
            rules_skip_list,
            resolved: HashMap::new(),
        }
    }

    /// Append language rules. For a given language the first matching rule
    /// applies.
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = LanguageRule>) -> Self {
        self.rules.extend(rules);
        self.resolved.clear();
        self
    }

    /// Directions declared by the indexed checkpoints, in pool order.
    pub fn languages(&self) -> impl Iterator<Item = &LanguagePair> {
        self.entries.iter().map(|entry| &entry.pair)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pool position of the checkpoint serving `requested`. Memoised.
    pub fn resolve(&mut self, requested: &LanguagePair) -> Option<usize> {
        if let Some(cached) = self.resolved.get(requested) {
            return *cached;
        }

        let found = self.search(requested);
        self.resolved.insert(requested.clone(), found);
        found
    }

    /// Like [`resolve`](Self::resolve), falling back to the reversed pair.
    pub fn resolve_ignoring_direction(
        &mut self,
        requested: &LanguagePair,
    ) -> Option<(usize, Direction)> {
        if let Some(position) = self.resolve(requested) {
            return Some((position, Direction::Forward));
        }
        self.resolve(&requested.reversed())
            .map(|position| (position, Direction::Reversed))
    }

    fn search(&self, requested: &LanguagePair) -> Option<usize> {
        let requested = LanguagePair::new(
            self.transform(&requested.source),
            self.transform(&requested.target),
        );

        self.entries
            .iter()
            .find(|entry| entry.pair == requested)
            .or_else(|| self.entries.iter().find(|entry| entry.matches(&requested)))
            .map(|entry| entry.position)
    }

    fn transform(&self, language: &Language) -> Language {
        if self.rules_skip_list.contains(language) {
            return language.clone();
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(language))
            .map(|rule| rule.to.clone())
            .unwrap_or_else(|| language.clone())
    }
}

//! Views of the entry store the graph engine computes distances through.

use std::marker::PhantomData;

use simgraph_core::{IndexOracle, SearchOracle, Similarity};

use crate::entry::Entry;

/// Pairwise view over every entry, used while building a graph.
///
/// Distances are polarity-normalised so smaller always means closer.
pub struct BuildOracle<'s, 'a, S: Similarity> {
    entries: &'s [Entry<'a, S::Feature>],
    _metric: PhantomData<fn() -> S>,
}

impl<'s, 'a, S: Similarity> BuildOracle<'s, 'a, S> {
    pub fn new(entries: &'s [Entry<'a, S::Feature>]) -> Self {
        Self {
            entries,
            _metric: PhantomData,
        }
    }
}

impl<S: Similarity> IndexOracle for BuildOracle<'_, '_, S> {
    fn size(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> f32 {
        S::rank(S::apply(self.entries[i].feature, self.entries[j].feature))
    }
}

/// Query-to-entry view over the visible prefix of the store.
///
/// `distance` reports the metric's raw score; `rank` supplies the ordering.
pub struct QueryOracle<'s, 'a, S: Similarity> {
    entries: &'s [Entry<'a, S::Feature>],
    visible: usize,
    query: &'s S::Feature,
    _metric: PhantomData<fn() -> S>,
}

impl<'s, 'a, S: Similarity> QueryOracle<'s, 'a, S> {
    pub fn new(entries: &'s [Entry<'a, S::Feature>], visible: usize, query: &'s S::Feature) -> Self {
        Self {
            entries,
            visible: visible.min(entries.len()),
            query,
            _metric: PhantomData,
        }
    }
}

impl<S: Similarity> SearchOracle for QueryOracle<'_, '_, S> {
    fn size(&self) -> usize {
        self.visible
    }

    #[inline]
    fn distance(&self, i: usize) -> f32 {
        S::apply(self.entries[i].feature, self.query)
    }

    #[inline]
    fn rank(&self, raw: f32) -> f32 {
        S::rank(raw)
    }
}

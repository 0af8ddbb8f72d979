//! The similarity index and its lifecycle.
//!
//! ```text
//!   insert ──► entries grow, visible_count lags
//!   rebuild ─► visible_count = entries.len(), graph rebuilt (or dropped)
//!   snapshot ► graph + .meta on disk (only when a graph exists)
//!   recover ─► graph + count from disk, or rebuild on any failure
//! ```
//!
//! Mutations take `&mut self` and searches take `&self`, so the borrow
//! checker enforces "no search while a rebuild or insert is in flight" for
//! a single owner. Hosts sharing an index across threads wrap it in a lock.

use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

use simgraph_core::{KGraph, Similarity};

use crate::config::{IndexConfig, IndexMode};
use crate::entry::EntryStore;
use crate::oracle::BuildOracle;
use crate::persist::{self, PersistError};

/// How [`SimilarityIndex::recover`] ended up with a usable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The snapshot was valid and is now installed.
    Loaded { visible_count: usize },
    /// The snapshot was missing or unusable; the index was rebuilt from its
    /// current entries instead.
    Rebuilt,
}

/// Mutable similarity index over borrowed features.
///
/// Features must outlive the index (`'a`); they are never copied.
pub struct SimilarityIndex<'a, S: Similarity> {
    pub(crate) entries: EntryStore<'a, S::Feature>,
    pub(crate) visible_count: usize,
    pub(crate) graph: Option<KGraph>,
    pub(crate) config: IndexConfig,
    _metric: PhantomData<fn() -> S>,
}

impl<'a, S: Similarity> SimilarityIndex<'a, S> {
    /// Create an empty index in the mode named by `config`.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            entries: EntryStore::new(),
            visible_count: 0,
            graph: None,
            config,
            _metric: PhantomData,
        }
    }

    /// Graph-backed index (brute force until `min_build_size` entries).
    pub fn approximate(mut config: IndexConfig) -> Self {
        config.mode = IndexMode::Approximate;
        Self::new(config)
    }

    /// Brute-force only index.
    pub fn linear(mut config: IndexConfig) -> Self {
        config.mode = IndexMode::Linear;
        Self::new(config)
    }

    /// Append an entry. It becomes searchable after the next [`rebuild`](Self::rebuild).
    pub fn insert(&mut self, object: u32, tag: u32, feature: &'a S::Feature) {
        self.entries.append(object, tag, feature);
    }

    /// Drop every entry and any graph.
    pub fn clear(&mut self) {
        self.graph = None;
        self.entries.clear();
        self.visible_count = 0;
    }

    /// Make every inserted entry searchable.
    ///
    /// Builds a new graph when the index is approximate and holds at least
    /// `min_build_size` entries; the old graph stays in place until the new
    /// one is ready.
    pub fn rebuild(&mut self) {
        let total = self.entries.len();
        if total == self.visible_count {
            return;
        }

        if self.config.mode == IndexMode::Linear || total < self.config.min_build_size {
            if self.graph.take().is_some() {
                tracing::debug!("dropping graph, {} entries below build threshold", total);
            }
            self.visible_count = total;
            return;
        }

        tracing::info!("rebuilding index for {} features", total);
        let start = Instant::now();
        let oracle = BuildOracle::<S>::new(self.entries.as_slice());
        let graph = KGraph::build(&oracle, &self.config.index);

        tracing::info!("swapping in new index");
        self.graph = Some(graph);
        self.visible_count = total;
        tracing::info!(
            metric = S::NAME,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index rebuilt"
        );
    }

    /// Restore a graph written by [`snapshot`](Self::snapshot), falling back
    /// to [`rebuild`](Self::rebuild) when it cannot be used.
    ///
    /// A loaded snapshot may cover fewer entries than are currently stored;
    /// call `rebuild` before searching in that case.
    pub fn recover<P: AsRef<Path>>(&mut self, path: P) -> RecoveryOutcome {
        let path = path.as_ref();
        if self.config.mode == IndexMode::Linear {
            self.rebuild();
            return RecoveryOutcome::Rebuilt;
        }

        match self.load_snapshot(path) {
            Ok((graph, visible_count)) => {
                self.graph = Some(graph);
                self.visible_count = visible_count;
                tracing::info!("recovered index from {:?}: {} features", path, visible_count);
                RecoveryOutcome::Loaded { visible_count }
            }
            Err(err) => {
                tracing::warn!("failed to recover index from {:?} ({}), rebuilding", path, err);
                self.rebuild();
                RecoveryOutcome::Rebuilt
            }
        }
    }

    fn load_snapshot(&self, path: &Path) -> Result<(KGraph, usize), PersistError> {
        let (graph, visible_count) = persist::load(path)?;
        let entries = self.entries.len();
        if graph.size() != visible_count || visible_count > entries {
            return Err(PersistError::Inconsistent {
                graph_nodes: graph.size(),
                visible_count,
                entries,
            });
        }
        Ok((graph, visible_count))
    }

    /// Persist the current graph. Returns `Ok(false)` without touching the
    /// filesystem when no graph is built.
    pub fn snapshot<P: AsRef<Path>>(&self, path: P) -> Result<bool, PersistError> {
        let Some(graph) = &self.graph else {
            return Ok(false);
        };
        let path = path.as_ref();
        persist::save(graph, self.visible_count, path)?;
        tracing::info!("snapshot written to {:?}: {} features", path, self.visible_count);
        Ok(true)
    }

    /// Number of inserted entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries covered by the last rebuild or recovery.
    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn is_built(&self) -> bool {
        self.graph.is_some()
    }

    pub fn mode(&self) -> IndexMode {
        self.config.mode
    }

    pub fn graph(&self) -> Option<&KGraph> {
        self.graph.as_ref()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn entries(&self) -> &EntryStore<'a, S::Feature> {
        &self.entries
    }
}

//! simgraph: a mutable similarity index over borrowed feature vectors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SimilarityIndex (lifecycle)                 │
//! │    insert · rebuild · clear · snapshot · recover · search   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        BuildOracle / QueryOracle over the EntryStore        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          simgraph-core: KGraph (NN-descent) + metrics       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod entry;
pub mod index;
pub mod oracle;
pub mod persist;
pub mod search;

pub use config::{ConfigError, IndexConfig, IndexMode};
pub use entry::{Entry, EntryStore};
pub use index::{RecoveryOutcome, SimilarityIndex};
pub use persist::PersistError;
pub use search::{Match, SearchHints};

pub use simgraph_core::{Cosine, DotProduct, IndexParams, L2Squared, SearchParams, Similarity, L2};

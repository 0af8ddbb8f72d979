//! simgraph core – k-NN graph engine, similarity metrics and SIMD kernels
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  KGraph (NN-descent build)                  │
//! │      best-first search · parallel restarts · save/load     │
//! ├─────────────────────────────────────────────────────────────┤
//! │          IndexOracle / SearchOracle distance callbacks      │
//! ├─────────────────────────────────────────────────────────────┤
//! │       Similarity metrics (L2, L2², dot, cosine) + SIMD      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod candidate;
pub mod error;
pub mod kgraph;
pub mod metric;
pub mod oracle;
pub mod simd;
mod visited;

pub use error::GraphError;
pub use kgraph::{GraphStats, IndexParams, KGraph, SaveFormat, SearchParams};
pub use metric::{Cosine, DotProduct, Similarity, L2Squared, L2};
pub use oracle::{IndexOracle, SearchOracle};

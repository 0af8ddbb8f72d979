//! Approximate k-NN graph.
//!
//! Built by NN-descent from an [`IndexOracle`](crate::oracle::IndexOracle)
//! and searched best-first through a
//! [`SearchOracle`](crate::oracle::SearchOracle). The graph stores only
//! node ids and (optionally) edge distances; features stay with the caller.
//!
//! ```text
//!  build:   random pools ──► local joins (new×new, new×old) ──► top-K lists
//!  search:  random seeds ──► expand closest unchecked ──► top-K within epsilon
//! ```

mod build;
mod params;
mod search;
mod serialize;

pub use params::{IndexParams, SearchParams};
pub use serialize::SaveFormat;

use crate::oracle::IndexOracle;

/// Outgoing edges of one node, closest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub ids: Vec<u32>,
    /// Edge distances aligned with `ids`; empty when loaded without them.
    pub dists: Vec<f32>,
}

/// A built k-NN graph over items `0..size()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KGraph {
    nodes: Vec<Node>,
}

/// Degree summary of a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
}

impl KGraph {
    /// Build a graph over `0..oracle.size()`.
    pub fn build<O: IndexOracle>(oracle: &O, params: &IndexParams) -> Self {
        build::nn_descent(oracle, params)
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Neighbour ids of node `id`, closest first. Empty for unknown ids.
    pub fn neighbors(&self, id: usize) -> &[u32] {
        self.nodes.get(id).map(|n| n.ids.as_slice()).unwrap_or(&[])
    }

    pub fn stats(&self) -> GraphStats {
        let degrees = self.nodes.iter().map(|n| n.ids.len());
        let edges: usize = degrees.clone().sum();
        GraphStats {
            nodes: self.nodes.len(),
            edges,
            min_degree: degrees.clone().min().unwrap_or(0),
            max_degree: degrees.max().unwrap_or(0),
            mean_degree: if self.nodes.is_empty() {
                0.0
            } else {
                edges as f64 / self.nodes.len() as f64
            },
        }
    }
}

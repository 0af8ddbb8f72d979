//! Construction and search tuning knobs.

use serde::{Deserialize, Serialize};

/// NN-descent construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Upper bound on refinement iterations.
    pub iterations: usize,
    /// Candidate pool size kept per node while building (at least `k`).
    pub l: usize,
    /// Neighbours kept per node in the finished graph.
    pub k: usize,
    /// New neighbours sampled per node per iteration.
    pub s: usize,
    /// Reverse neighbours sampled per node per iteration.
    pub r: usize,
    /// Control nodes used to estimate recall between iterations.
    pub controls: usize,
    pub seed: u64,
    /// Stop when fewer than `delta * n * k` pool updates happen in an iteration.
    pub delta: f32,
    /// Stop once estimated recall on the control nodes reaches this.
    pub recall: f32,
    /// 0 keeps the raw k-NN lists, 1 drops redundant edges, 2 also adds
    /// reverse edges into lists that have room.
    pub prune: u32,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            iterations: 30,
            l: 100,
            k: 25,
            s: 10,
            r: 100,
            controls: 100,
            seed: 1998,
            delta: 0.002,
            recall: 0.99,
            prune: 0,
        }
    }
}

/// Graph search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Results wanted.
    pub k: usize,
    /// Neighbours expanded per visited node; 0 expands all of them.
    pub m: usize,
    /// Candidate pool size (raised to `k` when smaller).
    pub p: usize,
    /// Independent seeded restarts, run in parallel and merged.
    pub t: usize,
    /// Largest rank a result may have.
    pub epsilon: f32,
    pub seed: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            k: 10,
            m: 0,
            p: 100,
            t: 1,
            epsilon: f32::MAX,
            seed: 1998,
        }
    }
}

//! Distance callbacks the graph engine works through.
//!
//! The engine never sees features. Construction asks an [`IndexOracle`] for
//! the distance between two stored items; search asks a [`SearchOracle`] for
//! the distance from the live query to one stored item.

use crate::candidate::{Candidate, TopK};

/// Pairwise distances over the items a graph is built from.
///
/// `distance` must already be in "smaller is closer" form.
pub trait IndexOracle {
    fn size(&self) -> usize;
    fn distance(&self, i: usize, j: usize) -> f32;
}

/// Query-to-item distances for one search.
pub trait SearchOracle {
    /// Number of items searchable; ids at or above this are never returned.
    fn size(&self) -> usize;

    /// Raw score between the query and item `i`, as reported to callers.
    fn distance(&self, i: usize) -> f32;

    /// Ordering key for a raw score, smaller is closer. Identity by default.
    #[inline]
    fn rank(&self, raw: f32) -> f32 {
        raw
    }

    /// Exhaustive scan over `0..size()`.
    ///
    /// Returns up to `k` `(id, raw)` pairs best-first, skipping anything whose
    /// rank exceeds `epsilon`.
    fn search(&self, k: usize, epsilon: f32) -> Vec<(u32, f32)> {
        let mut top = TopK::new(k.min(self.size()));
        for i in 0..self.size() {
            let raw = self.distance(i);
            let rank = self.rank(raw);
            if !(rank <= epsilon) {
                continue;
            }
            top.push(Candidate {
                id: i as u32,
                rank,
                raw,
            });
        }
        top.into_sorted()
            .into_iter()
            .map(|c| (c.id, c.raw))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn line() -> Vec<Vec<f32>> {
        (0..10).map(|i| vec![i as f32, 0.0]).collect()
    }

    #[test]
    fn test_brute_force_orders_by_rank() {
        let data = line();
        let query = [3.2, 0.0];
        let oracle = VecSearchOracle {
            data: &data,
            query: &query,
            limit: data.len(),
        };
        let ids: Vec<u32> = oracle.search(3, f32::INFINITY).iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![3, 4, 2]);
    }

    #[test]
    fn test_brute_force_respects_size_bound() {
        let data = line();
        let query = [9.0, 0.0];
        let oracle = VecSearchOracle {
            data: &data,
            query: &query,
            limit: 4,
        };
        let results = oracle.search(10, f32::INFINITY);
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|(id, _)| *id < 4));
        assert_eq!(results[0].0, 3);
    }

    #[test]
    fn test_brute_force_k_larger_than_size() {
        let data = line();
        let query = [2.0, 0.0];
        let oracle = VecSearchOracle {
            data: &data,
            query: &query,
            limit: data.len(),
        };
        let results = oracle.search(usize::MAX, f32::INFINITY);
        assert_eq!(results.len(), data.len());
        assert_eq!(results[0].0, 2);
    }

    #[test]
    fn test_brute_force_epsilon_cuts_far_items() {
        let data = line();
        let query = [0.0, 0.0];
        let oracle = VecSearchOracle {
            data: &data,
            query: &query,
            limit: data.len(),
        };
        // squared distances 0, 1, 4, 9 ...
        let results = oracle.search(10, 4.0);
        let ids: Vec<u32> = results.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_brute_force_returns_raw_for_negated_rank() {
        let data = line();
        let query = [5.0, 0.0];
        let oracle = NegatedSearchOracle {
            data: &data,
            query: &query,
        };
        let results = oracle.search(1, f32::INFINITY);
        assert_eq!(results[0].0, 5);
        // raw value, not the rank
        assert_eq!(results[0].1, -0.0);

        // epsilon is compared in rank space: keep raw >= -1.0
        let near = oracle.search(10, 1.0);
        assert_eq!(near.len(), 3);
        assert!(near.iter().all(|(_, raw)| *raw >= -1.0));
    }
}

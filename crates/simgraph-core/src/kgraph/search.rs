//! Best-first graph search.

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::prelude::*;

use super::{KGraph, SearchParams};
use crate::candidate::{Candidate, TopK};
use crate::oracle::SearchOracle;
use crate::visited::Visited;

#[derive(Clone, Copy)]
struct Slot {
    candidate: Candidate,
    checked: bool,
}

/// Sorted, bounded search frontier.
struct Frontier {
    slots: Vec<Slot>,
    capacity: usize,
}

impl Frontier {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    fn offer(&mut self, candidate: Candidate) {
        if self.slots.len() >= self.capacity {
            match self.slots.last() {
                Some(worst) if candidate < worst.candidate => {}
                _ => return,
            }
        }
        let pos = self
            .slots
            .partition_point(|s| s.candidate.cmp(&candidate) == Ordering::Less);
        self.slots.insert(
            pos,
            Slot {
                candidate,
                checked: false,
            },
        );
        self.slots.truncate(self.capacity);
    }

    /// Closest unchecked node, marked checked.
    fn next_unchecked(&mut self) -> Option<u32> {
        let slot = self.slots.iter_mut().find(|s| !s.checked)?;
        slot.checked = true;
        Some(slot.candidate.id)
    }
}

impl KGraph {
    /// k-NN search.
    ///
    /// Only items below `oracle.size()` are considered, so a graph built over
    /// more items than the oracle exposes never leaks the extra ones. Results
    /// are `(id, raw)` pairs best-first, limited to `params.k` and to ranks
    /// no greater than `params.epsilon`.
    pub fn search<O>(&self, oracle: &O, params: &SearchParams) -> Vec<(u32, f32)>
    where
        O: SearchOracle + Sync,
    {
        let limit = oracle.size().min(self.size());
        if limit == 0 || params.k == 0 {
            return Vec::new();
        }

        let runs = params.t.max(1);
        let partials: Vec<Vec<Candidate>> = if runs == 1 {
            vec![self.search_once(oracle, params, limit, params.seed)]
        } else {
            (0..runs)
                .into_par_iter()
                .map(|run| {
                    let seed = params.seed.wrapping_add(run as u64);
                    self.search_once(oracle, params, limit, seed)
                })
                .collect()
        };

        let mut seen = HashSet::new();
        let mut top = TopK::new(params.k.min(limit));
        for candidate in partials.into_iter().flatten() {
            if seen.insert(candidate.id) {
                top.push(candidate);
            }
        }
        top.into_sorted()
            .into_iter()
            .filter(|c| c.rank <= params.epsilon)
            .map(|c| (c.id, c.raw))
            .collect()
    }

    fn search_once<O: SearchOracle>(
        &self,
        oracle: &O,
        params: &SearchParams,
        limit: usize,
        seed: u64,
    ) -> Vec<Candidate> {
        let pool_size = params.p.max(params.k).min(limit);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut visited = Visited::new(limit);
        let mut frontier = Frontier::new(pool_size);

        let score = |id: u32| {
            let raw = oracle.distance(id as usize);
            Candidate {
                id,
                rank: oracle.rank(raw),
                raw,
            }
        };

        for id in index::sample(&mut rng, limit, pool_size).iter() {
            visited.visit(id);
            frontier.offer(score(id as u32));
        }

        while let Some(node) = frontier.next_unchecked() {
            let neighbors = self.neighbors(node as usize);
            let expand = if params.m > 0 {
                &neighbors[..params.m.min(neighbors.len())]
            } else {
                neighbors
            };
            for &next in expand {
                if next as usize >= limit || !visited.visit(next as usize) {
                    continue;
                }
                frontier.offer(score(next));
            }
        }

        frontier
            .slots
            .into_iter()
            .take(params.k)
            .map(|s| s.candidate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kgraph::IndexParams;
    use crate::oracle::testing::{NegatedSearchOracle, VecIndexOracle, VecSearchOracle};
    use rand::Rng;

    fn random_data(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dim).map(|_| rng.gen::<f32>()).collect())
            .collect()
    }

    fn build(data: &[Vec<f32>]) -> KGraph {
        let params = IndexParams {
            k: 12,
            l: 24,
            ..IndexParams::default()
        };
        KGraph::build(&VecIndexOracle { data }, &params)
    }

    #[test]
    fn test_finds_stored_item() {
        let data = random_data(500, 8, 1);
        let graph = build(&data);
        let params = SearchParams {
            k: 5,
            p: 64,
            ..SearchParams::default()
        };
        for target in [0, 17, 250, 499] {
            let oracle = VecSearchOracle {
                data: &data,
                query: &data[target],
                limit: data.len(),
            };
            let results = graph.search(&oracle, &params);
            assert_eq!(results.len(), 5);
            assert_eq!(results[0].0 as usize, target);
            assert_eq!(results[0].1, 0.0);
        }
    }

    #[test]
    fn test_results_sorted_and_match_brute_force_mostly() {
        let data = random_data(800, 6, 2);
        let graph = build(&data);
        let queries = random_data(20, 6, 99);
        let params = SearchParams {
            k: 10,
            p: 50,
            ..SearchParams::default()
        };

        let mut hits = 0;
        for q in &queries {
            let oracle = VecSearchOracle {
                data: &data,
                query: q,
                limit: data.len(),
            };
            let got = graph.search(&oracle, &params);
            assert!(got.windows(2).all(|w| w[0].1 <= w[1].1));
            let truth: Vec<u32> = oracle.search(10, f32::MAX).iter().map(|r| r.0).collect();
            hits += got.iter().filter(|(id, _)| truth.contains(id)).count();
        }
        let recall = hits as f32 / (queries.len() * 10) as f32;
        assert!(recall > 0.85, "recall too low: {recall}");
    }

    #[test]
    fn test_respects_oracle_size() {
        let data = random_data(300, 4, 3);
        let graph = build(&data);
        let oracle = VecSearchOracle {
            data: &data,
            query: &data[299],
            limit: 100,
        };
        let results = graph.search(&oracle, &SearchParams::default());
        assert!(!results.is_empty());
        assert!(results.iter().all(|(id, _)| *id < 100));
    }

    #[test]
    fn test_epsilon_and_rank() {
        let data: Vec<Vec<f32>> = (0..50).map(|i| vec![i as f32]).collect();
        let graph = build(&data);

        let query = [10.0];
        let oracle = NegatedSearchOracle {
            data: &data,
            query: &query,
        };
        // rank = squared distance; keep <= 4 → ids 8..=12
        let params = SearchParams {
            k: 20,
            epsilon: 4.0,
            ..SearchParams::default()
        };
        let results = graph.search(&oracle, &params);
        let mut ids: Vec<u32> = results.iter().map(|r| r.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![8, 9, 10, 11, 12]);
        assert_eq!(results[0].0, 10);
        // raw values come back unnegated by the engine
        assert!(results.iter().all(|(_, raw)| *raw <= 0.0));
    }

    #[test]
    fn test_parallel_restarts_merge_without_duplicates() {
        let data = random_data(400, 4, 4);
        let graph = build(&data);
        let oracle = VecSearchOracle {
            data: &data,
            query: &data[7],
            limit: data.len(),
        };
        let params = SearchParams {
            k: 10,
            t: 4,
            ..SearchParams::default()
        };
        let results = graph.search(&oracle, &params);
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].0, 7);
        let unique: HashSet<u32> = results.iter().map(|r| r.0).collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_k_larger_than_graph() {
        let data = random_data(40, 3, 6);
        let graph = build(&data);
        let oracle = VecSearchOracle {
            data: &data,
            query: &data[5],
            limit: data.len(),
        };
        let params = SearchParams {
            k: usize::MAX,
            ..SearchParams::default()
        };
        let results = graph.search(&oracle, &params);
        assert!(results.len() <= data.len());
        assert_eq!(results[0].0, 5);
    }

    #[test]
    fn test_empty_and_zero_k() {
        let graph = KGraph::default();
        let data = vec![vec![0.0]];
        let oracle = VecSearchOracle {
            data: &data,
            query: &data[0],
            limit: 1,
        };
        assert!(graph.search(&oracle, &SearchParams::default()).is_empty());

        let graph = build(&random_data(10, 2, 5));
        let params = SearchParams {
            k: 0,
            ..SearchParams::default()
        };
        assert!(graph.search(&oracle, &params).is_empty());
    }
}

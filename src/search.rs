//! Query path: hint normalisation, dispatch to graph or brute force, and
//! materialisation of matches.

use serde::Serialize;
use simgraph_core::{SearchOracle, SearchParams, Similarity};

use crate::index::SimilarityIndex;
use crate::oracle::QueryOracle;

/// Per-query knobs. Non-positive `k` and non-positive or non-finite `r`
/// fall back to the index defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHints {
    pub k: i32,
    pub r: f32,
}

impl Default for SearchHints {
    fn default() -> Self {
        Self { k: 0, r: f32::NAN }
    }
}

impl SearchHints {
    /// `k` results with the default radius.
    pub fn top(k: i32) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_radius(mut self, r: f32) -> Self {
        self.r = r;
        self
    }
}

/// One search result. `distance` is the metric's raw score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Match {
    pub object: u32,
    pub tag: u32,
    pub distance: f32,
}

fn usable_radius(r: f32) -> Option<f32> {
    (r.is_finite() && r > 0.0).then_some(r)
}

/// Rank-space bound for a radius: similarities flip sign, distances don't.
pub(crate) fn epsilon_for<S: Similarity>(radius: Option<f32>) -> f32 {
    match radius {
        None => f32::INFINITY,
        Some(r) if S::POLARITY >= 0 => -r,
        Some(r) => r,
    }
}

impl<S: Similarity> SimilarityIndex<'_, S> {
    /// Up to `k` nearest visible entries, best first.
    ///
    /// # Panics
    ///
    /// If entries were inserted since the last rebuild. Searching a store
    /// whose graph does not cover it is a caller bug, not a runtime
    /// condition.
    pub fn search(&self, query: &S::Feature, hints: SearchHints) -> Vec<Match> {
        assert_eq!(
            self.visible_count,
            self.entries.len(),
            "search before rebuild: {} of {} entries visible",
            self.visible_count,
            self.entries.len()
        );

        let k = if hints.k <= 0 {
            self.config.default_k
        } else {
            hints.k as usize
        };
        let radius = usable_radius(hints.r).or_else(|| self.config.default_r.and_then(usable_radius));
        let epsilon = epsilon_for::<S>(radius);

        let entries = self.entries.as_slice();
        let oracle = QueryOracle::<S>::new(entries, self.visible_count, query);
        let hits = match &self.graph {
            Some(graph) => {
                let params = SearchParams {
                    k,
                    epsilon,
                    ..self.config.search.clone()
                };
                graph.search(&oracle, &params)
            }
            None => oracle.search(k, epsilon),
        };

        hits.into_iter()
            .map(|(id, distance)| {
                let entry = &entries[id as usize];
                Match {
                    object: entry.object,
                    tag: entry.tag,
                    distance,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use simgraph_core::{DotProduct, L2};

    #[test]
    fn test_epsilon_follows_polarity() {
        assert_eq!(epsilon_for::<L2>(Some(2.0)), 2.0);
        assert_eq!(epsilon_for::<DotProduct>(Some(2.0)), -2.0);
        assert_eq!(epsilon_for::<L2>(None), f32::INFINITY);
    }

    #[test]
    fn test_usable_radius() {
        assert_eq!(usable_radius(1.5), Some(1.5));
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(usable_radius(bad), None, "{bad}");
        }
    }

    fn line() -> Vec<Vec<f32>> {
        (0..8).map(|i| vec![i as f32, 0.0]).collect()
    }

    #[test]
    fn test_default_k_and_radius_substitution() {
        let data = line();
        let config = IndexConfig {
            default_k: 3,
            default_r: Some(2.5),
            ..IndexConfig::default()
        };
        let mut index = SimilarityIndex::<L2>::linear(config);
        for (i, f) in data.iter().enumerate() {
            index.insert(i as u32, i as u32 * 10, f);
        }
        index.rebuild();

        let query = [0.0f32, 0.0];
        // default_k caps at 3, default_r keeps distance <= 2.5
        let hits = index.search(&query, SearchHints { k: -4, r: 0.0 });
        let tags: Vec<u32> = hits.iter().map(|m| m.tag).collect();
        assert_eq!(tags, vec![0, 10, 20]);

        let hits = index.search(&query, SearchHints::top(8).with_radius(1.5));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].distance, 1.0);
    }

    #[test]
    fn test_similarity_radius_is_a_floor() {
        let data = line();
        let mut index = SimilarityIndex::<DotProduct>::linear(IndexConfig::default());
        for (i, f) in data.iter().enumerate() {
            index.insert(i as u32, i as u32, f);
        }
        index.rebuild();

        let query = [1.0f32, 0.0];
        let hits = index.search(&query, SearchHints::top(10).with_radius(5.0));
        let objects: Vec<u32> = hits.iter().map(|m| m.object).collect();
        assert_eq!(objects, vec![7, 6, 5]);
        assert_eq!(hits[0].distance, 7.0);
    }

    #[test]
    fn test_k_beyond_visible_count() {
        let data = line();

        let mut linear = SimilarityIndex::<L2>::linear(IndexConfig::default());
        let config = IndexConfig {
            min_build_size: 4,
            ..IndexConfig::default()
        };
        let mut graph = SimilarityIndex::<L2>::approximate(config);
        for (i, f) in data.iter().enumerate() {
            linear.insert(i as u32, 0, f);
            graph.insert(i as u32, 0, f);
        }
        linear.rebuild();
        graph.rebuild();
        assert!(graph.is_built());

        let query = [3.0f32, 0.0];
        for index in [&linear, &graph] {
            let hits = index.search(&query, SearchHints::top(i32::MAX));
            assert_eq!(hits.len(), data.len());
            assert_eq!(hits[0].object, 3);
        }
    }

    #[test]
    fn test_huge_default_k() {
        let data = line();
        let config = IndexConfig {
            default_k: usize::MAX,
            ..IndexConfig::default()
        };
        let mut index = SimilarityIndex::<L2>::linear(config);
        for (i, f) in data.iter().enumerate() {
            index.insert(i as u32, 0, f);
        }
        index.rebuild();
        assert_eq!(index.search(&data[0], SearchHints::default()).len(), data.len());
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = SimilarityIndex::<L2>::approximate(IndexConfig::default());
        assert!(index.search(&[0.0, 0.0][..], SearchHints::top(5)).is_empty());
    }

    #[test]
    #[should_panic(expected = "search before rebuild")]
    fn test_search_before_rebuild_panics() {
        let data = line();
        let mut index = SimilarityIndex::<L2>::linear(IndexConfig::default());
        index.insert(0, 0, &data[0]);
        index.search(&data[0], SearchHints::top(1));
    }
}

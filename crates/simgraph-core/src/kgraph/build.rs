//! NN-descent construction.
//!
//! Every node keeps a sorted candidate pool of size `L`. Each iteration
//! samples the "new" (not yet joined) and "old" pool members of every node,
//! adds a sample of reverse neighbours, and then compares every new member
//! against every other new or old member of the same node. A neighbour of a
//! neighbour that turns out closer than a pool's worst entry replaces it.

use std::cmp::Ordering;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;

use super::{IndexParams, KGraph, Node};
use crate::oracle::IndexOracle;

#[derive(Debug, Clone, Copy)]
struct PoolEntry {
    id: u32,
    dist: f32,
    /// Not yet used in a local join.
    fresh: bool,
}

/// Bounded candidate list, closest first.
struct Pool {
    entries: Vec<PoolEntry>,
    capacity: usize,
}

impl Pool {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert `id` unless it is already present or no better than the worst
    /// entry of a full pool. Returns true on change.
    fn insert(&mut self, id: u32, dist: f32) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.entries.len() >= self.capacity {
            if let Some(worst) = self.entries.last() {
                if dist.total_cmp(&worst.dist) != Ordering::Less {
                    return false;
                }
            }
        }
        if self.entries.iter().any(|e| e.id == id) {
            return false;
        }
        let pos = self
            .entries
            .partition_point(|e| e.dist.total_cmp(&dist) != Ordering::Greater);
        self.entries.insert(
            pos,
            PoolEntry {
                id,
                dist,
                fresh: true,
            },
        );
        self.entries.truncate(self.capacity);
        true
    }
}

/// Exact k nearest ids of `node`, used as recall ground truth.
fn exact_knn<O: IndexOracle>(oracle: &O, node: usize, k: usize) -> Vec<u32> {
    let mut all: Vec<(u32, f32)> = (0..oracle.size())
        .filter(|&j| j != node)
        .map(|j| (j as u32, oracle.distance(node, j)))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    all.truncate(k);
    all.into_iter().map(|(id, _)| id).collect()
}

/// Fraction of the controls' true neighbours present in their first `k`
/// pool entries.
fn estimate_recall(pools: &[Pool], controls: &[(usize, Vec<u32>)], k: usize) -> Option<f32> {
    let total: usize = controls.iter().map(|(_, truth)| truth.len()).sum();
    if total == 0 {
        return None;
    }
    let found: usize = controls
        .iter()
        .map(|(node, truth)| {
            pools[*node]
                .entries
                .iter()
                .take(k)
                .filter(|e| truth.contains(&e.id))
                .count()
        })
        .sum();
    Some(found as f32 / total as f32)
}

/// Sample reverse edges: for every `i -> j` in `lists`, `j` learns about `i`.
fn reverse_sample(lists: &[Vec<u32>], cap: usize, rng: &mut StdRng) -> Vec<Vec<u32>> {
    let mut reverse = vec![Vec::new(); lists.len()];
    for (i, list) in lists.iter().enumerate() {
        for &j in list {
            reverse[j as usize].push(i as u32);
        }
    }
    for list in reverse.iter_mut() {
        if list.len() > cap {
            list.shuffle(rng);
            list.truncate(cap);
        }
    }
    reverse
}

fn merge_unique(into: &mut Vec<u32>, extra: Vec<u32>, exclude: &[u32]) {
    for id in extra {
        if !into.contains(&id) && !exclude.contains(&id) {
            into.push(id);
        }
    }
}

pub(super) fn nn_descent<O: IndexOracle>(oracle: &O, params: &IndexParams) -> KGraph {
    let n = oracle.size();
    if n <= 1 {
        return KGraph::from_nodes(vec![Node::default(); n]);
    }

    let started = Instant::now();
    let k = params.k.clamp(1, n - 1);
    let l = params.l.max(k).min(n - 1);
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut pools: Vec<Pool> = (0..n)
        .map(|i| {
            let mut pool = Pool::new(l);
            // one extra draw so that skipping `i` still leaves `l` candidates
            for j in index::sample(&mut rng, n, (l + 1).min(n)).iter() {
                if j != i && pool.entries.len() < l {
                    pool.insert(j as u32, oracle.distance(i, j));
                }
            }
            pool
        })
        .collect();

    let controls: Vec<(usize, Vec<u32>)> = index::sample(&mut rng, n, params.controls.min(n))
        .iter()
        .map(|c| (c, exact_knn(oracle, c, k)))
        .collect();

    let mut iterations = 0;
    let mut recall = estimate_recall(&pools, &controls, k);
    for it in 0..params.iterations {
        if recall.is_some_and(|r| r >= params.recall) {
            break;
        }
        iterations = it + 1;

        let mut new_lists: Vec<Vec<u32>> = Vec::with_capacity(n);
        let mut old_lists: Vec<Vec<u32>> = Vec::with_capacity(n);
        for pool in pools.iter_mut() {
            let mut new = Vec::with_capacity(params.s);
            let mut old = Vec::new();
            for entry in pool.entries.iter_mut() {
                if entry.fresh {
                    if new.len() < params.s {
                        entry.fresh = false;
                        new.push(entry.id);
                    }
                } else {
                    old.push(entry.id);
                }
            }
            new_lists.push(new);
            old_lists.push(old);
        }

        let reverse_new = reverse_sample(&new_lists, params.r, &mut rng);
        let reverse_old = reverse_sample(&old_lists, params.r, &mut rng);
        for (i, (rn, ro)) in reverse_new.into_iter().zip(reverse_old).enumerate() {
            let (new, old) = (&mut new_lists[i], &mut old_lists[i]);
            merge_unique(new, rn, &[]);
            old.retain(|id| !new.contains(id));
            merge_unique(old, ro, new);
        }

        let mut updates = 0usize;
        for i in 0..n {
            let (new, old) = (&new_lists[i], &old_lists[i]);
            for (pos, &a) in new.iter().enumerate() {
                for &b in new[pos + 1..].iter().chain(old.iter()) {
                    if a == b {
                        continue;
                    }
                    let d = oracle.distance(a as usize, b as usize);
                    updates += pools[a as usize].insert(b, d) as usize;
                    updates += pools[b as usize].insert(a, d) as usize;
                }
            }
        }

        recall = estimate_recall(&pools, &controls, k);
        tracing::debug!(
            iteration = it,
            updates,
            recall = recall.unwrap_or(f32::NAN),
            "nn-descent iteration"
        );

        if (updates as f32) < params.delta * (n * k) as f32 {
            break;
        }
    }

    let mut nodes: Vec<Node> = pools
        .into_iter()
        .map(|pool| {
            let (ids, dists) = pool.entries.iter().take(k).map(|e| (e.id, e.dist)).unzip();
            Node { ids, dists }
        })
        .collect();

    if params.prune >= 1 {
        diversify(oracle, &mut nodes);
    }
    if params.prune >= 2 {
        add_reverse_edges(&mut nodes, k);
    }

    tracing::debug!(
        nodes = n,
        k,
        iterations,
        recall = recall.unwrap_or(f32::NAN),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "nn-descent finished"
    );
    KGraph::from_nodes(nodes)
}

/// Drop an edge `i -> c` when some closer kept neighbour `p` of `i` is also
/// closer to `c` than `i` is. The closest neighbour is always kept.
fn diversify<O: IndexOracle>(oracle: &O, nodes: &mut [Node]) {
    for node in nodes.iter_mut() {
        let mut ids = Vec::with_capacity(node.ids.len());
        let mut dists = Vec::with_capacity(node.ids.len());
        for (&c, &dist) in node.ids.iter().zip(&node.dists) {
            let covered = ids
                .iter()
                .any(|&p: &u32| oracle.distance(c as usize, p as usize) < dist);
            if !covered {
                ids.push(c);
                dists.push(dist);
            }
        }
        node.ids = ids;
        node.dists = dists;
    }
}

/// Add `j -> i` for each edge `i -> j` while `j` has fewer than `k` edges.
fn add_reverse_edges(nodes: &mut [Node], k: usize) {
    let forward: Vec<(u32, u32, f32)> = nodes
        .iter()
        .enumerate()
        .flat_map(|(i, node)| {
            node.ids
                .iter()
                .zip(&node.dists)
                .map(move |(&j, &d)| (i as u32, j, d))
        })
        .collect();
    for (i, j, d) in forward {
        let target = &mut nodes[j as usize];
        if target.ids.len() >= k || target.ids.contains(&i) {
            continue;
        }
        let pos = target
            .dists
            .partition_point(|x| x.total_cmp(&d) != Ordering::Greater);
        target.ids.insert(pos, i);
        target.dists.insert(pos, d);
    }
}

//! Scored candidates and the bounded best-k collector shared by the
//! brute-force scan and graph search.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A node scored against a query.
///
/// `rank` is the "smaller is closer" ordering key; `raw` is the value the
/// oracle produced and the one handed back to callers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub id: u32,
    pub rank: f32,
    pub raw: f32,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp keeps NaN ranks at the far end instead of poisoning the heap
        self.rank
            .total_cmp(&other.rank)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keeps the `capacity` best candidates seen so far (max-heap on rank).
pub(crate) struct TopK {
    heap: BinaryHeap<Candidate>,
    capacity: usize,
}

/// Upper bound on the slots reserved up front; larger collectors grow on demand.
const PREALLOC_LIMIT: usize = 1024;

impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity.min(PREALLOC_LIMIT) + 1),
            capacity,
        }
    }

    /// Offer a candidate; returns true if it was kept.
    #[inline]
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() >= self.capacity {
            match self.heap.peek() {
                Some(worst) if candidate < *worst => {
                    self.heap.pop();
                }
                _ => return false,
            }
        }
        self.heap.push(candidate);
        true
    }

    /// Drain into best-first order.
    pub fn into_sorted(self) -> Vec<Candidate> {
        self.heap.into_sorted_vec()
    }
}

//! Per-thread reusable visited marks for graph search.
//!
//! Marks are epoch stamps, so resetting a set between queries is a counter
//! bump instead of an O(n) clear.

use std::cell::RefCell;

/// Sets kept per thread once returned.
const POOL_LIMIT: usize = 4;

thread_local! {
    static POOL: RefCell<Vec<EpochMarks>> = const { RefCell::new(Vec::new()) };
}

struct EpochMarks {
    stamps: Vec<u32>,
    epoch: u32,
}

impl EpochMarks {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity.max(64)],
            epoch: 1,
        }
    }

    fn reset(&mut self, capacity: usize) {
        if self.stamps.len() < capacity {
            self.stamps.resize(capacity, 0);
        }
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.stamps.fill(0);
            self.epoch = 1;
        }
    }
}

/// A visited set borrowed from the thread-local pool; returned on drop.
pub struct Visited {
    marks: EpochMarks,
}

impl Visited {
    /// Borrow a cleared set able to hold ids in `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        let mut marks = POOL
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_else(|| EpochMarks::with_capacity(capacity));
        marks.reset(capacity);
        Self { marks }
    }

    #[cfg(test)]
    pub fn is_visited(&self, id: usize) -> bool {
        let marks = &self.marks;
        id < marks.stamps.len() && marks.stamps[id] == marks.epoch
    }

    /// Mark `id`; returns true if it was not visited before.
    #[inline(always)]
    pub fn visit(&mut self, id: usize) -> bool {
        let marks = &mut self.marks;
        if id >= marks.stamps.len() {
            let len = (id + 1).next_power_of_two();
            marks.stamps.resize(len, 0);
        }
        if marks.stamps[id] == marks.epoch {
            return false;
        }
        marks.stamps[id] = marks.epoch;
        true
    }

    /// Forget every mark without giving the set back.
    #[cfg(test)]
    pub fn clear(&mut self) {
        let len = self.marks.stamps.len();
        self.marks.reset(len);
    }
}

impl Drop for Visited {
    fn drop(&mut self) {
        let marks = std::mem::replace(
            &mut self.marks,
            EpochMarks {
                stamps: Vec::new(),
                epoch: 1,
            },
        );
        // try_with: the pool may already be gone during thread teardown
        let _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < POOL_LIMIT {
                pool.push(marks);
            }
        });
    }
}

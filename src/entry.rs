//! Append-only log of indexed entries.
//!
//! Features are borrowed, never copied: an entry holds a reference into
//! caller-owned storage for as long as the index lives.

/// One indexed item.
#[derive(Debug)]
pub struct Entry<'a, F: ?Sized> {
    pub object: u32,
    pub tag: u32,
    pub feature: &'a F,
}

impl<F: ?Sized> Clone for Entry<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ?Sized> Copy for Entry<'_, F> {}

/// Insertion-ordered entries. Positions are stable until [`clear`](Self::clear).
#[derive(Debug)]
pub struct EntryStore<'a, F: ?Sized> {
    entries: Vec<Entry<'a, F>>,
}

impl<F: ?Sized> Default for EntryStore<'_, F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<'a, F: ?Sized> EntryStore<'a, F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its position.
    pub fn append(&mut self, object: u32, tag: u32, feature: &'a F) -> usize {
        self.entries.push(Entry {
            object,
            tag,
            feature,
        });
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Entry<'a, F>> {
        self.entries.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry<'a, F>> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Entry<'a, F>] {
        &self.entries
    }

    /// Drop every entry. Capacity is kept for the next batch.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_positions_in_order() {
        let features = [vec![1.0f32], vec![2.0], vec![3.0]];
        let mut store: EntryStore<[f32]> = EntryStore::new();
        for (i, f) in features.iter().enumerate() {
            assert_eq!(store.append(100 + i as u32, i as u32, f), i);
        }
        assert_eq!(store.len(), 3);

        let entry = store.get(1).unwrap();
        assert_eq!(entry.object, 101);
        assert_eq!(entry.tag, 1);
        assert_eq!(entry.feature, &[2.0][..]);
        assert!(store.get(3).is_none());

        let tags: Vec<u32> = store.iter().map(|e| e.tag).collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn test_feature_is_borrowed_not_copied() {
        let feature = vec![0.5f32; 4];
        let mut store: EntryStore<[f32]> = EntryStore::new();
        store.append(1, 1, &feature);
        assert!(std::ptr::eq(store.as_slice()[0].feature, feature.as_slice()));
    }

    #[test]
    fn test_clear_empties_store() {
        let feature = [1.0f32, 2.0];
        let mut store: EntryStore<[f32]> = EntryStore::new();
        store.append(1, 2, &feature[..]);
        store.append(3, 4, &feature[..]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.append(5, 6, &feature[..]), 0);
    }
}

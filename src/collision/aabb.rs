use crate::types::{Bounds, Uid};

/// Flat axis-aligned bounding box index.
///
/// Scenes hold a few dozen entities at most, so a linear scan over boxes
/// is enough to prune exact polygon tests.
#[derive(Debug, Clone, Default)]
pub struct AabbIndex {
    entries: Vec<(Uid, Bounds)>,
}

impl AabbIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uid: Uid, bounds: Bounds) {
        self.remove(uid);
        self.entries.push((uid, bounds));
    }

    pub fn remove(&mut self, uid: Uid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(u, _)| *u != uid);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uids whose box overlaps `query`, in insertion order.
    pub fn overlap_values<'a>(&'a self, query: &'a Bounds) -> impl Iterator<Item = Uid> + 'a {
        self.entries
            .iter()
            .filter(move |(_, bounds)| bounds.intersects(query))
            .map(|(uid, _)| *uid)
    }
}

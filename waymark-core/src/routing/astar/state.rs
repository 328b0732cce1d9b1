use std::cmp::Ordering;

use super::AStarWeight;

/// Queue entry: a vertex and its priority
#[derive(Copy, Clone, Debug)]
pub(super) struct State<V, W> {
    pub(super) key: W,
    pub(super) vertex: V,
}

impl<V, W: AStarWeight> PartialEq for State<V, W> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<V, W: AStarWeight> Eq for State<V, W> {}

impl<V, W: AStarWeight> Ord for State<V, W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by key (reversed from standard Rust BinaryHeap)
        other
            .key
            .partial_cmp(&self.key)
            .unwrap_or(Ordering::Equal)
    }
}

impl<V, W: AStarWeight> PartialOrd for State<V, W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

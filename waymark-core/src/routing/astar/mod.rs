//! A* over any graph exposing outgoing and ingoing edges.
//!
//! Two variants: a plain forward search ordered by `g + h`, and a bidirectional
//! search with the symmetric consistent potential `0.5 * (h(v, t) - h(v, s))`.

mod state;

use std::{collections::BinaryHeap, fmt, hash::Hash, ops::{Add, Sub}};

use hashbrown::{HashMap, HashSet, hash_map::Entry};
use log::trace;

use crate::{Error, model::RouteWeight};
use state::State;

/// Weight algebra needed by the search
pub trait AStarWeight: Copy + PartialOrd + Add<Output = Self> + Sub<Output = Self> + fmt::Debug {
    fn zero() -> Self;

    fn epsilon() -> Self;

    fn half(self) -> Self;

    /// Clamps rounding noise below zero
    fn non_negative(self) -> Self;
}

impl AStarWeight for f64 {
    fn zero() -> Self {
        0.0
    }

    fn epsilon() -> Self {
        1e-6
    }

    fn half(self) -> Self {
        self * 0.5
    }

    fn non_negative(self) -> Self {
        self.max(0.0)
    }
}

impl AStarWeight for RouteWeight {
    fn zero() -> Self {
        RouteWeight::default()
    }

    fn epsilon() -> Self {
        RouteWeight::new(1e-6)
    }

    fn half(self) -> Self {
        self.scaled(0.5)
    }

    fn non_negative(self) -> Self {
        RouteWeight::non_negative(&self)
    }
}

/// Graph interface consumed by the search
pub trait AStarGraph {
    type Vertex: Copy + Eq + Hash + fmt::Debug;
    type Weight: AStarWeight;

    fn outgoing_edges(
        &mut self,
        vertex: &Self::Vertex,
        edges: &mut Vec<(Self::Vertex, Self::Weight)>,
    ) -> Result<(), Error>;

    fn ingoing_edges(
        &mut self,
        vertex: &Self::Vertex,
        edges: &mut Vec<(Self::Vertex, Self::Weight)>,
    ) -> Result<(), Error>;

    /// Lower bound of the cost between two vertices
    fn heuristic(&mut self, from: &Self::Vertex, to: &Self::Vertex) -> Result<Self::Weight, Error>;
}

/// Hooks called while the search runs
pub trait SearchObserver<G: AStarGraph> {
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Called for every settled vertex; `target` is where its search direction heads
    fn on_visit(&mut self, _graph: &mut G, _vertex: &G::Vertex, _target: &G::Vertex) {}
}

/// Observer that never cancels and ignores visits
pub struct NoopObserver;

impl<G: AStarGraph> SearchObserver<G> for NoopObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult<V, W> {
    Found { path: Vec<V>, weight: W },
    NoPath,
    Cancelled,
}

impl<V, W> SearchResult<V, W> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Steps between direction switches of the bidirectional search
    pub queue_switch_period: u32,
    /// Steps between two cancellation checks
    pub cancel_poll_period: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            queue_switch_period: 128,
            cancel_poll_period: 128,
        }
    }
}

fn reconstruct<V: Copy + Eq + Hash>(parents: &HashMap<V, V>, last: V) -> Vec<V> {
    let mut path = vec![last];
    let mut current = last;
    while let Some(&parent) = parents.get(&current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Forward A* from `start` to `finish`
///
/// # Errors
///
/// Propagates graph errors.
pub fn find_path<G: AStarGraph>(
    graph: &mut G,
    start: G::Vertex,
    finish: G::Vertex,
    params: SearchParams,
    observer: &mut dyn SearchObserver<G>,
) -> Result<SearchResult<G::Vertex, G::Weight>, Error> {
    let poll = params.cancel_poll_period.max(1);
    let mut distances: HashMap<G::Vertex, G::Weight> = HashMap::new();
    let mut parents: HashMap<G::Vertex, G::Vertex> = HashMap::new();
    let mut settled: HashSet<G::Vertex> = HashSet::new();
    let mut heap = BinaryHeap::new();
    let mut edges = Vec::new();

    distances.insert(start, G::Weight::zero());
    heap.push(State {
        key: graph.heuristic(&start, &finish)?,
        vertex: start,
    });

    let mut steps = 0u32;
    while let Some(State { vertex, .. }) = heap.pop() {
        steps = steps.wrapping_add(1);
        if steps % poll == 0 && observer.is_cancelled() {
            return Ok(SearchResult::Cancelled);
        }

        // Stale entry: the vertex was settled through a shorter distance.
        if !settled.insert(vertex) {
            continue;
        }
        let Some(&distance) = distances.get(&vertex) else {
            continue;
        };

        observer.on_visit(graph, &vertex, &finish);
        if vertex == finish {
            trace!("Forward search settled {steps} vertices");
            return Ok(SearchResult::Found {
                path: reconstruct(&parents, vertex),
                weight: distance,
            });
        }

        edges.clear();
        graph.outgoing_edges(&vertex, &mut edges)?;
        for &(target, weight) in &edges {
            if target == vertex || settled.contains(&target) {
                continue;
            }
            let next = distance + weight;
            match distances.entry(target) {
                Entry::Occupied(entry) if next >= *entry.get() => continue,
                Entry::Occupied(mut entry) => {
                    *entry.get_mut() = next;
                }
                Entry::Vacant(entry) => {
                    entry.insert(next);
                }
            }
            parents.insert(target, vertex);
            heap.push(State {
                key: next + graph.heuristic(&target, &finish)?,
                vertex: target,
            });
        }
    }
    Ok(SearchResult::NoPath)
}

/// One direction of the bidirectional search; distances are reduced by the potential
struct Direction<V, W> {
    forward: bool,
    start: V,
    finish: V,
    distances: HashMap<V, W>,
    parents: HashMap<V, V>,
    heap: BinaryHeap<State<V, W>>,
    start_potential: W,
}

impl<V: Copy + Eq + Hash, W: AStarWeight> Direction<V, W> {
    /// Potential of `vertex` seen from this direction.
    ///
    /// Forward it is `0.5 * (h(v, finish) - h(v, start))`, backward the negation,
    /// so both reduced graphs stay non-negative.
    fn potential<G>(&self, graph: &mut G, vertex: &V) -> Result<W, Error>
    where
        G: AStarGraph<Vertex = V, Weight = W>,
    {
        let to_finish = graph.heuristic(vertex, &self.finish)?;
        let to_start = graph.heuristic(&self.start, vertex)?;
        Ok((to_finish - to_start).half())
    }

    /// Best known distance of the vertex on top of the queue
    fn top_distance(&self) -> Option<W> {
        self.heap.peek().map(|state| {
            self.distances
                .get(&state.vertex)
                .copied()
                .unwrap_or(state.key)
        })
    }

    fn edges<G>(&self, graph: &mut G, vertex: &V, edges: &mut Vec<(V, W)>) -> Result<(), Error>
    where
        G: AStarGraph<Vertex = V, Weight = W>,
    {
        if self.forward {
            graph.outgoing_edges(vertex, edges)
        } else {
            graph.ingoing_edges(vertex, edges)
        }
    }
}

/// Bidirectional A* from `start` to `finish`
///
/// # Errors
///
/// Propagates graph errors.
pub fn find_path_bidirectional<G: AStarGraph>(
    graph: &mut G,
    start: G::Vertex,
    finish: G::Vertex,
    params: SearchParams,
    observer: &mut dyn SearchObserver<G>,
) -> Result<SearchResult<G::Vertex, G::Weight>, Error> {
    if start == finish {
        return Ok(SearchResult::Found {
            path: vec![start],
            weight: G::Weight::zero(),
        });
    }

    let mut forward = Direction {
        forward: true,
        start,
        finish,
        distances: HashMap::new(),
        parents: HashMap::new(),
        heap: BinaryHeap::new(),
        start_potential: G::Weight::zero(),
    };
    // The backward direction runs from `finish` towards `start`.
    let mut backward = Direction {
        forward: false,
        start: finish,
        finish: start,
        distances: HashMap::new(),
        parents: HashMap::new(),
        heap: BinaryHeap::new(),
        start_potential: G::Weight::zero(),
    };
    forward.start_potential = forward.potential(graph, &start)?;
    backward.start_potential = backward.potential(graph, &finish)?;
    for direction in [&mut forward, &mut backward] {
        direction.distances.insert(direction.start, G::Weight::zero());
        direction.heap.push(State {
            key: G::Weight::zero(),
            vertex: direction.start,
        });
    }

    let switch = params.queue_switch_period.max(1);
    let poll = params.cancel_poll_period.max(1);
    let mut best_reduced: Option<G::Weight> = None;
    let mut best_real = G::Weight::zero();
    // Meeting edge in travel order: forward tree vertex, backward tree vertex.
    let mut meeting: Option<(G::Vertex, G::Vertex)> = None;

    let mut cur = &mut forward;
    let mut nxt = &mut backward;
    let mut edges = Vec::new();
    let mut steps = 0u32;

    while !cur.heap.is_empty() && !nxt.heap.is_empty() {
        steps = steps.wrapping_add(1);
        if steps % poll == 0 && observer.is_cancelled() {
            return Ok(SearchResult::Cancelled);
        }
        if steps % switch == 0 {
            std::mem::swap(&mut cur, &mut nxt);
        }

        if let (Some(best), Some(cur_top), Some(nxt_top)) =
            (best_reduced, cur.top_distance(), nxt.top_distance())
        {
            if cur_top + nxt_top >= best - G::Weight::epsilon() {
                break;
            }
        }

        let Some(State { key, vertex }) = cur.heap.pop() else {
            break;
        };
        let Some(&distance) = cur.distances.get(&vertex) else {
            continue;
        };
        if key > distance {
            continue;
        }
        observer.on_visit(graph, &vertex, &cur.finish);

        edges.clear();
        cur.edges(graph, &vertex, &mut edges)?;
        let potential_v = cur.potential(graph, &vertex)?;
        for &(target, weight) in &edges {
            if target == vertex {
                continue;
            }
            let potential_w = cur.potential(graph, &target)?;
            let reduced = (weight + potential_w - potential_v).non_negative();
            let next = distance + reduced;
            match cur.distances.entry(target) {
                Entry::Occupied(entry) if next >= *entry.get() => continue,
                Entry::Occupied(mut entry) => {
                    *entry.get_mut() = next;
                }
                Entry::Vacant(entry) => {
                    entry.insert(next);
                }
            }
            cur.parents.insert(target, vertex);
            cur.heap.push(State {
                key: next,
                vertex: target,
            });

            if let Some(&other) = nxt.distances.get(&target) {
                let path_reduced = next + other;
                if best_reduced.is_none_or(|best| path_reduced < best) {
                    best_reduced = Some(path_reduced);
                    let potential_nxt = nxt.potential(graph, &target)?;
                    best_real = distance + weight + other + (cur.start_potential - potential_v)
                        + (nxt.start_potential - potential_nxt);
                    meeting = Some(if cur.forward {
                        (vertex, target)
                    } else {
                        (target, vertex)
                    });
                }
            }
        }
    }

    let Some((forward_vertex, backward_vertex)) = meeting else {
        return Ok(SearchResult::NoPath);
    };
    let (forward, backward) = if cur.forward { (cur, nxt) } else { (nxt, cur) };
    let mut path = reconstruct(&forward.parents, forward_vertex);
    // Backward parents point towards the finish.
    let mut current = backward_vertex;
    if current != forward_vertex {
        path.push(current);
    }
    while let Some(&next) = backward.parents.get(&current) {
        path.push(next);
        current = next;
    }
    trace!("Bidirectional search settled {steps} vertices, path of {}", path.len());
    Ok(SearchResult::Found {
        path,
        weight: best_real,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on a line with explicit directed edges
    struct LineGraph {
        positions: Vec<f64>,
        edges: Vec<(usize, usize, f64)>,
    }

    impl AStarGraph for LineGraph {
        type Vertex = usize;
        type Weight = f64;

        fn outgoing_edges(&mut self, v: &usize, out: &mut Vec<(usize, f64)>) -> Result<(), Error> {
            out.extend(self.edges.iter().filter(|e| e.0 == *v).map(|e| (e.1, e.2)));
            Ok(())
        }

        fn ingoing_edges(&mut self, v: &usize, out: &mut Vec<(usize, f64)>) -> Result<(), Error> {
            out.extend(self.edges.iter().filter(|e| e.1 == *v).map(|e| (e.0, e.2)));
            Ok(())
        }

        fn heuristic(&mut self, from: &usize, to: &usize) -> Result<f64, Error> {
            Ok((self.positions[*from] - self.positions[*to]).abs())
        }
    }

    fn diamond() -> LineGraph {
        // 0 -> 1 -> 3 costs 4, 0 -> 2 -> 3 costs 3, 3 -> 4 costs 1.
        LineGraph {
            positions: vec![0.0, 1.0, 1.0, 2.0, 3.0],
            edges: vec![(0, 1, 2.0), (1, 3, 2.0), (0, 2, 1.5), (2, 3, 1.5), (3, 4, 1.0)],
        }
    }

    #[test]
    fn both_variants_find_the_cheaper_branch() {
        let mut graph = diamond();
        let params = SearchParams::default();

        let forward = find_path(&mut graph, 0, 4, params, &mut NoopObserver).unwrap();
        assert_eq!(
            forward,
            SearchResult::Found {
                path: vec![0, 2, 3, 4],
                weight: 4.0
            }
        );

        let SearchResult::Found { path, weight } =
            find_path_bidirectional(&mut graph, 0, 4, params, &mut NoopObserver).unwrap()
        else {
            panic!("expected a path");
        };
        assert_eq!(path, vec![0, 2, 3, 4]);
        assert!((weight - 4.0).abs() < 1e-9);
    }

    #[test]
    fn frequent_direction_switches_keep_the_optimum() {
        let mut graph = diamond();
        let params = SearchParams {
            queue_switch_period: 1,
            cancel_poll_period: 1,
        };
        let result = find_path_bidirectional(&mut graph, 0, 4, params, &mut NoopObserver).unwrap();
        let SearchResult::Found { path, weight } = result else {
            panic!("expected a path");
        };
        assert_eq!(path, vec![0, 2, 3, 4]);
        assert!((weight - 4.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_and_trivial_requests() {
        let mut graph = diamond();
        let params = SearchParams::default();
        assert_eq!(
            find_path(&mut graph, 4, 0, params, &mut NoopObserver).unwrap(),
            SearchResult::NoPath
        );
        assert_eq!(
            find_path_bidirectional(&mut graph, 4, 0, params, &mut NoopObserver).unwrap(),
            SearchResult::NoPath
        );
        assert_eq!(
            find_path_bidirectional(&mut graph, 2, 2, params, &mut NoopObserver).unwrap(),
            SearchResult::Found {
                path: vec![2],
                weight: 0.0
            }
        );
    }

    struct CancelImmediately;

    impl SearchObserver<LineGraph> for CancelImmediately {
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    #[test]
    fn cancellation_is_polled() {
        let mut graph = diamond();
        let params = SearchParams {
            queue_switch_period: 128,
            cancel_poll_period: 1,
        };
        assert_eq!(
            find_path(&mut graph, 0, 4, params, &mut CancelImmediately).unwrap(),
            SearchResult::Cancelled
        );
        assert_eq!(
            find_path_bidirectional(&mut graph, 0, 4, params, &mut CancelImmediately).unwrap(),
            SearchResult::Cancelled
        );
    }
}

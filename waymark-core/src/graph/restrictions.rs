//! Applying No restrictions to a region graph.
//!
//! Two-feature restrictions go to the sorted pair table consulted by edge
//! enumeration. Longer chains are rewritten: for a chain `A, B, C` the graph gets
//! a one-way copy `B'` of `B` that can only be entered from `A`, the turn `A -> B`
//! is forbidden and `B' -> C` is added to the pair table.

use log::{debug, warn};

use crate::{
    Error, FeatureId, INVALID_JOINT_ID, JointId,
    graph::IndexGraph,
    model::{DirectedEdge, RoadGeometry, RoadPoint},
};

impl IndexGraph {
    /// Applies No restrictions. Chains that cannot be located in the graph are
    /// skipped with a log message.
    pub fn apply_restrictions(&mut self, no_restrictions: &[Vec<FeatureId>]) {
        let mut pairs = Vec::new();
        let mut chains: Vec<&[FeatureId]> = Vec::new();
        for chain in no_restrictions {
            match chain.as_slice() {
                [from, to] => pairs.push((*from, *to)),
                longer if longer.len() > 2 => chains.push(longer),
                _ => debug!("Skipping restriction {chain:?} with fewer than two features"),
            }
        }

        self.restrictions.extend(pairs);
        self.restrictions.sort_unstable();
        self.restrictions.dedup();

        chains.sort_by_key(|chain| chain.len());
        let mut skipped = 0usize;
        for chain in chains {
            match self.apply_via_restriction(chain) {
                Ok(true) => {}
                Ok(false) => {
                    skipped += 1;
                    debug!("Restriction {chain:?} is not a drivable chain in region {}", self.region());
                }
                Err(e) => {
                    skipped += 1;
                    warn!("Failed to apply restriction {chain:?}: {e}");
                }
            }
        }
        if skipped > 0 {
            warn!(
                "Skipped {skipped} via-way restrictions in region {}",
                self.region()
            );
        }
    }

    pub(super) fn add_restriction_pair(&mut self, from: FeatureId, to: FeatureId) {
        if let Err(pos) = self.restrictions.binary_search(&(from, to)) {
            self.restrictions.insert(pos, (from, to));
        }
    }

    fn apply_via_restriction(&mut self, chain: &[FeatureId]) -> Result<bool, Error> {
        let (from, via) = (chain[0], chain[1]);
        let Some(copy) = self.via_copy(from, via)? else {
            return Ok(false);
        };
        if chain.len() == 3 {
            let to = chain[2];
            let copy_last = self.road(copy)?.last_point_id();
            let to_last = self.road(to)?.last_point_id();
            if self
                .road_index()
                .adjacent_ft_points(copy, copy_last, to, to_last)
                .is_none()
            {
                return Ok(false);
            }
            self.add_restriction_pair(copy, to);
            return Ok(true);
        }
        let mut rest = Vec::with_capacity(chain.len() - 1);
        rest.push(copy);
        rest.extend_from_slice(&chain[2..]);
        self.apply_via_restriction(&rest)
    }

    /// One-way copy of `via` entered only from `from`, created once per pair
    fn via_copy(&mut self, from: FeatureId, via: FeatureId) -> Result<Option<FeatureId>, Error> {
        if let Some(&copy) = self.via_copies.get(&(from, via)) {
            return Ok(Some(copy));
        }

        let from_last = self.road(from)?.last_point_id();
        let via_road = self.road(via)?;
        let via_last = via_road.last_point_id();
        let Some((exit, entry, entry_joint)) =
            self.road_index()
                .adjacent_ft_points(from, from_last, via, via_last)
        else {
            return Ok(None);
        };
        // The chain must be drivable: `from` left at its front, `via` entered at its back.
        if (via_road.is_one_way() && entry.point_id() != 0)
            || (self.road(from)?.is_one_way() && exit.point_id() == 0)
        {
            return Ok(None);
        }

        // Point ids of `via` in travel order, starting at the shared joint.
        let order: Vec<u32> = if entry.point_id() == 0 {
            (0..=via_last).collect()
        } else {
            (0..=via_last).rev().collect()
        };
        let points = order
            .iter()
            .map(|&p| self.point(RoadPoint::new(via, p)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut copy_road = RoadGeometry::derived(points, &via_road);
        for (p, access) in via_road.barriers() {
            if let Some(new_idx) = order.iter().position(|&o| o == p) {
                copy_road = copy_road.with_point_access(new_idx as u32, access);
            }
        }

        let was_forbidden = self.is_restricted(from, via);
        let copy = self.insert_fake_road(copy_road);

        let mut joints_along: Vec<JointId> = Vec::new();
        for (new_idx, &old_idx) in order.iter().enumerate() {
            let joint = self.road_index().joint_id(RoadPoint::new(via, old_idx));
            if joint == INVALID_JOINT_ID {
                continue;
            }
            joints_along.push(joint);
            // Other features at interior joints must not switch onto the copy.
            if joint != entry_joint && new_idx + 1 < order.len() {
                for rp in self.joint_index().points(joint) {
                    self.add_restriction_pair(rp.feature_id(), copy);
                }
            }
            self.attach_point(joint, RoadPoint::new(copy, new_idx as u32));
        }

        for rp in self.joint_index().points(entry_joint) {
            if rp.feature_id() != from && rp.feature_id() != copy {
                self.add_restriction_pair(rp.feature_id(), copy);
            }
        }
        self.add_restriction_pair(from, via);
        if was_forbidden {
            self.add_restriction_pair(from, copy);
        }

        let inherited: Vec<FeatureId> = self
            .restrictions
            .iter()
            .filter(|&&(f, _)| f == via)
            .map(|&(_, to)| to)
            .collect();
        for to in inherited {
            self.add_restriction_pair(copy, to);
        }

        for window in joints_along.windows(2) {
            let original = DirectedEdge::new(window[0], window[1], via);
            let derived = DirectedEdge::new(window[0], window[1], copy);
            self.insert_to_edge_mapping(original, derived);
        }

        self.via_copies.insert((from, via), copy);
        debug!(
            "Region {}: feature {via} copied as {copy} for restrictions after {from}",
            self.region()
        );
        Ok(Some(copy))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::Point;

    use super::*;
    use crate::{
        loading::{MapSource, MemoryMap, build_index_graph},
        model::Segment,
        routing::{VehicleType, create_estimator},
    };

    const A: FeatureId = 1;
    const B: FeatureId = 2;
    const C: FeatureId = 3;
    const D: FeatureId = 4;
    const X: FeatureId = 5;

    fn road(points: &[(f64, f64)]) -> RoadGeometry {
        RoadGeometry::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect(), 36.0)
    }

    /// `A` and `X` lead to `B`, which ends where `C` and `D` start
    fn via_graph() -> IndexGraph {
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(vec![
            (A, road(&[(0.0, 0.0), (10.0, 0.0)])),
            (B, road(&[(10.0, 0.0), (20.0, 0.0)])),
            (C, road(&[(20.0, 0.0), (30.0, 0.0)])),
            (D, road(&[(20.0, 0.0), (20.0, 10.0)])),
            (X, road(&[(10.0, 10.0), (10.0, 0.0)])),
        ]));
        build_index_graph(&source, 0, create_estimator(VehicleType::Car, 130.0, None)).unwrap()
    }

    fn features_after(graph: &IndexGraph, segment: Segment) -> Vec<FeatureId> {
        let mut edges = Vec::new();
        graph.get_edge_list(&segment, true, None, &mut edges).unwrap();
        let mut features: Vec<FeatureId> = edges
            .into_iter()
            .map(|e| e.target.feature_id())
            .filter(|&f| f != segment.feature_id())
            .collect();
        features.sort_unstable();
        features
    }

    #[test]
    fn via_way_forbids_only_the_full_chain() {
        let mut graph = via_graph();
        graph.apply_restrictions(&[vec![A, B, C]]);
        let copy = graph
            .via_copies
            .get(&(A, B))
            .copied()
            .unwrap();
        assert!(IndexGraph::is_fake_feature(copy));
        assert!(graph.road(copy).unwrap().is_one_way());

        // From A only the copy of B is available.
        assert_eq!(features_after(&graph, Segment::new(0, A, 0, true)), vec![X, copy]);
        // The copy leads to D but not to C.
        let on_copy = Segment::new(0, copy, 0, true);
        let after_copy = features_after(&graph, on_copy);
        assert!(after_copy.contains(&D));
        assert!(!after_copy.contains(&C));

        // X still reaches B and B reaches C.
        assert_eq!(features_after(&graph, Segment::new(0, X, 0, true)), vec![A, B]);
        assert!(features_after(&graph, Segment::new(0, B, 0, true)).contains(&C));
    }

    #[test]
    fn copies_are_mapped_to_their_original_edges() {
        let mut graph = via_graph();
        graph.apply_restrictions(&[vec![A, B, C], vec![A, B, D]]);
        assert_eq!(graph.via_copies.len(), 1);
        let copy = graph.via_copies[&(A, B)];

        let from = graph.road_index().joint_id(RoadPoint::new(B, 0));
        let to = graph.road_index().joint_id(RoadPoint::new(B, 1));
        let mut mapped = Vec::new();
        graph.for_each_edge_mapping_node(&DirectedEdge::new(from, to, B), |e| mapped.push(e.feature_id));
        assert_eq!(mapped, vec![copy, B]);

        let on_copy = Segment::new(0, copy, 0, true);
        let after_copy = features_after(&graph, on_copy);
        assert!(!after_copy.contains(&C));
        assert!(!after_copy.contains(&D));
    }

    #[test]
    fn chains_against_one_way_roads_are_not_copied() {
        // B is one-way towards A, so A -> B cannot be driven.
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(vec![
            (A, road(&[(0.0, 0.0), (10.0, 0.0)])),
            (B, road(&[(20.0, 0.0), (10.0, 0.0)]).with_one_way(true)),
            (C, road(&[(20.0, 0.0), (30.0, 0.0)])),
            (D, road(&[(20.0, 0.0), (20.0, 10.0)])),
        ]));
        let estimator = create_estimator(VehicleType::Car, 130.0, None);
        let mut graph = build_index_graph(&source, 0, Arc::clone(&estimator)).unwrap();
        graph.apply_restrictions(&[vec![A, B, C]]);
        assert!(graph.via_copies.is_empty());
        assert!(features_after(&graph, Segment::new(0, A, 0, true)).is_empty());

        // A is one-way away from B, so it never arrives at B.
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(vec![
            (A, road(&[(10.0, 0.0), (0.0, 0.0)]).with_one_way(true)),
            (B, road(&[(10.0, 0.0), (20.0, 0.0)])),
            (C, road(&[(20.0, 0.0), (30.0, 0.0)])),
        ]));
        let mut graph = build_index_graph(&source, 0, estimator).unwrap();
        graph.apply_restrictions(&[vec![A, B, C]]);
        assert!(graph.via_copies.is_empty());
        assert!(features_after(&graph, Segment::new(0, B, 0, true)).contains(&C));
    }

    #[test]
    fn unrelated_chains_are_skipped() {
        let mut graph = via_graph();
        graph.apply_restrictions(&[vec![A, C, D], vec![A]]);
        assert!(graph.via_copies.is_empty());
        assert!(graph.restrictions().is_empty());
    }
}

//! Joint-level reachability of a region graph

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::{Error, JointId, graph::IndexGraph};

/// Joints reachable from `from` following outgoing joint edges, restrictions and
/// blocked edges included.
///
/// # Errors
///
/// Fails when a road of the region cannot be loaded.
pub fn reachable_joints(graph: &IndexGraph, from: JointId) -> Result<FixedBitSet, Error> {
    let num_joints = graph.num_joints() as usize;
    if from as usize >= num_joints {
        return Err(Error::JointNotFound(from));
    }
    let mut marks = FixedBitSet::with_capacity(num_joints);
    let mut queue = VecDeque::from([from]);
    marks.insert(from as usize);
    while let Some(joint) = queue.pop_front() {
        for edge in graph.get_joint_edge_list(joint, true, false)? {
            let target = edge.target as usize;
            if target < num_joints && !marks.put(target) {
                queue.push_back(edge.target);
            }
        }
    }
    Ok(marks)
}

/// Sizes of the weakly connected joint components of the source network, largest
/// first
///
/// # Errors
///
/// Fails when a road of the region cannot be loaded.
pub fn joint_components(graph: &IndexGraph) -> Result<Vec<usize>, Error> {
    let num_joints = graph.num_joints() as usize;
    let mut marks = FixedBitSet::with_capacity(num_joints);
    let mut sizes = Vec::new();
    for seed in 0..num_joints {
        if marks.put(seed) {
            continue;
        }
        let mut size = 0;
        let mut stack = vec![seed as JointId];
        while let Some(joint) = stack.pop() {
            size += 1;
            for is_outgoing in [true, false] {
                for edge in graph.get_joint_edge_list(joint, is_outgoing, true)? {
                    let target = edge.target as usize;
                    if target < num_joints && !marks.put(target) {
                        stack.push(edge.target);
                    }
                }
            }
        }
        sizes.push(size);
    }
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geo::Point;

    use super::*;
    use crate::{
        loading::{MapSource, MemoryMap, build_index_graph},
        model::RoadGeometry,
        routing::{VehicleType, create_estimator},
    };

    fn road(points: &[(f64, f64)]) -> RoadGeometry {
        RoadGeometry::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect(), 36.0)
    }

    /// Two separate networks: joints (10,0) and (20,0) linked by feature 2, and a
    /// lone joint at (110,0)
    fn two_islands(middle: RoadGeometry) -> IndexGraph {
        let source: Arc<dyn MapSource> = Arc::new(MemoryMap::single_region(vec![
            (1, road(&[(0.0, 0.0), (10.0, 0.0)])),
            (2, middle),
            (3, road(&[(20.0, 0.0), (20.0, 10.0)])),
            (4, road(&[(100.0, 0.0), (110.0, 0.0)])),
            (5, road(&[(110.0, 0.0), (120.0, 0.0)])),
        ]));
        build_index_graph(&source, 0, create_estimator(VehicleType::Car, 130.0, None)).unwrap()
    }

    #[test]
    fn components_are_sorted_by_size() {
        let graph = two_islands(road(&[(10.0, 0.0), (20.0, 0.0)]));
        assert_eq!(graph.num_joints(), 3);
        assert_eq!(joint_components(&graph).unwrap(), vec![2, 1]);
    }

    #[test]
    fn reachability_follows_one_way_roads() {
        let graph = two_islands(road(&[(10.0, 0.0), (20.0, 0.0)]).with_one_way(true));
        let from_start = reachable_joints(&graph, 0).unwrap();
        assert_eq!(from_start.ones().collect::<Vec<_>>(), vec![0, 1]);
        let from_end = reachable_joints(&graph, 1).unwrap();
        assert_eq!(from_end.ones().collect::<Vec<_>>(), vec![1]);
        // Weak components ignore direction.
        assert_eq!(joint_components(&graph).unwrap(), vec![2, 1]);
    }

    #[test]
    fn unknown_joint_is_an_error() {
        let graph = two_islands(road(&[(10.0, 0.0), (20.0, 0.0)]));
        assert!(matches!(reachable_joints(&graph, 7), Err(Error::JointNotFound(7))));
    }
}

//! Composition of region graphs into one searchable graph

use std::fmt;
use std::sync::Arc;

use geo::Point;
use log::trace;
use serde::Serialize;

use crate::{
    Error, FeatureId, RegionId,
    graph::{CrossRegionGraph, FakeGraph, IndexGraph, IndexGraphLoader, RegionTransitions},
    model::{JointSegment, RoadGeometry, RouteWeight, Segment, SegmentEdge},
    routing::{EdgeEstimator, Purpose},
};

/// How the world graph expands vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WorldGraphMode {
    /// Border transitions and leaps between them only
    LeapsOnly,
    /// Full expansion in every region, crossing borders through twins
    NoLeaps,
    /// Full expansion inside the region of the vertex
    SingleMwm,
    /// Compressed joint-to-joint expansion crossing borders
    Joints,
    /// Compressed joint-to-joint expansion inside one region
    JointSingleMwm,
    #[default]
    Undefined,
}

impl WorldGraphMode {
    pub fn is_joint_mode(self) -> bool {
        matches!(self, Self::Joints | Self::JointSingleMwm)
    }

    /// Modes that switch regions through twin segments
    pub fn crosses_borders(self) -> bool {
        matches!(self, Self::NoLeaps | Self::Joints)
    }
}

impl fmt::Display for WorldGraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LeapsOnly => "LeapsOnly",
            Self::NoLeaps => "NoLeaps",
            Self::SingleMwm => "SingleMwm",
            Self::Joints => "Joints",
            Self::JointSingleMwm => "JointSingleMwm",
            Self::Undefined => "Undefined",
        };
        f.write_str(name)
    }
}

/// Graph seen by the starter and the search.
///
/// Every call taking a `fake` overlay uses it for the region of the segment it
/// is given; callers pass `None` for regions without request joints.
pub trait WorldGraph {
    fn mode(&self) -> WorldGraphMode;

    fn set_mode(&mut self, mode: WorldGraphMode);

    fn estimator(&self) -> &Arc<dyn EdgeEstimator>;

    /// # Errors
    ///
    /// Returns an error when the region graph cannot be built.
    fn index_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error>;

    fn region_at(&self, point: Point<f64>) -> Option<RegionId>;

    fn get_edge_list(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        fake: Option<&FakeGraph>,
        edges: &mut Vec<SegmentEdge>,
    ) -> Result<(), Error>;

    /// Compressed outgoing edges of `segment`, see
    /// [`IndexGraph::get_joint_segment_edges`]
    fn get_joint_edge_list(
        &mut self,
        segment: &Segment,
        fake: Option<&FakeGraph>,
        edges: &mut Vec<(JointSegment, RouteWeight)>,
    ) -> Result<(), Error>;

    fn expand_joint_segment(&mut self, last: &Segment, fake: Option<&FakeGraph>) -> Result<Vec<Segment>, Error>;

    fn heuristic_cost_estimate(&self, from: Point<f64>, to: Point<f64>) -> RouteWeight {
        RouteWeight::new(self.estimator().calc_heuristic(from, to))
    }

    fn calc_leap_weight(&self, from: Point<f64>, to: Point<f64>) -> RouteWeight {
        RouteWeight::new(self.estimator().calc_leap_weight(from, to))
    }

    fn calc_segment_weight(
        &mut self,
        segment: &Segment,
        fake: Option<&FakeGraph>,
        purpose: Purpose,
    ) -> Result<RouteWeight, Error> {
        self.index_graph(segment.region())?
            .calc_segment_weight(segment, fake, purpose)
    }

    fn road(
        &mut self,
        region: RegionId,
        feature_id: FeatureId,
        fake: Option<&FakeGraph>,
    ) -> Result<Arc<RoadGeometry>, Error> {
        self.index_graph(region)?.view(fake).road(feature_id)
    }

    fn point(&mut self, segment: &Segment, front: bool, fake: Option<&FakeGraph>) -> Result<Point<f64>, Error> {
        let road = self.road(segment.region(), segment.feature_id(), fake)?;
        let point_id = segment.point_id(front);
        road.point(point_id).ok_or(Error::SegmentOutOfRange {
            feature: segment.feature_id(),
            segment: segment.segment_idx(),
            points: road.point_count(),
        })
    }

    /// Whether `segment` is an exit (`is_outgoing`) or an enter of its region
    fn is_transition(&mut self, segment: &Segment, is_outgoing: bool) -> Result<bool, Error>;

    /// Exits (`is_outgoing`) or enters of a region, sorted
    fn transitions(&mut self, region: RegionId, is_outgoing: bool) -> Result<Vec<Segment>, Error>;

    /// Copies of a transition segment in the neighbouring region
    fn twins(&mut self, segment: &Segment, is_outgoing: bool) -> Result<Vec<Segment>, Error>;

    /// Evicts loaded region graphs
    fn clear_cached_graphs(&mut self);
}

/// World graph of one vehicle type over lazily loaded regions
pub struct SingleVehicleWorldGraph {
    loader: Box<dyn IndexGraphLoader>,
    cross_region: CrossRegionGraph,
    mode: WorldGraphMode,
}

impl SingleVehicleWorldGraph {
    pub fn new(loader: Box<dyn IndexGraphLoader>, cross_region: CrossRegionGraph) -> Self {
        Self {
            loader,
            cross_region,
            mode: WorldGraphMode::Undefined,
        }
    }

    pub fn cross_region(&self) -> &CrossRegionGraph {
        &self.cross_region
    }

    fn ensure_transitions(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error> {
        let graph = self.loader.index_graph(region)?;
        self.cross_region.ensure_region(&graph)?;
        Ok(graph)
    }

    /// Region graph for compressed walks; transitions are only needed when the
    /// walk stops at borders
    fn joint_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error> {
        if self.mode.crosses_borders() {
            self.ensure_transitions(region)
        } else {
            self.loader.index_graph(region)
        }
    }

    fn border_stops(&self, region: RegionId) -> Option<&RegionTransitions> {
        if self.mode.crosses_borders() {
            self.cross_region.region(region)
        } else {
            None
        }
    }

    /// Twin edges, weighted with the heuristic between their coinciding points
    fn push_twins(&mut self, segment: &Segment, is_outgoing: bool, edges: &mut Vec<SegmentEdge>) -> Result<(), Error> {
        for twin in self.twins(segment, is_outgoing)? {
            let from = self.point(segment, is_outgoing, None)?;
            let to = self.point(&twin, is_outgoing, None)?;
            edges.push(SegmentEdge::new(twin, self.heuristic_cost_estimate(from, to)));
        }
        Ok(())
    }

    fn leaps_from(&mut self, enter: &Segment, edges: &mut Vec<SegmentEdge>) -> Result<(), Error> {
        let from = self.point(enter, true, None)?;
        for exit in self.transitions(enter.region(), true)? {
            if exit == *enter {
                continue;
            }
            let to = self.point(&exit, true, None)?;
            edges.push(SegmentEdge::new(exit, self.calc_leap_weight(from, to)));
        }
        Ok(())
    }
}

impl WorldGraph for SingleVehicleWorldGraph {
    fn mode(&self) -> WorldGraphMode {
        self.mode
    }

    fn set_mode(&mut self, mode: WorldGraphMode) {
        trace!("World graph mode {} -> {mode}", self.mode);
        self.mode = mode;
    }

    fn estimator(&self) -> &Arc<dyn EdgeEstimator> {
        self.loader.estimator()
    }

    fn index_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error> {
        self.loader.index_graph(region)
    }

    fn region_at(&self, point: Point<f64>) -> Option<RegionId> {
        self.cross_region.source().region_at(point)
    }

    fn get_edge_list(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        fake: Option<&FakeGraph>,
        edges: &mut Vec<SegmentEdge>,
    ) -> Result<(), Error> {
        if self.mode == WorldGraphMode::LeapsOnly {
            // Connectors are not transitions; the starter adds their leaps.
            if !is_outgoing {
                return Ok(());
            }
            if self.is_transition(segment, true)? {
                return self.push_twins(segment, true, edges);
            }
            if self.is_transition(segment, false)? {
                return self.leaps_from(segment, edges);
            }
            return Ok(());
        }

        let graph = self.loader.index_graph(segment.region())?;
        graph.get_edge_list(segment, is_outgoing, fake, edges)?;
        if self.mode.crosses_borders() && self.is_transition(segment, is_outgoing)? {
            self.push_twins(segment, is_outgoing, edges)?;
        }
        Ok(())
    }

    fn get_joint_edge_list(
        &mut self,
        segment: &Segment,
        fake: Option<&FakeGraph>,
        edges: &mut Vec<(JointSegment, RouteWeight)>,
    ) -> Result<(), Error> {
        let graph = self.joint_graph(segment.region())?;
        let transitions = self.border_stops(segment.region());
        graph.get_joint_segment_edges(
            segment,
            fake,
            &mut |s| transitions.is_some_and(|t| t.contains(s)),
            edges,
        )?;
        if self.mode.crosses_borders() && self.is_transition(segment, true)? {
            let mut twins = Vec::new();
            self.push_twins(segment, true, &mut twins)?;
            edges.extend(
                twins
                    .into_iter()
                    .map(|edge| (JointSegment::from_segments(&edge.target, &edge.target), edge.weight)),
            );
        }
        Ok(())
    }

    fn expand_joint_segment(&mut self, last: &Segment, fake: Option<&FakeGraph>) -> Result<Vec<Segment>, Error> {
        let graph = self.joint_graph(last.region())?;
        let transitions = self.border_stops(last.region());
        graph.expand_joint_segment(last, fake, &mut |s| {
            transitions.is_some_and(|t| t.contains(s))
        })
    }

    fn is_transition(&mut self, segment: &Segment, is_outgoing: bool) -> Result<bool, Error> {
        let region = segment.region();
        self.ensure_transitions(region)?;
        Ok(self.cross_region.region(region).is_some_and(|t| {
            if is_outgoing {
                t.is_exit(segment)
            } else {
                t.is_enter(segment)
            }
        }))
    }

    fn transitions(&mut self, region: RegionId, is_outgoing: bool) -> Result<Vec<Segment>, Error> {
        self.ensure_transitions(region)?;
        Ok(self
            .cross_region
            .region(region)
            .map(|t| {
                if is_outgoing {
                    t.exits().to_vec()
                } else {
                    t.enters().to_vec()
                }
            })
            .unwrap_or_default())
    }

    fn twins(&mut self, segment: &Segment, is_outgoing: bool) -> Result<Vec<Segment>, Error> {
        let back = self.point(segment, false, None)?;
        let front = self.point(segment, true, None)?;
        let Some(neighbour) = self
            .cross_region
            .neighbour_region(back, front, segment.region())
        else {
            return Ok(Vec::new());
        };
        if neighbour == segment.region() {
            return Ok(Vec::new());
        }
        self.ensure_transitions(neighbour)?;
        let twins = self.cross_region.twins_in(neighbour, back, front);
        // An exit continues as an enter of the neighbour and the other way round.
        let mut result = Vec::with_capacity(twins.len());
        for twin in twins {
            if self.is_transition(&twin, !is_outgoing)? {
                result.push(twin);
            }
        }
        Ok(result)
    }

    fn clear_cached_graphs(&mut self) {
        self.loader.clear();
    }
}

//! Border transitions between regions.
//!
//! A feature crossing a border is stored in every region it touches. Its segments
//! leaving a region are the region's exits, segments coming in are its enters, and
//! the copy of the same segment in the neighbouring region is the twin.

use std::sync::Arc;

use geo::Point;
use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::{
    Error, RegionId,
    graph::IndexGraph,
    loading::MapSource,
    model::Segment,
};

type PointKey = (u64, u64);

fn point_key(point: Point<f64>) -> PointKey {
    ((point.x() + 0.0).to_bits(), (point.y() + 0.0).to_bits())
}

/// Transitions of one region
#[derive(Debug, Default, Clone)]
pub struct RegionTransitions {
    exits: Vec<Segment>,
    enters: Vec<Segment>,
    all: HashSet<Segment>,
    by_ends: HashMap<(PointKey, PointKey), Vec<Segment>>,
}

impl RegionTransitions {
    pub fn exits(&self) -> &[Segment] {
        &self.exits
    }

    pub fn enters(&self) -> &[Segment] {
        &self.enters
    }

    pub fn contains(&self, segment: &Segment) -> bool {
        self.all.contains(segment)
    }

    pub fn is_exit(&self, segment: &Segment) -> bool {
        self.contains(segment) && self.exits.binary_search(segment).is_ok()
    }

    pub fn is_enter(&self, segment: &Segment) -> bool {
        self.contains(segment) && self.enters.binary_search(segment).is_ok()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Lazily built transition tables of all regions
pub struct CrossRegionGraph {
    source: Arc<dyn MapSource>,
    regions: HashMap<RegionId, RegionTransitions>,
}

impl CrossRegionGraph {
    pub fn new(source: Arc<dyn MapSource>) -> Self {
        Self {
            source,
            regions: HashMap::new(),
        }
    }

    pub fn source(&self) -> &Arc<dyn MapSource> {
        &self.source
    }

    pub fn is_loaded(&self, region: RegionId) -> bool {
        self.regions.contains_key(&region)
    }

    pub fn region(&self, region: RegionId) -> Option<&RegionTransitions> {
        self.regions.get(&region)
    }

    /// Builds the transitions of `graph`'s region unless already known
    ///
    /// # Errors
    ///
    /// Returns an error when a road of the region cannot be loaded.
    pub fn ensure_region(&mut self, graph: &IndexGraph) -> Result<&RegionTransitions, Error> {
        let region = graph.region();
        if !self.regions.contains_key(&region) {
            let transitions = self.build_region(graph)?;
            debug!(
                "Region {region}: {} exits, {} enters",
                transitions.exits.len(),
                transitions.enters.len()
            );
            self.regions.insert(region, transitions);
        }
        self.regions
            .get(&region)
            .ok_or(Error::UnknownRegion(region))
    }

    fn build_region(&self, graph: &IndexGraph) -> Result<RegionTransitions, Error> {
        let region = graph.region();
        let mut transitions = RegionTransitions::default();
        for feature_id in graph.geometry().feature_ids() {
            let road = graph.road(feature_id)?;
            if !road.is_routable() {
                continue;
            }
            let owners: Vec<Option<RegionId>> = road
                .points()
                .iter()
                .map(|&p| self.source.region_at(p))
                .collect();
            for idx in 0..road.point_count().saturating_sub(1) {
                let (a, b) = (owners[idx], owners[idx + 1]);
                if a == b {
                    continue;
                }
                for forward in [true, false] {
                    if !forward && road.is_one_way() {
                        continue;
                    }
                    let segment = Segment::new(region, feature_id, idx as u32, forward);
                    let (back, front) = if forward { (a, b) } else { (b, a) };
                    if back == Some(region) {
                        transitions.exits.push(segment);
                    } else if front == Some(region) {
                        transitions.enters.push(segment);
                    } else {
                        continue;
                    }
                    let key = (
                        point_key(road.points()[segment.point_id(false) as usize]),
                        point_key(road.points()[segment.point_id(true) as usize]),
                    );
                    transitions.by_ends.entry(key).or_default().push(segment);
                    transitions.all.insert(segment);
                }
            }
        }
        transitions.exits.sort_unstable();
        transitions.enters.sort_unstable();
        Ok(transitions)
    }

    /// Region on the other side of a transition
    pub fn neighbour_region(&self, back: Point<f64>, front: Point<f64>, region: RegionId) -> Option<RegionId> {
        let back_region = self.source.region_at(back);
        let front_region = self.source.region_at(front);
        if back_region == Some(region) {
            front_region
        } else {
            back_region
        }
    }

    /// Segments of `neighbour` with the same directed end points as `segment`.
    ///
    /// `neighbour` must have been ensured.
    pub fn twins_in(
        &self,
        neighbour: RegionId,
        back: Point<f64>,
        front: Point<f64>,
    ) -> Vec<Segment> {
        self.regions
            .get(&neighbour)
            .and_then(|t| t.by_ends.get(&(point_key(back), point_key(front))))
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}

//! Route requests from two locations to a [`Route`]

use std::sync::Arc;

use geo::{Intersects, Point};
use hashbrown::HashMap;
use log::{debug, error, info};
use petgraph::graph::{NodeIndex, UnGraph};

use crate::{
    Error, RegionId,
    graph::{
        CrossRegionGraph, IndexGraphLoader, LazyGraphLoader, SingleVehicleWorldGraph, WorldGraph,
        WorldGraphMode,
    },
    loading::{MapSource, RouterConfig},
    model::{RouteWeight, Segment},
    routing::{
        IndexGraphStarter, Route, RouterDelegate, create_estimator,
        astar::{SearchParams, SearchResult, find_path, find_path_bidirectional},
        leaps::{LeapEnds, LeapProgress, process_leaps},
        progress::ProgressObserver,
        route::drop_twins,
        snapping::{RoadSnapper, SnappedPoint},
        starter::Endpoint,
    },
};

/// Share of the progress reported by the leap pass of a `LeapsOnly` request
const LEAPS_PROGRESS: f64 = 20.0;

/// Regions connected when their rectangles touch
#[derive(Debug, Clone, Default)]
pub struct RegionAdjacency {
    graph: UnGraph<RegionId, ()>,
    nodes: HashMap<RegionId, NodeIndex>,
}

impl RegionAdjacency {
    /// # Errors
    ///
    /// Fails when a region rectangle cannot be read.
    pub fn build(source: &dyn MapSource) -> Result<Self, Error> {
        let mut adjacency = Self::default();
        let mut rects = Vec::new();
        for region in source.regions() {
            let node = adjacency.graph.add_node(region);
            adjacency.nodes.insert(region, node);
            rects.push((node, source.region_rect(region)?));
        }
        for (i, (a, rect_a)) in rects.iter().enumerate() {
            for (b, rect_b) in &rects[i + 1..] {
                if rect_a.intersects(rect_b) {
                    adjacency.graph.add_edge(*a, *b, ());
                }
            }
        }
        debug!(
            "Region adjacency: {} regions, {} borders",
            adjacency.graph.node_count(),
            adjacency.graph.edge_count()
        );
        Ok(adjacency)
    }

    pub fn are_adjacent(&self, a: RegionId, b: RegionId) -> bool {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    pub fn neighbours(&self, region: RegionId) -> Vec<RegionId> {
        let Some(&node) = self.nodes.get(&region) else {
            return Vec::new();
        };
        let mut neighbours: Vec<RegionId> = self.graph.neighbors(node).map(|n| self.graph[n]).collect();
        neighbours.sort_unstable();
        neighbours
    }
}

/// Mode of the first search for a request between two regions
pub fn select_mode(adjacency: &RegionAdjacency, start: RegionId, finish: RegionId, use_joints: bool) -> WorldGraphMode {
    match (start == finish, adjacency.are_adjacent(start, finish), use_joints) {
        (true, _, false) => WorldGraphMode::SingleMwm,
        (true, _, true) => WorldGraphMode::JointSingleMwm,
        (false, true, false) => WorldGraphMode::NoLeaps,
        (false, true, true) => WorldGraphMode::Joints,
        (false, false, _) => WorldGraphMode::LeapsOnly,
    }
}

/// Router of one vehicle type over one map source
pub struct IndexRouter {
    source: Arc<dyn MapSource>,
    config: RouterConfig,
    world: SingleVehicleWorldGraph,
    snapper: RoadSnapper,
    adjacency: RegionAdjacency,
}

impl IndexRouter {
    /// Router loading region graphs on demand
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or unreadable region rectangles.
    pub fn new(source: Arc<dyn MapSource>, config: RouterConfig) -> Result<Self, Error> {
        config.validate()?;
        let estimator = create_estimator(config.vehicle, config.max_speed(), None);
        let loader = LazyGraphLoader::new(Arc::clone(&source), estimator);
        Self::with_loader(source, config, Box::new(loader))
    }

    /// # Errors
    ///
    /// Fails on an invalid configuration or unreadable region rectangles.
    pub fn with_loader(
        source: Arc<dyn MapSource>,
        config: RouterConfig,
        loader: Box<dyn IndexGraphLoader>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let adjacency = RegionAdjacency::build(source.as_ref())?;
        let world = SingleVehicleWorldGraph::new(loader, CrossRegionGraph::new(Arc::clone(&source)));
        Ok(Self {
            source,
            config,
            world,
            snapper: RoadSnapper::new(),
            adjacency,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn adjacency(&self) -> &RegionAdjacency {
        &self.adjacency
    }

    pub fn world(&mut self) -> &mut dyn WorldGraph {
        &mut self.world
    }

    fn params(&self) -> SearchParams {
        SearchParams {
            queue_switch_period: self.config.queue_switch_period,
            cancel_poll_period: self.config.cancel_poll_period,
        }
    }

    /// Nearest usable road point to `location` in the region containing it
    ///
    /// # Errors
    ///
    /// Propagates graph loading errors.
    pub fn snap(&mut self, location: Point<f64>) -> Result<Option<SnappedPoint>, Error> {
        let Some(region) = self.source.region_at(location) else {
            return Ok(None);
        };
        let graph = self.world.index_graph(region)?;
        self.snapper.snap(
            &graph,
            location,
            self.config.snap_radius_m,
            self.config.max_road_candidates,
        )
    }

    /// Calculates the route between two locations.
    ///
    /// # Errors
    ///
    /// [`Error::StartPointNotFound`] or [`Error::EndPointNotFound`] when no road is
    /// near an endpoint, [`Error::RouteNotFound`], [`Error::Cancelled`], and
    /// structural errors of the graph otherwise.
    pub fn calculate_route(
        &mut self,
        start: Point<f64>,
        finish: Point<f64>,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, Error> {
        let result = self.route(start, finish, delegate);
        if let Err(e) = &result {
            error!("Route from {:?} to {:?} failed: {e}", start.x_y(), finish.x_y());
        }
        result
    }

    fn route(&mut self, start: Point<f64>, finish: Point<f64>, delegate: &dyn RouterDelegate) -> Result<Route, Error> {
        let start_snap = self.snap(start)?.ok_or(Error::StartPointNotFound)?;
        let finish_snap = self.snap(finish)?.ok_or(Error::EndPointNotFound)?;
        let mode = select_mode(
            &self.adjacency,
            start_snap.region,
            finish_snap.region,
            self.config.use_joints,
        );
        info!(
            "Routing from region {} to region {} in {mode} mode",
            start_snap.region, finish_snap.region
        );

        let start_endpoint = Endpoint::Point(start_snap);
        let finish_endpoint = Endpoint::Point(finish_snap);

        self.world.set_mode(mode);
        let route = match mode {
            WorldGraphMode::LeapsOnly => self.route_with_leaps(start_endpoint, finish_endpoint, delegate)?,
            WorldGraphMode::Joints | WorldGraphMode::JointSingleMwm => {
                self.route_by_joints(start_endpoint, finish_endpoint, delegate)?
            }
            _ => self.route_by_segments(start_endpoint, finish_endpoint, delegate)?,
        };
        if route.points().is_empty() {
            return Ok(Route::new(
                vec![start_snap.point],
                vec![(0, 0.0)],
                Vec::new(),
                route.weight(),
                mode,
            ));
        }
        info!(
            "Route found: {} segments, {:.1} s, {} regions",
            route.segments().len(),
            route.duration(),
            route.regions().len()
        );
        delegate.on_progress(100.0);
        Ok(route)
    }

    fn observer<'d>(&self, delegate: &'d dyn RouterDelegate, range: (f64, f64)) -> ProgressObserver<'d> {
        ProgressObserver::new(
            delegate,
            self.config.progress_interval,
            self.config.draw_points_period,
            range,
        )
    }

    fn route_by_segments(
        &mut self,
        start: Endpoint,
        finish: Endpoint,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, Error> {
        let params = self.params();
        let mut observer = self.observer(delegate, (0.0, 100.0));
        let mode = self.world.mode();
        let mut starter = IndexGraphStarter::new(start, finish, &mut self.world)?;
        let (from, to) = (starter.start_segment(), starter.finish_segment());
        let (path, weight) = found(find_path_bidirectional(&mut starter, from, to, params, &mut observer)?)?;

        let mut segments = starter.strip_connectors(&path);
        if mode.crosses_borders() {
            segments = drop_twins(&segments, |s| starter.is_piece(s));
        }
        let (points, times) = starter.redress_segments(&segments)?;
        let segments = starter.original_segments(&segments);
        Ok(Route::new(points, times, segments, weight, mode))
    }

    fn route_by_joints(
        &mut self,
        start: Endpoint,
        finish: Endpoint,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, Error> {
        let params = self.params();
        let mut observer = self.observer(delegate, (0.0, 100.0));
        let mode = self.world.mode();
        let mut starter = IndexGraphStarter::new(start, finish, &mut self.world)?;
        let (from, to) = (starter.start_segment(), starter.finish_segment());
        let (path, weight) = found(find_path(&mut starter, from, to, params, &mut observer)?)?;

        let expanded = starter.expand_joint_path(&path)?;
        let mut segments = starter.strip_connectors(&expanded);
        if mode.crosses_borders() {
            segments = drop_twins(&segments, |s| starter.is_piece(s));
        }

        if mode == WorldGraphMode::JointSingleMwm
            && let Some(joints) = starter.joints_of_path(&path)?
            && !joints.is_empty()
        {
            let route_points = starter.redress_route(from.region(), &joints)?;
            let points = route_points.iter().map(|p| p.point).collect();
            let times = route_points.iter().enumerate().map(|(i, p)| (i, p.time)).collect();
            let segments = starter.original_segments(&segments);
            return Ok(Route::new(points, times, segments, weight, mode));
        }
        let (points, times) = starter.redress_segments(&segments)?;
        let segments = starter.original_segments(&segments);
        Ok(Route::new(points, times, segments, weight, mode))
    }

    fn route_with_leaps(
        &mut self,
        start: Endpoint,
        finish: Endpoint,
        delegate: &dyn RouterDelegate,
    ) -> Result<Route, Error> {
        let params = self.params();
        let mut observer = self.observer(delegate, (0.0, LEAPS_PROGRESS));
        let (leap_path, ends) = {
            let mut starter = IndexGraphStarter::new(start, finish, &mut self.world)?;
            let (from, to) = (starter.start_segment(), starter.finish_segment());
            let (path, _) = found(find_path(&mut starter, from, to, params, &mut observer)?)?;
            let ends = LeapEnds {
                start_connector: from,
                start,
                finish_connector: to,
                finish,
            };
            (path, ends)
        };
        debug!("Leap path with {} vertices", leap_path.len());

        let progress = LeapProgress {
            delegate,
            interval: self.config.progress_interval,
            draw_points_period: self.config.draw_points_period,
            range: (LEAPS_PROGRESS, 100.0),
        };
        process_leaps(&mut self.world, &leap_path, &ends, params, progress)
    }
}

fn found(result: SearchResult<Segment, RouteWeight>) -> Result<(Vec<Segment>, RouteWeight), Error> {
    match result {
        SearchResult::Found { path, weight } => Ok((path, weight)),
        SearchResult::NoPath => Err(Error::RouteNotFound),
        SearchResult::Cancelled => Err(Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use geo::Rect;

    use super::*;
    use crate::loading::MemoryMap;

    fn three_regions_in_a_row() -> MemoryMap {
        let mut map = MemoryMap::new();
        map.add_region(0, Rect::new((0.0, 0.0), (100.0, 100.0)))
            .add_region(1, Rect::new((100.0, 0.0), (200.0, 100.0)))
            .add_region(2, Rect::new((200.0, 0.0), (300.0, 100.0)));
        map
    }

    #[test]
    fn touching_regions_are_adjacent() {
        let adjacency = RegionAdjacency::build(&three_regions_in_a_row()).unwrap();
        assert!(adjacency.are_adjacent(0, 1));
        assert!(adjacency.are_adjacent(2, 1));
        assert!(!adjacency.are_adjacent(0, 2));
        assert_eq!(adjacency.neighbours(1), vec![0, 2]);
    }

    #[test]
    fn mode_follows_region_relation() {
        let adjacency = RegionAdjacency::build(&three_regions_in_a_row()).unwrap();
        assert_eq!(select_mode(&adjacency, 1, 1, false), WorldGraphMode::SingleMwm);
        assert_eq!(select_mode(&adjacency, 1, 1, true), WorldGraphMode::JointSingleMwm);
        assert_eq!(select_mode(&adjacency, 0, 1, false), WorldGraphMode::NoLeaps);
        assert_eq!(select_mode(&adjacency, 0, 1, true), WorldGraphMode::Joints);
        assert_eq!(select_mode(&adjacency, 0, 2, true), WorldGraphMode::LeapsOnly);
    }
}

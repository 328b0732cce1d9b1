//! Expansion of a leap path into a full segment route.
//!
//! A `LeapsOnly` path alternates between legs inside one region (from an enter,
//! or the start, to an exit, or the finish) and twin hops across a border. Every
//! leg is searched again in `SingleMwm` mode; twin hops need no search.

use geo::Point;
use itertools::Itertools;
use log::{debug, info};

use crate::{
    Error,
    graph::{WorldGraph, WorldGraphMode},
    model::{RouteWeight, Segment},
    routing::{
        IndexGraphStarter, Route, RouterDelegate,
        astar::{SearchParams, SearchResult, find_path_bidirectional},
        progress::ProgressObserver,
        starter::Endpoint,
    },
};

/// Endpoints of the request, substituted for the connectors of the leap path
#[derive(Debug, Clone, Copy)]
pub struct LeapEnds {
    pub start_connector: Segment,
    pub start: Endpoint,
    pub finish_connector: Segment,
    pub finish: Endpoint,
}

impl LeapEnds {
    fn endpoint(&self, vertex: Segment) -> Endpoint {
        if vertex == self.start_connector {
            self.start
        } else if vertex == self.finish_connector {
            self.finish
        } else {
            Endpoint::Segment(vertex)
        }
    }
}

/// Progress reporting of the expansion passes
#[derive(Clone, Copy)]
pub struct LeapProgress<'d> {
    pub delegate: &'d dyn RouterDelegate,
    pub interval: f64,
    pub draw_points_period: u32,
    /// Share of the progress in percent covered by the expansions
    pub range: (f64, f64),
}

/// Legs of a leap path: consecutive vertices inside the same region
fn legs(leap_path: &[Segment]) -> Vec<(Segment, Segment)> {
    leap_path
        .iter()
        .tuple_windows()
        .filter(|(from, to)| from.region() == to.region())
        .map(|(from, to)| (*from, *to))
        .collect()
}

/// Replaces every leg of `leap_path` by a full `SingleMwm` search and joins the
/// legs into one route.
///
/// Region graphs are dropped before each leg so that only the regions of the
/// current leg stay loaded. Each later leg starts with the twin of the exit ending
/// the previous one, which is dropped together with its travel time.
///
/// # Errors
///
/// [`Error::RouteNotFound`] when a leg has no path, [`Error::Cancelled`] when the
/// delegate cancels, and graph errors otherwise.
pub fn process_leaps(
    world: &mut dyn WorldGraph,
    leap_path: &[Segment],
    ends: &LeapEnds,
    params: SearchParams,
    progress: LeapProgress<'_>,
) -> Result<Route, Error> {
    let legs = legs(leap_path);
    if legs.is_empty() {
        return Err(Error::InternalError(format!(
            "Leap path of {} vertices has no leg inside a region",
            leap_path.len()
        )));
    }
    info!("Expanding {} leaps over {} vertices", legs.len(), leap_path.len());

    let (from_percent, to_percent) = progress.range;
    let step = (to_percent - from_percent) / legs.len() as f64;
    let mut route: Vec<Segment> = Vec::new();
    let mut points: Vec<Point<f64>> = Vec::new();
    let mut times: Vec<(usize, f64)> = Vec::new();
    let mut weight = RouteWeight::default();

    for (idx, (from, to)) in legs.into_iter().enumerate() {
        world.set_mode(WorldGraphMode::SingleMwm);
        world.clear_cached_graphs();

        let mut starter = IndexGraphStarter::new(ends.endpoint(from), ends.endpoint(to), &mut *world)?;
        let leg_from = from_percent + step * idx as f64;
        let mut observer = ProgressObserver::new(
            progress.delegate,
            progress.interval,
            progress.draw_points_period,
            (leg_from, leg_from + step),
        );
        let (start, finish) = (starter.start_segment(), starter.finish_segment());
        let (path, leg_weight) = match find_path_bidirectional(&mut starter, start, finish, params, &mut observer)? {
            SearchResult::Found { path, weight } => (path, weight),
            SearchResult::NoPath => {
                debug!("No path for leap {idx} from {from} to {to}");
                return Err(Error::RouteNotFound);
            }
            SearchResult::Cancelled => return Err(Error::Cancelled),
        };

        let segments = starter.strip_connectors(&path);
        let (leg_points, leg_times) = starter.redress_segments(&segments)?;
        let mut segments = starter.original_segments(&segments);
        // The twin enter repeats the last point of the previous leg.
        let skip = usize::from(idx > 0 && !segments.is_empty());
        if skip > 0 {
            segments.remove(0);
        }
        debug!("Leap {idx} expanded to {} segments", segments.len());
        append_leg(&mut points, &mut times, &leg_points, &leg_times, skip);
        route.extend(segments);
        weight += leg_weight;
    }
    Ok(Route::new(points, times, route, weight, WorldGraphMode::LeapsOnly))
}

/// Appends the polyline of a leg whose first `skip` segments are already part of
/// the route, shifting its times to continue the route's
fn append_leg(
    points: &mut Vec<Point<f64>>,
    times: &mut Vec<(usize, f64)>,
    leg_points: &[Point<f64>],
    leg_times: &[(usize, f64)],
    skip: usize,
) {
    let first = if points.is_empty() { 0 } else { skip + 1 };
    let base = times.last().map_or(0.0, |&(_, time)| time);
    let shift = match first.checked_sub(1).and_then(|i| leg_times.get(i)) {
        Some(&(_, time)) => base - time,
        None => base,
    };
    for (&point, &(_, time)) in leg_points.iter().zip(leg_times).skip(first) {
        points.push(point);
        times.push((points.len() - 1, time + shift));
    }
}

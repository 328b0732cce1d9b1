use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
    sync::Arc,
    time::Instant,
};

use geo::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use waymark::{
    IndexRouter, MapSource, NetworkDescription, ResultCode, Route, RouterConfig, RouterDelegate,
    algo::connectivity::joint_components,
    loading::{build_index_graphs, region_coverage},
    route_many,
    routing::create_estimator,
    shared_graphs,
};

use crate::error::CliError;

/// Delegate reporting search progress to the log
pub struct LogDelegate;

impl RouterDelegate for LogDelegate {
    fn on_progress(&self, percent: f64) {
        debug!("Route progress {percent:.0}%");
    }
}

pub fn parse_point(text: &str) -> Result<Point<f64>, CliError> {
    let mut parts = text.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(x), Some(y), None) => match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(x), Ok(y)) if x.is_finite() && y.is_finite() => Ok(Point::new(x, y)),
            _ => Err(CliError::Coordinate(text.to_owned())),
        },
        _ => Err(CliError::Coordinate(text.to_owned())),
    }
}

pub fn load_network(path: &Path) -> Result<Arc<dyn MapSource>, CliError> {
    let map = NetworkDescription::from_path(path)?.into_memory_map()?;
    Ok(Arc::new(map))
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{text}"),
    }
    Ok(())
}

pub fn route(
    source: Arc<dyn MapSource>,
    config: RouterConfig,
    start: Point<f64>,
    finish: Point<f64>,
    output: Option<&Path>,
) -> Result<Route, CliError> {
    let mut router = IndexRouter::new(source, config)?;
    let started = Instant::now();
    let route = router.calculate_route(start, finish, &LogDelegate)?;
    info!(
        mode = ?route.mode(),
        points = route.points().len(),
        duration_s = route.duration(),
        elapsed_ms = started.elapsed().as_millis(),
        "Route found"
    );
    write_output(output, &route.to_geojson_string()?)?;
    Ok(route)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RouteRequest {
    pub start: [f64; 2],
    pub finish: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub index: usize,
    pub code: ResultCode,
    pub duration: Option<f64>,
    pub weight: Option<f64>,
    pub points: usize,
    pub regions: Vec<u16>,
}

impl RouteSummary {
    fn new(index: usize, result: &Result<Route, waymark::Error>) -> Self {
        let code = ResultCode::of(result);
        match result {
            Ok(route) => Self {
                index,
                code,
                duration: Some(route.duration()),
                weight: Some(route.weight().weight()),
                points: route.points().len(),
                regions: route.regions(),
            },
            Err(_) => Self {
                index,
                code,
                duration: None,
                weight: None,
                points: 0,
                regions: Vec::new(),
            },
        }
    }
}

pub fn batch(
    source: Arc<dyn MapSource>,
    config: &RouterConfig,
    requests_path: &Path,
    output: Option<&Path>,
) -> Result<Vec<RouteSummary>, CliError> {
    let requests: Vec<RouteRequest> =
        serde_json::from_reader(BufReader::new(File::open(requests_path)?))?;
    let pairs: Vec<(Point<f64>, Point<f64>)> = requests
        .iter()
        .map(|r| (Point::from(r.start), Point::from(r.finish)))
        .collect();

    let started = Instant::now();
    let graphs = shared_graphs(&source, config)?;
    let results = route_many(&source, &graphs, config, &pairs, &LogDelegate)?;
    let summaries: Vec<RouteSummary> = results
        .iter()
        .enumerate()
        .map(|(index, result)| RouteSummary::new(index, result))
        .collect();
    info!(
        requests = summaries.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "Batch routed"
    );

    let text = serde_json::to_string_pretty(&summaries)?;
    write_output(output, &text)?;
    Ok(summaries)
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionReport {
    pub region: u16,
    pub roads: usize,
    pub joints: u32,
    pub restriction_pairs: usize,
    pub components: Vec<usize>,
    pub points_outside_percent: f64,
}

pub fn inspect(source: Arc<dyn MapSource>, config: &RouterConfig) -> Result<Vec<RegionReport>, CliError> {
    config.validate()?;
    let estimator = create_estimator(config.vehicle, config.max_speed(), None);
    let regions = source.regions();
    let graphs = build_index_graphs(&source, &regions, &estimator)?;

    let mut reports = Vec::with_capacity(graphs.len());
    for (region, graph) in &graphs {
        let components = joint_components(graph)?;
        if components.len() > 1 {
            warn!(region, components = components.len(), "Region graph is not connected");
        }
        reports.push(RegionReport {
            region: *region,
            roads: graph.geometry().feature_ids().len(),
            joints: graph.num_joints(),
            restriction_pairs: graph.restrictions().len(),
            components,
            points_outside_percent: region_coverage(source.as_ref(), *region)?,
        });
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    serde_json::to_writer_pretty(&mut out, &reports)?;
    writeln!(out)?;
    Ok(reports)
}

//! On-demand construction of region graphs

use std::sync::Arc;

use hashbrown::HashMap;
use log::debug;

use crate::{
    Error, RegionId,
    graph::IndexGraph,
    loading::{MapSource, build_index_graph, build_index_graphs},
    routing::EdgeEstimator,
};

/// Hands out region graphs, building them when first asked for
pub trait IndexGraphLoader: Send {
    /// # Errors
    ///
    /// Returns an error when the region is unknown or cannot be built.
    fn index_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error>;

    /// Drops cached graphs; they are rebuilt on next access
    fn clear(&mut self);

    fn estimator(&self) -> &Arc<dyn EdgeEstimator>;
}

/// Loader owning its cache, used by a single router
pub struct LazyGraphLoader {
    source: Arc<dyn MapSource>,
    estimator: Arc<dyn EdgeEstimator>,
    graphs: HashMap<RegionId, Arc<IndexGraph>>,
}

impl LazyGraphLoader {
    pub fn new(source: Arc<dyn MapSource>, estimator: Arc<dyn EdgeEstimator>) -> Self {
        Self {
            source,
            estimator,
            graphs: HashMap::new(),
        }
    }

    pub fn num_loaded(&self) -> usize {
        self.graphs.len()
    }
}

impl IndexGraphLoader for LazyGraphLoader {
    fn index_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error> {
        if let Some(graph) = self.graphs.get(&region) {
            return Ok(Arc::clone(graph));
        }
        let graph = Arc::new(build_index_graph(
            &self.source,
            region,
            Arc::clone(&self.estimator),
        )?);
        self.graphs.insert(region, Arc::clone(&graph));
        Ok(graph)
    }

    fn clear(&mut self) {
        if !self.graphs.is_empty() {
            debug!("Evicting {} region graphs", self.graphs.len());
        }
        self.graphs.clear();
    }

    fn estimator(&self) -> &Arc<dyn EdgeEstimator> {
        &self.estimator
    }
}

/// Prebuilt graphs of every region, shared read-only by concurrent requests.
///
/// Cloning is cheap. `clear` is a no-op because other requests still use the graphs.
#[derive(Clone)]
pub struct SharedRegionGraphs {
    graphs: Arc<HashMap<RegionId, Arc<IndexGraph>>>,
    estimator: Arc<dyn EdgeEstimator>,
}

impl SharedRegionGraphs {
    /// Builds the graphs of all regions of `source` in parallel
    ///
    /// # Errors
    ///
    /// Returns the first region that fails to build.
    pub fn build(source: &Arc<dyn MapSource>, estimator: Arc<dyn EdgeEstimator>) -> Result<Self, Error> {
        let regions = source.regions();
        let graphs = build_index_graphs(source, &regions, &estimator)?
            .into_iter()
            .map(|(region, graph)| (region, Arc::new(graph)))
            .collect();
        Ok(Self {
            graphs: Arc::new(graphs),
            estimator,
        })
    }

    pub fn get(&self, region: RegionId) -> Option<&Arc<IndexGraph>> {
        self.graphs.get(&region)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl IndexGraphLoader for SharedRegionGraphs {
    fn index_graph(&mut self, region: RegionId) -> Result<Arc<IndexGraph>, Error> {
        self.get(region)
            .cloned()
            .ok_or(Error::UnknownRegion(region))
    }

    fn clear(&mut self) {}

    fn estimator(&self) -> &Arc<dyn EdgeEstimator> {
        &self.estimator
    }
}

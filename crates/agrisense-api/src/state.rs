//! Process-wide state: the graph cache and the trained residual cell.
//!
//! Both live behind one [`ProcessState`] object constructed once at
//! initialisation and passed into entry points explicitly, with no floating
//! globals. A coarse guard serialises writes; readers take snapshots
//! before use. The lifecycle manager calls [`ProcessState::clear_cache`]
//! on shutdown, which releases host and device storage alike.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use agrisense_graph::LayeredHyperGraph;
use agrisense_models::ResidualModel;

/// Shared per-process state for the external contract surface.
#[derive(Debug, Default)]
pub struct ProcessState {
    /// Farm identifier → owned graph (possibly device-resident).
    graph_cache: Mutex<HashMap<String, LayeredHyperGraph>>,
    /// Trained residual coefficients shared across yield forecasts.
    residual: RwLock<Option<ResidualModel>>,
}

impl ProcessState {
    /// Fresh state with an empty cache and no trained residual.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the cached graph for its farm id.
    pub fn cache_graph(&self, graph: LayeredHyperGraph) {
        let farm_id = graph.farm_id().to_string();
        self.graph_cache.lock().insert(farm_id, graph);
    }

    /// Snapshot of the cached graph for `farm_id`, if any.
    pub fn get_cached_graph(&self, farm_id: &str) -> Option<LayeredHyperGraph> {
        self.graph_cache.lock().get(farm_id).cloned()
    }

    /// Runs `mutate` against the cached graph in place under the cache
    /// guard. `None` when the farm is not cached.
    pub fn with_cached_graph_mut<R>(
        &self,
        farm_id: &str,
        mutate: impl FnOnce(&mut LayeredHyperGraph) -> R,
    ) -> Option<R> {
        let mut cache = self.graph_cache.lock();
        cache.get_mut(farm_id).map(mutate)
    }

    /// Drops the cached graph for `farm_id`. Returns `false` when absent.
    pub fn evict_graph(&self, farm_id: &str) -> bool {
        self.graph_cache.lock().remove(farm_id).is_some()
    }

    /// Releases every cached graph and the trained residual.
    pub fn clear_cache(&self) {
        let count = {
            let mut cache = self.graph_cache.lock();
            let count = cache.len();
            cache.clear();
            count
        };
        *self.residual.write() = None;
        debug!(released = count, "process cache cleared");
    }

    /// Number of cached graphs.
    pub fn cached_count(&self) -> usize {
        self.graph_cache.lock().len()
    }

    /// Snapshot of the trained residual, if any.
    pub fn residual(&self) -> Option<ResidualModel> {
        self.residual.read().clone()
    }

    /// Installs a newly trained residual.
    pub fn set_residual(&self, model: ResidualModel) {
        *self.residual.write() = Some(model);
    }
}

//! Per-layer storage: incidence, feature snapshot, and ring-buffer history.
//!
//! Every layer shares the graph's global vertex index, so the row
//! coordinate means the same vertex in every incidence matrix. A layer
//! owns:
//!
//! - `incidence`: sparse `|V| x |E|` membership matrix
//! - `features`: dense `|V| x d` current snapshot
//! - `history`: ring buffer of the last `H` pushes per vertex
//! - host-side edge ids and metadata
//!
//! The ring buffer's head pointer is 1-based in the external contract
//! (`head ∈ [1, H]`, advance `head ← (head mod H) + 1`); internally the
//! write slot is `head - 1`. History is stored `(|V|, H, d)` so one ring
//! slot of one vertex is a contiguous row (the shape the push kernel
//! wants) and transposed to the contract's `|V| x d x H` at the
//! serialization boundary.

use ndarray::{Array2, Array3, Axis};

use agrisense_core::backend::{launch, Backend, Residency};
use agrisense_core::sparse::CscMatrix;
use agrisense_core::tensor::{Tensor2, Tensor3};

/// The closed set of known layer tags.
pub const KNOWN_LAYERS: [&str; 7] = [
    "soil",
    "irrigation",
    "weather",
    "lighting",
    "crop_requirements",
    "npk",
    "vision",
];

/// Feature dimension for a layer tag. Unknown tags default to 1.
pub fn layer_feature_dim(layer: &str) -> usize {
    match layer {
        "soil" => 4,
        "irrigation" => 3,
        "weather" => 5,
        "npk" => 3,
        "lighting" => 3,
        "vision" => 4,
        "crop_requirements" => 5,
        _ => 1,
    }
}

/// Column names for a layer's feature snapshot, in storage order.
pub fn layer_feature_names(layer: &str) -> &'static [&'static str] {
    match layer {
        "soil" => &["moisture", "temperature", "conductivity", "ph"],
        "irrigation" => &["flow_rate", "pressure", "valve_state"],
        "weather" => &[
            "temperature",
            "humidity",
            "precipitation",
            "wind_speed",
            "solar_rad",
        ],
        "npk" => &["nitrogen", "phosphorus", "potassium"],
        "lighting" => &["par", "dli", "spectrum_index"],
        "vision" => &["canopy_coverage", "growth_stage", "anomaly_score", "ndvi"],
        "crop_requirements" => &[
            "target_yield",
            "growth_progress",
            "n_target",
            "p_target",
            "k_target",
        ],
        _ => &[],
    }
}

/// Name of feature column `idx` in `layer`, falling back to a positional
/// name for grown or unknown columns.
pub fn feature_name(layer: &str, idx: usize) -> String {
    layer_feature_names(layer)
        .get(idx)
        .map_or_else(|| format!("feature_{}", idx + 1), |name| (*name).to_string())
}

/// Storage for one hypergraph layer.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Sparse `|V| x |E|` vertex-to-hyperedge membership.
    pub(crate) incidence: CscMatrix,
    /// Dense `|V| x d` current feature snapshot.
    pub(crate) features: Tensor2,
    /// Ring buffer, stored `(|V|, H, d)`.
    pub(crate) history: Tensor3,
    /// Next write slot, 1-based, in `[1, H]`.
    pub(crate) history_head: usize,
    /// Number of valid ring entries, saturating at `H`.
    pub(crate) history_length: usize,
    /// Hyperedge identifiers, column order.
    pub(crate) edge_ids: Vec<String>,
    /// Free-form metadata per hyperedge, column order.
    pub(crate) edge_metadata: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Where the numeric arrays live. Metadata stays host regardless.
    pub(crate) residency: Residency,
}

impl Layer {
    /// A layer with no edges and zeroed features/history for `n_vertices`.
    pub fn empty(tag: &str, n_vertices: usize, history_depth: usize) -> Self {
        let d = layer_feature_dim(tag);
        Self {
            incidence: CscMatrix::with_rows(n_vertices),
            features: Tensor2::zeros(n_vertices, d),
            history: Tensor3::zeros(n_vertices, history_depth, d),
            history_head: 1,
            history_length: 0,
            edge_ids: Vec::new(),
            edge_metadata: Vec::new(),
            residency: Residency::Host,
        }
    }

    /// Assembles a layer from deserialized parts. History arrives in the
    /// internal `(|V|, H, d)` layout.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        incidence: CscMatrix,
        features: Array2<f32>,
        history: Array3<f32>,
        history_head: usize,
        history_length: usize,
        edge_ids: Vec<String>,
        edge_metadata: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        Self {
            incidence,
            features: Tensor2::from_array(features),
            history: Tensor3::from_array(history),
            history_head,
            history_length,
            edge_ids,
            edge_metadata,
            residency: Residency::Host,
        }
    }

    /// Number of hyperedges.
    pub fn n_edges(&self) -> usize {
        self.incidence.ncols()
    }

    /// Feature dimension `d`.
    pub fn feature_dim(&self) -> usize {
        self.features.dim().1
    }

    /// Ring depth `H`.
    pub fn history_depth(&self) -> usize {
        self.history.dim().1
    }

    /// Next ring write slot, 1-based.
    pub fn history_head(&self) -> usize {
        self.history_head
    }

    /// Count of valid ring entries.
    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Hyperedge identifiers in column order.
    pub fn edge_ids(&self) -> &[String] {
        &self.edge_ids
    }

    /// Per-edge metadata in column order.
    pub fn edge_metadata(&self) -> &[serde_json::Map<String, serde_json::Value>] {
        &self.edge_metadata
    }

    /// Sparse incidence matrix.
    pub fn incidence(&self) -> &CscMatrix {
        &self.incidence
    }

    /// Current feature snapshot.
    pub fn features(&self) -> &Tensor2 {
        &self.features
    }

    /// Ring-buffer history in internal `(|V|, H, d)` layout.
    pub fn history(&self) -> &Tensor3 {
        &self.history
    }

    /// Where the numeric arrays live.
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Moves the three numeric arrays; ids, metadata, and ring pointers are
    /// untouched.
    pub fn transfer(&mut self, target: Residency) {
        self.features.transfer(target);
        self.history.transfer(target);
        self.residency = target;
    }

    /// Grows the feature dimension to `new_d`, zero-padding existing rows
    /// and history slots.
    pub(crate) fn grow_feature_dim(&mut self, new_d: usize) {
        let (n, d) = self.features.dim();
        if new_d <= d {
            return;
        }
        let mut features = Array2::zeros((n, new_d));
        features
            .slice_mut(ndarray::s![.., ..d])
            .assign(self.features.data());
        self.features.replace(features);

        let (_, h, _) = self.history.dim();
        let mut history = Array3::zeros((n, h, new_d));
        history
            .slice_mut(ndarray::s![.., .., ..d])
            .assign(self.history.data());
        self.history.replace(history);
    }

    /// Appends one zero row to incidence, features, and history.
    pub(crate) fn append_vertex_row(&mut self) {
        self.incidence.append_rows(1);

        let (n, d) = self.features.dim();
        let mut features = Array2::zeros((n + 1, d));
        features
            .slice_mut(ndarray::s![..n, ..])
            .assign(self.features.data());
        self.features.replace(features);

        let (_, h, hd) = self.history.dim();
        let mut history = Array3::zeros((n + 1, h, hd));
        history
            .slice_mut(ndarray::s![..n, .., ..])
            .assign(self.history.data());
        self.history.replace(history);
    }

    /// Writes `values` into the snapshot row and the current ring slot for
    /// vertex `row`, then advances the head and saturates the length.
    ///
    /// A vector wider than `d` grows the layer first; a narrower vector
    /// updates only its leading columns. Device-resident storage takes the
    /// data-parallel kernel indexed on the feature dimension; host storage
    /// assigns directly.
    pub(crate) fn push_features(&mut self, row: usize, values: &[f32]) {
        if values.len() > self.feature_dim() {
            self.grow_feature_dim(values.len());
        }
        let k = values.len().min(self.feature_dim());
        let h = self.history_depth();
        let slot = self.history_head - 1;

        if self.residency.is_device() {
            let backend = Backend::detect();
            let kernel = |base: usize, chunk: &mut [f32]| {
                chunk.copy_from_slice(&values[base..base + chunk.len()]);
            };

            let snapshot_row = self
                .features
                .data_mut()
                .row_mut(row)
                .into_slice()
                .expect("snapshot rows are contiguous");
            let _ = launch(backend, &mut snapshot_row[..k], kernel);

            let mut panel = self.history.data_mut().index_axis_mut(Axis(0), row);
            let slot_row = panel
                .row_mut(slot)
                .into_slice()
                .expect("ring slots are contiguous");
            let _ = launch(backend, &mut slot_row[..k], kernel);
        } else {
            for (f, &value) in values.iter().take(k).enumerate() {
                self.features.data_mut()[[row, f]] = value;
                self.history.data_mut()[[row, slot, f]] = value;
            }
        }

        self.history_head = (self.history_head % h) + 1;
        self.history_length = (self.history_length + 1).min(h);
    }

    /// Host `d x L` matrix of vertex `row`'s history, oldest first.
    ///
    /// Before the ring wraps the valid slots are `1..=history_length`; once
    /// full the oldest entry sits at `history_head` and reading wraps.
    pub(crate) fn history_matrix(&self, row: usize) -> Array2<f32> {
        let d = self.feature_dim();
        let h = self.history_depth();
        let len = self.history_length;
        let host = self.history.ensure_host();
        let mut out = Array2::zeros((d, len));
        for i in 0..len {
            let slot = if len < h {
                i
            } else {
                (self.history_head - 1 + i) % h
            };
            for f in 0..d {
                out[[f, i]] = host[[row, slot, f]];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_dims_match_table() {
        assert_eq!(layer_feature_dim("soil"), 4);
        assert_eq!(layer_feature_dim("irrigation"), 3);
        assert_eq!(layer_feature_dim("weather"), 5);
        assert_eq!(layer_feature_dim("npk"), 3);
        assert_eq!(layer_feature_dim("lighting"), 3);
        assert_eq!(layer_feature_dim("vision"), 4);
        assert_eq!(layer_feature_dim("crop_requirements"), 5);
        assert_eq!(layer_feature_dim("magnetics"), 1);
    }

    #[test]
    fn test_feature_name_fallback() {
        assert_eq!(feature_name("soil", 0), "moisture");
        assert_eq!(feature_name("soil", 9), "feature_10");
        assert_eq!(feature_name("magnetics", 0), "feature_1");
    }

    #[test]
    fn test_push_advances_head_and_saturates_length() {
        let mut layer = Layer::empty("soil", 2, 3);
        assert_eq!(layer.history_head(), 1);
        assert_eq!(layer.history_length(), 0);

        for i in 0..5 {
            layer.push_features(0, &[i as f32, 0.0, 0.0, 0.0]);
        }
        // head walked 1→2→3→1→2→3
        assert_eq!(layer.history_head(), 3);
        assert_eq!(layer.history_length(), 3);
    }

    #[test]
    fn test_history_oldest_first_before_wrap() {
        let mut layer = Layer::empty("npk", 1, 4);
        layer.push_features(0, &[1.0, 0.0, 0.0]);
        layer.push_features(0, &[2.0, 0.0, 0.0]);
        let hist = layer.history_matrix(0);
        assert_eq!(hist.dim(), (3, 2));
        assert!((hist[[0, 0]] - 1.0).abs() < f32::EPSILON);
        assert!((hist[[0, 1]] - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_history_wraps_oldest_first() {
        let mut layer = Layer::empty("npk", 1, 3);
        for i in 1..=5 {
            layer.push_features(0, &[i as f32, 0.0, 0.0]);
        }
        let hist = layer.history_matrix(0);
        assert_eq!(hist.dim(), (3, 3));
        // pushes 3, 4, 5 survive, oldest first
        assert!((hist[[0, 0]] - 3.0).abs() < f32::EPSILON);
        assert!((hist[[0, 1]] - 4.0).abs() < f32::EPSILON);
        assert!((hist[[0, 2]] - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wide_push_grows_dimension() {
        let mut layer = Layer::empty("magnetics", 2, 4);
        assert_eq!(layer.feature_dim(), 1);
        layer.push_features(0, &[1.0, 2.0, 3.0]);
        assert_eq!(layer.feature_dim(), 3);
        // Pre-existing rows zero-padded
        assert!((layer.features().data()[[1, 2]]).abs() < f32::EPSILON);
        assert!((layer.features().data()[[0, 2]] - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_device_push_matches_host_push() {
        let mut host_layer = Layer::empty("soil", 2, 4);
        let mut dev_layer = Layer::empty("soil", 2, 4);
        dev_layer.transfer(Residency::Device);

        for i in 0..3 {
            let values = [0.1 * i as f32, 0.2, 0.3, 0.4];
            host_layer.push_features(1, &values);
            dev_layer.push_features(1, &values);
        }

        assert_eq!(host_layer.features().data(), dev_layer.features().data());
        assert_eq!(host_layer.history().data(), dev_layer.history().data());
        assert_eq!(host_layer.history_head(), dev_layer.history_head());
    }

    #[test]
    fn test_append_vertex_row_keeps_invariants() {
        let mut layer = Layer::empty("soil", 2, 4);
        layer.push_features(0, &[0.5, 0.0, 0.0, 0.0]);
        layer.append_vertex_row();
        assert_eq!(layer.features().dim(), (3, 4));
        assert_eq!(layer.history().dim(), (3, 4, 4));
        assert_eq!(layer.incidence().nrows(), 3);
        // Old values survive
        assert!((layer.features().data()[[0, 0]] - 0.5).abs() < f32::EPSILON);
    }
}

//! Zone resolution shared by the per-edge aggregating models.

use agrisense_graph::Layer;

/// Zone identifier for a hyperedge column: the edge's `zone_id` metadata
/// entry when present, the edge id otherwise.
pub(crate) fn edge_zone_id(layer: &Layer, col: usize) -> String {
    layer.edge_metadata()[col]
        .get("zone_id")
        .and_then(|value| value.as_str())
        .map_or_else(|| layer.edge_ids()[col].clone(), str::to_string)
}

/// Crop-bed identifier for a hyperedge column: the edge's `crop_bed_id`
/// metadata entry when present, the edge id otherwise.
pub(crate) fn edge_crop_bed_id(layer: &Layer, col: usize) -> String {
    layer.edge_metadata()[col]
        .get("crop_bed_id")
        .and_then(|value| value.as_str())
        .map_or_else(|| layer.edge_ids()[col].clone(), str::to_string)
}

//! Vector analysis algorithms
//!
//! Geometric operations on feature collections:
//! - Overlay: clip and erase against a dissolved polygon mask
//! - Buffer: expand or shrink geometries
//! - Hulls: convex, concave (Delaunay edge filter), concavity suggestion
//! - Smoothing: Bezier splines through line and ring vertices
//! - Cross-sections: perpendicular transects at fixed stations
//! - Aggregation: dissolve by attribute, merge layers
//! - Measurements: area, length, perimeter

mod aggregate;
mod buffer;
mod cross_section;
pub(crate) mod geometry;
mod hull;
pub mod measure;
mod overlay;
mod smooth;

pub use aggregate::{dissolve, merge_layers, Dissolve, DissolveParams};
pub use buffer::{buffer_features, buffer_geometry, capsule, circle, Buffer, BufferParams};
pub use cross_section::{cross_sections, CrossSectionParams};
pub use hull::{
    concave_hull, convex_hull, suggest_concavity, ConcaveHull, ConcaveHullParams,
    ConcavitySuggestion, ConvexHull,
};
pub use measure::{area, length, measure_features, perimeter, total_area};
pub use overlay::{clip, dissolve_mask, erase, overlay, Clip, Erase, OverlayOp};
pub use smooth::{bezier_smooth, smooth_geometry, smooth_line, smooth_ring, BezierParams, BezierSmooth};

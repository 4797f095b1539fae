//! # Vectis Algorithms
//!
//! Vector analysis and classification algorithms for Vectis.
//!
//! ## Available Algorithm Categories
//!
//! - **classification**: Quantile and natural-breaks graduated classes, categorized values
//! - **vector**: Clip, erase, buffer, hulls, smoothing, cross-sections, dissolve, merge
//! - **trajectory**: Displacement vectors, DBSCAN clustering, coherence, feature tracking
//! - **demography**: Geometric population projection from three censuses
//! - **statistics**: Descriptive statistics, correlation, topographic profiles
//! - **spatial_index**: k-d tree shared by the nearest-neighbour scans

mod maybe_rayon;

pub mod classification;
pub mod demography;
pub mod spatial_index;
pub mod statistics;
pub mod trajectory;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        categorize, classify_graduated, natural_breaks, quantile_breaks,
        CategorizedClassification, ClassificationMethod, GraduatedClassification,
    };
    pub use crate::demography::{project_features, project_population, CensusSeries};
    pub use crate::statistics::{correlate, describe, topographic_profile, PointSampler};
    pub use crate::trajectory::{
        cluster_vectors, coherence, displacement_vectors, track_features, ClusterParams,
        CoherenceParams, TrackingParams, VectorParams,
    };
    pub use crate::vector::{
        bezier_smooth, buffer_features, clip, concave_hull, convex_hull, cross_sections, dissolve,
        erase, merge_layers, suggest_concavity, BezierParams, BufferParams, ConcaveHullParams,
        CrossSectionParams, DissolveParams,
    };
    pub use vectis_core::prelude::*;
}

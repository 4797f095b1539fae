//! Demographic projection
//!
//! Geometric-growth projection from three census counts.

mod projection;

pub use projection::{project_features, project_population, CensusSeries, PopulationProjection};

//! # Vectis Core
//!
//! Core types, traits and I/O for the Vectis vector analysis library.
//!
//! This crate provides:
//! - `Feature` / `FeatureCollection`: geometry plus dynamically typed attributes
//! - `ProjectedPoint` / `GeodeticPoint`: planar vs WGS84 coordinates
//! - `LinearUnit`: user-facing distance units
//! - `Selection`: the layer-scoped selection convention
//! - Algorithm trait for consistent API
//! - GeoJSON I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod vector;

pub use crs::{GeodeticPoint, LinearUnit, ProjectedPoint, EARTH_RADIUS_KM};
pub use error::{Error, Result};
pub use vector::{
    natural_cmp, AnalysisReport, AttributeValue, Feature, FeatureCollection, FeatureId, Properties,
    Selection, SkippedFeature,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{GeodeticPoint, LinearUnit, ProjectedPoint};
    pub use crate::error::{Error, Result};
    pub use crate::vector::{
        AnalysisReport, AttributeValue, Feature, FeatureCollection, FeatureId, Selection,
    };
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in Vectis.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}

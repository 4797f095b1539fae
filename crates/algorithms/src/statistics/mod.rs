//! Statistics helpers
//!
//! - **descriptive**: count, range, mean, median, standard deviation
//! - **correlation**: Pearson correlation and least-squares regression
//! - **profile**: line sampling and remote-sampled topographic profiles

mod correlation;
mod descriptive;
mod profile;

pub use correlation::{correlate, Correlation};
pub use descriptive::{describe, DescriptiveStats};
pub use profile::{
    profile_correlation, sample_geodetic_line, sample_line, topographic_profile, PointSampler,
    Profile, ProfileStation, Station,
};

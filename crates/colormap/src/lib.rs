//! # Vectis Colormap
//!
//! Two-colour ramps for vector symbology.
//!
//! Graduated and categorized classifications pair every break or category
//! with one colour sampled from a linear RGB ramp between a start and an end
//! colour. The main entry point is [`generate_ramp`].
//!
//! ## Usage
//!
//! ```
//! use vectis_colormap::generate_ramp;
//!
//! let colors = generate_ramp("#ff0000", "#0000ff", 3);
//! assert_eq!(colors, vec!["#ff0000", "#800080", "#0000ff"]);
//! ```

mod ramp;

pub use ramp::{generate_ramp, interpolate_color, parse_hex, Ramp, Rgb};

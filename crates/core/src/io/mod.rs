//! I/O for exchanging feature collections with the outside world
//!
//! The analysis core itself never touches the filesystem; these helpers are
//! for the CLI and for tests.

mod geojson_io;

pub use geojson_io::{from_geojson_str, read_geojson, to_geojson_string, write_geojson};

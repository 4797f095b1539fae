//! Linear RGB interpolation between two colours.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Parse a strict `#RRGGBB` string. Anything else is black.
    pub fn from_hex(hex: &str) -> Self {
        parse_hex(hex).unwrap_or(Self::BLACK)
    }

    /// Lower-case `#rrggbb`
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Parse `#RRGGBB` (hex digits in either case). Returns `None` for any other shape.
pub fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Per-channel linear interpolation, rounded to the nearest integer.
///
/// `t` is clamped to `[0, 1]`.
pub fn interpolate_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

/// Generate `count` hex colours from `start_hex` to `end_hex`.
///
/// With `count <= 1` only the start colour is returned; the end colour is
/// dropped. Otherwise the first element is the start colour and the last is
/// the end colour. Invalid hex input is treated as black.
pub fn generate_ramp(start_hex: &str, end_hex: &str, count: usize) -> Vec<String> {
    Ramp::new(Rgb::from_hex(start_hex), Rgb::from_hex(end_hex)).colors(count)
}

/// A two-colour ramp, the colour configuration of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    pub start: Rgb,
    pub end: Rgb,
}

impl Ramp {
    pub const fn new(start: Rgb, end: Rgb) -> Self {
        Self { start, end }
    }

    pub fn from_hex(start: &str, end: &str) -> Self {
        Self::new(Rgb::from_hex(start), Rgb::from_hex(end))
    }

    /// Sample the ramp at `count` evenly spaced positions.
    pub fn rgb(&self, count: usize) -> Vec<Rgb> {
        if count <= 1 {
            return vec![self.start];
        }
        let last = (count - 1) as f64;
        (0..count)
            .map(|i| interpolate_color(self.start, self.end, i as f64 / last))
            .collect()
    }

    /// Sample the ramp as hex strings.
    pub fn colors(&self, count: usize) -> Vec<String> {
        self.rgb(count).iter().map(Rgb::to_hex).collect()
    }
}

impl Default for Ramp {
    /// Pale yellow to dark red
    fn default() -> Self {
        Self::new(Rgb::new(0xff, 0xff, 0xb2), Rgb::new(0xbd, 0x00, 0x26))
    }
}

// Ramps travel as `{"start": "#rrggbb", "end": "#rrggbb"}`
#[derive(Serialize, Deserialize)]
struct RampRepr {
    start: String,
    end: String,
}

impl Serialize for Ramp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RampRepr {
            start: self.start.to_hex(),
            end: self.end.to_hex(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Ramp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = RampRepr::deserialize(deserializer)?;
        Ok(Ramp::from_hex(&repr.start, &repr.end))
    }
}

//! Dynamically typed attribute values and their ordering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Numeric coercion used by every "numeric fields only" analysis.
    ///
    /// Numbers pass through, strings count only when they parse as a finite
    /// float; booleans and nulls are never numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) if f.is_finite() => Some(*f),
            AttributeValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, AttributeValue::Int(_) | AttributeValue::Float(_))
    }

    /// Ordering used for category lists.
    ///
    /// Two numbers compare numerically; anything else compares by display
    /// text with [`natural_cmp`]. Nulls sort last.
    pub fn natural_cmp(&self, other: &AttributeValue) -> Ordering {
        match (self, other) {
            (AttributeValue::Null, AttributeValue::Null) => Ordering::Equal,
            (AttributeValue::Null, _) => Ordering::Greater,
            (_, AttributeValue::Null) => Ordering::Less,
            (a, b) if a.is_number() && b.is_number() => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
            }
            (a, b) => natural_cmp(&a.to_string(), &b.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (i, c) in s.char_indices() {
        let d = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != d => {
                out.push(if prev { Chunk::Digits(&s[start..i]) } else { Chunk::Text(&s[start..i]) });
                start = i;
            }
            _ => {}
        }
        in_digits = Some(d);
    }
    if let Some(d) = in_digits {
        out.push(if d { Chunk::Digits(&s[start..]) } else { Chunk::Text(&s[start..]) });
    }
    out
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Locale-style string comparison with numeric sub-sequence ordering.
///
/// Runs of ASCII digits compare by numeric value (`"2" < "10"`), other text
/// compares case-insensitively. Strings equal under that primary order are
/// tie-broken with lower case before upper case.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ca = chunks(a);
    let cb = chunks(b);

    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            // Punctuation and letters order after digits in the primary key
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
            (Chunk::Text(x), Chunk::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    ca.len().cmp(&cb.len()).then_with(|| {
        a.chars()
            .map(|c| (c.to_lowercase().next().unwrap_or(c), c.is_uppercase()))
            .cmp(b.chars().map(|c| (c.to_lowercase().next().unwrap_or(c), c.is_uppercase())))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_runs_compare_by_value() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("zone 9", "zone 10"), Ordering::Less);
        assert_eq!(natural_cmp("a10b", "a9c"), Ordering::Greater);
    }

    #[test]
    fn case_insensitive_primary_order() {
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("a", "A"), Ordering::Less);
        assert_eq!(natural_cmp("Forest", "forest"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros() {
        assert_eq!(natural_cmp("007", "7"), Ordering::Greater);
        assert_eq!(natural_cmp("007", "8"), Ordering::Less);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(AttributeValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::from(" 4.5 ").as_f64(), Some(4.5));
        assert_eq!(AttributeValue::from("abc").as_f64(), None);
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
        assert_eq!(AttributeValue::Null.as_f64(), None);
        assert_eq!(AttributeValue::Float(f64::NAN).as_f64(), None);
    }

    #[test]
    fn value_ordering_puts_null_last() {
        let mut v = vec![
            AttributeValue::Null,
            AttributeValue::Int(10),
            AttributeValue::Float(2.5),
            AttributeValue::from("b"),
        ];
        v.sort_by(|a, b| a.natural_cmp(b));
        assert_eq!(v[0], AttributeValue::Float(2.5));
        assert_eq!(v[1], AttributeValue::Int(10));
        assert_eq!(v[2], AttributeValue::from("b"));
        assert!(v[3].is_null());
    }

    #[test]
    fn display_float_without_trailing_zero() {
        assert_eq!(AttributeValue::Float(2.0).to_string(), "2");
        assert_eq!(AttributeValue::Null.to_string(), "");
    }
}

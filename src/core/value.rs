//! Typed cell values shared by the import pipeline and the registry backends

use serde::Serialize;
use std::fmt;

/// Largest integer magnitude stored as a number.
///
/// Bigger values are kept as text so they are never rounded or truncated.
pub const EXACT_INTEGER_LIMIT: i128 = 9_000_000_000_000_000_000;

/// A non-null attribute value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl FieldValue {
    /// Text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content; integers widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Real(f) => Some(*f),
            FieldValue::Text(_) => None,
        }
    }

    /// Read an integer cell.
    ///
    /// Whole numbers written as `12.0` count as integers, fractional values
    /// stay real, and anything beyond [`EXACT_INTEGER_LIMIT`] is kept as the
    /// original text.
    pub fn parse_integer(s: &str) -> Option<FieldValue> {
        let s = s.trim();
        let digits = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Some(match s.parse::<i128>() {
                Ok(v) if v.abs() <= EXACT_INTEGER_LIMIT => FieldValue::Integer(v as i64),
                _ => FieldValue::Text(s.to_string()),
            });
        }

        let f = Self::parse_real(s)?;
        if f.fract() != 0.0 {
            Some(FieldValue::Real(f))
        } else if f.abs() <= EXACT_INTEGER_LIMIT as f64 {
            Some(FieldValue::Integer(f as i64))
        } else {
            Some(FieldValue::Text(s.to_string()))
        }
    }

    /// Read a real cell; a decimal comma is accepted when there is no dot
    pub fn parse_real(s: &str) -> Option<f64> {
        let s = s.trim();
        let parsed = match s.parse::<f64>() {
            Ok(f) => Some(f),
            Err(_) if !s.contains('.') && s.matches(',').count() == 1 => {
                s.replace(',', ".").parse::<f64>().ok()
            }
            Err(_) => None,
        };
        parsed.filter(|f| f.is_finite())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Real(f)
    }
}

//! Asset code normalization
//!
//! Every code that crosses a read or write boundary goes through
//! [`normalize_code`], so `" sld-001 "` and `"SLD-001"` always name the
//! same registry row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trim and upper-case a raw scanned or typed code.
///
/// Returns `None` when nothing is left after trimming.
pub fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// A normalized asset code, the natural key of the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    /// Normalize a raw string into a code
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        normalize_code(raw).map(Self).ok_or(CodeError::Empty)
    }

    /// Get the normalized code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetCode> for String {
    fn from(code: AssetCode) -> Self {
        code.0
    }
}

impl AsRef<str> for AssetCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing an asset code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("asset code is empty")]
    Empty,
}

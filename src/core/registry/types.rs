//! Registry query and result types

use serde::Serialize;
use std::str::FromStr;

/// Default cap on listed records
pub const DEFAULT_LIST_LIMIT: usize = 2000;

/// Which workflow state `list` returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Registered from a scan, not yet verified
    New,
    Verified,
    Unverified,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::New => "new",
            StatusFilter::Verified => "verified",
            StatusFilter::Unverified => "unverified",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "new" => Ok(StatusFilter::New),
            "verified" => Ok(StatusFilter::Verified),
            "unverified" => Ok(StatusFilter::Unverified),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Filter for listing records
#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub status: StatusFilter,
    /// Case-insensitive substring matched against code or name
    pub search: Option<String>,
    pub limit: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            search: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ListFilter {
    /// Search text as a LIKE pattern, with `%`, `_` and `\` escaped
    pub fn like_pattern(&self) -> Option<String> {
        let needle = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let mut escaped = String::with_capacity(needle.len() + 2);
        escaped.push('%');
        for c in needle.to_lowercase().chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        Some(escaped)
    }
}

/// Registry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: u64,
    pub verified: u64,
    pub new: u64,
}

impl RegistryStats {
    /// Records neither verified nor registered from a scan
    pub fn pending(&self) -> u64 {
        self.total.saturating_sub(self.verified + self.new)
    }
}

/// Result of registering a scanned code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// The code was already registered; nothing was changed
    AlreadyExists,
}

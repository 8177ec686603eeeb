//! Dedup and validation of mapped rows

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use tracing::debug;

use super::mapper::MappedTable;
use crate::core::code::AssetCode;
use crate::core::record::{Attributes, Field};

/// A validated row, keyed by its normalized code
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub line: usize,
    pub code: AssetCode,
    pub attributes: Attributes,
}

/// Rows ready for the upsert engine
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub fields: Vec<Field>,
    pub rows: Vec<ImportRow>,
    /// Stamp shared by every row of the batch
    pub created_at: String,
    pub rows_read: usize,
    pub dropped_empty: usize,
    pub dropped_duplicates: usize,
}

/// Normalize codes, drop rows without one, and keep the first row per code.
///
/// The result never holds two rows with the same normalized code.
pub fn dedup(table: MappedTable, now: DateTime<Utc>) -> ImportBatch {
    let rows_read = table.rows.len();
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(rows_read);
    let mut dropped_empty = 0;
    let mut dropped_duplicates = 0;

    for row in table.rows {
        let Ok(code) = AssetCode::parse(&row.raw_code) else {
            debug!(line = row.line, "row without asset code dropped");
            dropped_empty += 1;
            continue;
        };
        if !seen.insert(code.clone()) {
            debug!(line = row.line, %code, "duplicate asset code dropped");
            dropped_duplicates += 1;
            continue;
        }
        rows.push(ImportRow {
            line: row.line,
            code,
            attributes: row.attributes,
        });
    }

    ImportBatch {
        fields: table.fields,
        rows,
        created_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        rows_read,
        dropped_empty,
        dropped_duplicates,
    }
}

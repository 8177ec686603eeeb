//! Map spreadsheet columns onto the registry field catalog

use tracing::{debug, warn};

use super::dates::parse_date_to_iso;
use super::sheet::Sheet;
use super::ImportError;
use crate::core::record::{header_matches, Attributes, Field, FieldKind, CODE_HEADERS};
use crate::core::value::FieldValue;

/// A sheet row reduced to catalog fields
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    /// Line in the source file
    pub line: usize,
    /// Identity cell exactly as read; normalization happens in dedup
    pub raw_code: String,
    pub attributes: Attributes,
}

/// Output of [`map_sheet`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedTable {
    /// Fields whose header was present, in sheet order
    pub fields: Vec<Field>,
    pub rows: Vec<MappedRow>,
    /// Headers that matched nothing (or repeated an already mapped field)
    pub unmapped_headers: Vec<String>,
    /// Cells that could not be coerced and were stored as null
    pub invalid_cells: usize,
}

/// Result of coercing one cell
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Value(FieldValue),
    Invalid,
}

/// Map a sheet onto the catalog.
///
/// Fails with [`ImportError::MissingRequiredColumn`] when no identity column
/// is present. Unknown columns are dropped.
pub fn map_sheet(sheet: &Sheet) -> Result<MappedTable, ImportError> {
    let headers = sheet.headers();

    let code_idx = headers
        .iter()
        .position(|h| CODE_HEADERS.iter().any(|expected| header_matches(h, expected)))
        .ok_or_else(|| ImportError::MissingRequiredColumn {
            expected: CODE_HEADERS
                .iter()
                .map(|h| format!("'{}'", h))
                .collect::<Vec<_>>()
                .join(" or "),
        })?;

    let mut table = MappedTable::default();
    let mut columns: Vec<(usize, Field)> = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        if idx == code_idx {
            continue;
        }
        match Field::all().iter().find(|f| f.matches_header(header)) {
            Some(field) if !table.fields.contains(field) => {
                debug!(header = header.trim(), column = field.column(), "mapped column");
                table.fields.push(*field);
                columns.push((idx, *field));
            }
            _ => table.unmapped_headers.push(header.trim().to_string()),
        }
    }

    for row in sheet.rows() {
        let mut attributes = Attributes::new();
        for &(idx, field) in &columns {
            match coerce(field.kind(), row.cell(idx)) {
                Cell::Empty => {}
                Cell::Value(v) => attributes.set(field, Some(v)),
                Cell::Invalid => {
                    warn!(
                        line = row.line,
                        column = field.column(),
                        value = row.cell(idx),
                        "unreadable value stored as null"
                    );
                    table.invalid_cells += 1;
                }
            }
        }
        table.rows.push(MappedRow {
            line: row.line,
            raw_code: row.cell(code_idx).to_string(),
            attributes,
        });
    }

    Ok(table)
}

fn coerce(kind: FieldKind, raw: &str) -> Cell {
    let s = raw.trim();
    if s.is_empty() {
        return Cell::Empty;
    }

    let value = match kind {
        FieldKind::Date => parse_date_to_iso(s).map(FieldValue::Text),
        _ => kind.conform(FieldValue::from(s)),
    };

    value.map(Cell::Value).unwrap_or(Cell::Invalid)
}

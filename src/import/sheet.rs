//! Reading spreadsheets
//!
//! Sheets arrive either as workbooks (`.xlsx`, `.xls`, `.ods`) or as CSV
//! exports. CSV exports may use `;` as the separator, carry a UTF-8 byte
//! order mark, or be encoded in Latin-1. Workbook date cells are turned into
//! date text here, so the mapper only ever sees strings.

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, TimeDelta};
use csv::{ByteRecord, ReaderBuilder};
use std::fs;
use std::path::Path;

use super::ImportError;

const BOM: &[u8] = b"\xEF\xBB\xBF";

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Whether a path names a workbook rather than a CSV export
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
}

/// A header row plus string cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<SheetRow>,
}

/// One data row and the file line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub line: usize,
    pub cells: Vec<String>,
}

impl SheetRow {
    /// Cell at a column index; missing trailing cells read as empty
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

impl Sheet {
    /// Read a CSV export, auto-detecting the delimiter unless one is given
    pub fn from_path(path: &Path, delimiter: Option<u8>) -> Result<Self, ImportError> {
        let bytes = fs::read(path).map_err(|e| ImportError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes, delimiter)
    }

    /// Read one worksheet of a workbook, the first one unless named
    pub fn from_workbook(path: &Path, sheet: Option<&str>) -> Result<Self, ImportError> {
        let read_error = |message: String| ImportError::Read {
            path: path.to_path_buf(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
        let names = workbook.sheet_names();
        let name = match sheet {
            Some(wanted) => names
                .iter()
                .find(|n| n.as_str() == wanted)
                .cloned()
                .ok_or_else(|| ImportError::SheetNotFound {
                    name: wanted.to_string(),
                    available: names.join(", "),
                })?,
            None => names
                .first()
                .cloned()
                .ok_or_else(|| read_error("workbook has no worksheets".to_string()))?,
        };

        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| read_error(e.to_string()))?;
        Ok(Self::from_range(&range))
    }

    /// First row of the used range is the header row
    fn from_range(range: &Range<Data>) -> Self {
        let header_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();

        let rows = rows
            .enumerate()
            .filter_map(|(i, cells)| {
                let cells: Vec<String> = cells.iter().map(cell_text).collect();
                if cells.iter().all(|c| c.trim().is_empty()) {
                    return None;
                }
                Some(SheetRow {
                    line: header_line + i + 1,
                    cells,
                })
            })
            .collect();

        Self { headers, rows }
    }

    /// Parse CSV content held in memory
    pub fn from_bytes(bytes: &[u8], delimiter: Option<u8>) -> Result<Self, ImportError> {
        let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
        let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(bytes));

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let headers = rdr
            .byte_headers()
            .map_err(|e| ImportError::Malformed {
                line: 1,
                message: e.to_string(),
            })?
            .iter()
            .map(decode_cell)
            .collect();

        let mut rows = Vec::new();
        let mut record = ByteRecord::new();
        loop {
            match rdr.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
                    return Err(ImportError::Malformed {
                        line,
                        message: e.to_string(),
                    });
                }
            }

            let cells: Vec<String> = record.iter().map(decode_cell).collect();
            // Trailing `;;;;` lines are common in Excel exports
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            rows.push(SheetRow { line, cells });
        }

        Ok(Self { headers, rows })
    }

    /// Build a sheet from already-split values
    pub fn from_rows<H, R, C>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, cells)| SheetRow {
                    line: i + 2,
                    cells: cells.into_iter().map(Into::into).collect(),
                })
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }
}

/// Pick the separator that occurs most often in the header line
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or(&[]);
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|d| first_line.iter().filter(|&&b| b == *d).count())
        .filter(|d| first_line.contains(d))
        .unwrap_or(b',')
}

/// UTF-8 when valid, Latin-1 otherwise
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Workbook cell as the text a CSV export of it would hold
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // 4521.0 prints as "4521"
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            excel_serial_to_text(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
        }
        other => other.to_string(),
    }
}

/// Excel serial date (days since 1899-12-30) as `YYYY-MM-DD`, with
/// ` HH:MM:SS` appended when the serial carries a time of day
fn excel_serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let at = epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)?;

    let fmt = if seconds % 86_400 == 0 {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    Some(at.format(fmt).to_string())
}

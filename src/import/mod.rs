//! Spreadsheet import and cross-storage reconciliation
//!
//! Data flows sheet → [`mapper`] → [`dedup`] → [`upsert`] → registry.
//! Every stage is written against [`crate::core::registry::Registry`], never
//! against a concrete backend.

pub mod dates;
pub mod dedup;
pub mod mapper;
pub mod sheet;
pub mod upsert;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::registry::RegistryError;

pub use dates::parse_date_to_iso;
pub use dedup::{dedup, ImportBatch, ImportRow};
pub use mapper::{map_sheet, MappedRow, MappedTable};
pub use sheet::{is_workbook, Sheet};
pub use upsert::{
    import_batch, import_file, import_sheet, migrate, normalize_for_migration, ImportOptions,
    ImportReport, MigrationReport,
};

/// Errors that abort an import or migration batch
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("cannot read {path:?}: {message}")]
    #[diagnostic(code(ait::import::read))]
    Read { path: PathBuf, message: String },

    #[error("worksheet '{name}' not found")]
    #[diagnostic(
        code(ait::import::sheet_not_found),
        help("the workbook has: {available}")
    )]
    SheetNotFound { name: String, available: String },

    #[error("malformed spreadsheet at line {line}: {message}")]
    #[diagnostic(code(ait::import::malformed))]
    Malformed { line: usize, message: String },

    #[error("identity column missing: expected a column named {expected}")]
    #[diagnostic(
        code(ait::import::missing_required_column),
        help("rename the asset code column of the sheet; nothing was imported")
    )]
    MissingRequiredColumn { expected: String },

    #[error("registry table has no `code` column")]
    #[diagnostic(code(ait::import::registry_missing_code))]
    RegistryMissingCode,

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

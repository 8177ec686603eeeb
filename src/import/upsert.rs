//! Writing batches into a registry and moving registries between stores

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::dates::parse_date_to_iso;
use super::dedup::{dedup, ImportBatch};
use super::mapper::map_sheet;
use super::sheet::{is_workbook, Sheet};
use super::ImportError;
use crate::core::record::{AssetRecord, Field, CODE_COLUMN};
use crate::core::registry::{Column, Registry};
use crate::core::value::FieldValue;

/// How to read and apply an import
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// CSV field separator; detected from the header line when `None`
    pub delimiter: Option<u8>,
    /// Workbook worksheet to read; the first one when `None`
    pub sheet: Option<String>,
    /// Report what would be inserted without writing
    pub dry_run: bool,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    /// Rows inserted (or that would be, on a dry run)
    pub accepted: usize,
    /// Rows whose code was already registered
    pub ignored_existing: usize,
    pub dropped_empty: usize,
    pub dropped_duplicates: usize,
    /// Mapped columns the registry table does not have
    pub skipped_columns: Vec<String>,
    /// Sheet headers outside the field catalog
    pub unmapped_headers: Vec<String>,
    pub invalid_cells: usize,
    pub dry_run: bool,
}

/// Outcome of a migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Records read from the source
    pub read: usize,
    /// Records written to the target (or that would be, on a dry run)
    pub written: usize,
    /// Source records whose code collided with an earlier one after normalization
    pub collapsed_duplicates: usize,
    pub dry_run: bool,
}

/// Import a workbook or CSV export into the registry, picked by file extension
pub fn import_file(
    registry: &dyn Registry,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let sheet = if is_workbook(path) {
        Sheet::from_workbook(path, options.sheet.as_deref())?
    } else {
        if let Some(name) = &options.sheet {
            warn!(sheet = %name, path = %path.display(), "not a workbook; worksheet name ignored");
        }
        Sheet::from_path(path, options.delimiter)?
    };
    debug!(path = %path.display(), rows = sheet.rows().len(), "read sheet");
    import_sheet(registry, &sheet, options)
}

/// Map, dedup and insert an already-read sheet
pub fn import_sheet(
    registry: &dyn Registry,
    sheet: &Sheet,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let table = map_sheet(sheet)?;
    let unmapped_headers = table.unmapped_headers.clone();
    let invalid_cells = table.invalid_cells;

    let batch = dedup(table, Utc::now());
    let mut report = import_batch(registry, &batch, options.dry_run)?;
    report.unmapped_headers = unmapped_headers;
    report.invalid_cells = invalid_cells;
    Ok(report)
}

/// Insert a batch, leaving every existing record untouched.
///
/// Only columns present in the registry table are written. The insert runs
/// in one transaction, so a failure leaves the registry unchanged.
pub fn import_batch(
    registry: &dyn Registry,
    batch: &ImportBatch,
    dry_run: bool,
) -> Result<ImportReport, ImportError> {
    let existing = registry.columns()?;
    if !existing.iter().any(|c| c == CODE_COLUMN) {
        return Err(ImportError::RegistryMissingCode);
    }

    let mut wanted = vec![Column::Code];
    wanted.extend(batch.fields.iter().map(|f| Column::Attr(*f)));
    wanted.extend([
        Column::Verified,
        Column::VerifiedAt,
        Column::IsNew,
        Column::CreatedAt,
    ]);
    let columns = Column::present_in(&wanted, &existing);
    let skipped_columns: Vec<String> = wanted
        .iter()
        .filter(|c| !columns.contains(c))
        .map(|c| c.name().to_string())
        .collect();
    for column in &skipped_columns {
        warn!(%column, registry = %registry.describe(), "registry has no such column; values skipped");
    }

    let records: Vec<AssetRecord> = batch
        .rows
        .iter()
        .map(|row| {
            let mut record = AssetRecord::new(row.code.clone());
            record.attributes = row.attributes.clone();
            record.created_at = Some(batch.created_at.clone());
            record
        })
        .collect();

    let accepted = if dry_run {
        let registered: HashSet<_> = registry
            .fetch_all()?
            .into_iter()
            .map(|r| r.code)
            .collect();
        records.iter().filter(|r| !registered.contains(&r.code)).count()
    } else {
        registry.insert_ignore(&columns, &records)?
    };

    let report = ImportReport {
        rows_read: batch.rows_read,
        accepted,
        ignored_existing: records.len().saturating_sub(accepted),
        dropped_empty: batch.dropped_empty,
        dropped_duplicates: batch.dropped_duplicates,
        skipped_columns,
        dry_run,
        ..Default::default()
    };
    info!(
        registry = %registry.describe(),
        rows_read = report.rows_read,
        accepted = report.accepted,
        ignored_existing = report.ignored_existing,
        dry_run,
        "import finished"
    );
    Ok(report)
}

/// Copy every record of `source` into `target`, overwriting by code.
///
/// Records are normalized first (see [`normalize_for_migration`]). The
/// target write is one transaction.
pub fn migrate(
    source: &dyn Registry,
    target: &dyn Registry,
    dry_run: bool,
) -> Result<MigrationReport, ImportError> {
    let records = source.fetch_all()?;
    let read = records.len();
    let (records, collapsed_duplicates) = normalize_for_migration(records);

    let existing = target.columns()?;
    if !existing.iter().any(|c| c == CODE_COLUMN) {
        return Err(ImportError::RegistryMissingCode);
    }
    let columns = Column::present_in(&Column::all(), &existing);

    let written = if dry_run {
        records.len()
    } else {
        target.upsert_records(&columns, &records)?
    };

    info!(
        source = %source.describe(),
        target = %target.describe(),
        read,
        written,
        collapsed_duplicates,
        dry_run,
        "migration finished"
    );
    Ok(MigrationReport {
        read,
        written,
        collapsed_duplicates,
        dry_run,
    })
}

/// Prepare records read from one store for writing into another.
///
/// Dates are re-parsed into ISO form (unreadable ones become null),
/// verified records lose their `is_new` flag, and records whose code
/// collides with an earlier one are dropped. Returns the records and the
/// number dropped.
pub fn normalize_for_migration(records: Vec<AssetRecord>) -> (Vec<AssetRecord>, usize) {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(records.len());
    let mut collapsed = 0;

    for mut record in records {
        if !seen.insert(record.code.clone()) {
            warn!(code = %record.code, "duplicate code in source; keeping the first record");
            collapsed += 1;
            continue;
        }

        record.id = None;
        if let Some(raw) = record.attributes.text(Field::AcquiredOn) {
            let parsed = parse_date_to_iso(&raw);
            if parsed.is_none() {
                warn!(code = %record.code, value = %raw, "unreadable acquisition date dropped");
            }
            record
                .attributes
                .set(Field::AcquiredOn, parsed.map(FieldValue::Text));
        }
        record.verified_at = record
            .verified_at
            .as_deref()
            .and_then(parse_date_to_iso)
            .map(|iso| iso.chars().take(10).collect());
        record.created_at = record.created_at.as_deref().and_then(normalize_timestamp);
        if record.verified {
            record.is_new = false;
        }

        normalized.push(record);
    }

    (normalized, collapsed)
}

/// RFC 3339 UTC with second precision; naive times are taken as UTC
fn normalize_timestamp(raw: &str) -> Option<String> {
    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    let raw = raw.trim();

    let utc = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            parse_date_to_iso(raw)
                .and_then(|iso| chrono::NaiveDate::parse_from_str(&iso[..10], "%Y-%m-%d").ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;

    Some(utc.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::code::AssetCode;
    use crate::core::record::NewAsset;
    use crate::core::registry::{InsertOutcome, SqliteRegistry};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn registry() -> SqliteRegistry {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        registry.ensure_schema().unwrap();
        registry
    }

    fn sheet(rows: &[&[&str]]) -> Sheet {
        Sheet::from_rows(
            ["Codigo", "Nombre del Bien", "Fecha", "VIDA UTIL EN MESES"],
            rows.iter().map(|r| r.iter().copied()),
        )
    }

    fn code(s: &str) -> AssetCode {
        AssetCode::parse(s).unwrap()
    }

    fn run(registry: &dyn Registry, sheet: &Sheet) -> ImportReport {
        import_sheet(registry, sheet, &ImportOptions::default()).unwrap()
    }

    #[test]
    fn test_case_variants_import_as_one_record() {
        let registry = registry();
        let report = run(
            &registry,
            &sheet(&[
                &["abc-1", "Silla", "05/03/2024", "60"],
                &["ABC-1", "Mesa", "", ""],
                &["", "Orphan", "", ""],
            ]),
        );
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.dropped_duplicates, 1);
        assert_eq!(report.dropped_empty, 1);

        let all = registry.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        let record = &all[0];
        assert_eq!(record.code.as_str(), "ABC-1");
        assert_eq!(record.text(Field::Name).as_deref(), Some("Silla"));
        assert_eq!(record.text(Field::AcquiredOn).as_deref(), Some("2024-03-05"));
        assert!(!record.verified && !record.is_new);
        assert!(record.verified_at.is_none());
        assert!(record.created_at.as_deref().is_some_and(|t| t.ends_with('Z')));
    }

    #[test]
    fn test_import_is_idempotent() {
        let registry = registry();
        let s = sheet(&[&["A-1", "Silla", "", ""], &["A-2", "Mesa", "", ""]]);
        assert_eq!(run(&registry, &s).accepted, 2);
        let before = registry.fetch_all().unwrap();

        let again = run(&registry, &s);
        assert_eq!(again.accepted, 0);
        assert_eq!(again.ignored_existing, 2);
        assert_eq!(registry.fetch_all().unwrap(), before);
    }

    #[test]
    fn test_reimport_never_clobbers_workflow_state() {
        let registry = registry();
        run(&registry, &sheet(&[&["A-1", "Silla", "", ""]]));
        registry
            .mark_verified(&code("a-1"), Some("ana"), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            .unwrap();
        registry.insert_new(&NewAsset::new(code("x-1"))).unwrap();

        let report = run(
            &registry,
            &sheet(&[&["a-1", "Renamed", "", ""], &["X-1", "Scanned", "", ""]]),
        );
        assert_eq!(report.accepted, 0);

        let a = registry.get_by_code(&code("A-1")).unwrap().unwrap();
        assert!(a.verified);
        assert_eq!(a.text(Field::Name).as_deref(), Some("Silla"));
        let x = registry.get_by_code(&code("X-1")).unwrap().unwrap();
        assert!(x.is_new);
        assert!(x.attributes.get(Field::Name).is_none());
    }

    #[test]
    fn test_missing_identity_column_writes_nothing() {
        let registry = registry();
        let s = Sheet::from_rows(["Nombre del Bien"], [["Silla"]]);
        let err = import_sheet(&registry, &s, &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ImportError::MissingRequiredColumn { .. }));
        assert_eq!(registry.stats().unwrap().total, 0);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let registry = registry();
        run(&registry, &sheet(&[&["A-1", "Silla", "", ""]]));

        let options = ImportOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = import_sheet(
            &registry,
            &sheet(&[&["A-1", "x", "", ""], &["A-2", "y", "", ""]]),
            &options,
        )
        .unwrap();
        assert!(report.dry_run);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.ignored_existing, 1);
        assert_eq!(registry.stats().unwrap().total, 1);
    }

    #[test]
    fn test_columns_missing_from_registry_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE assets (id INTEGER PRIMARY KEY, code TEXT UNIQUE, name TEXT);")
            .unwrap();
        let registry = SqliteRegistry::open(&path).unwrap();

        let report = run(&registry, &sheet(&[&["A-1", "Silla", "05/03/2024", "60"]]));
        assert_eq!(report.accepted, 1);
        assert!(report.skipped_columns.contains(&"acquired_on".to_string()));
        assert!(report.skipped_columns.contains(&"verified".to_string()));

        let a = registry.get_by_code(&code("a-1")).unwrap().unwrap();
        assert_eq!(a.text(Field::Name).as_deref(), Some("Silla"));
    }

    #[test]
    fn test_registry_without_code_column_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE assets (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        let registry = SqliteRegistry::open(&path).unwrap();

        let err = import_sheet(
            &registry,
            &sheet(&[&["A-1", "Silla", "", ""]]),
            &ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::RegistryMissingCode));
    }

    #[test]
    fn test_import_file_reads_semicolon_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventario.csv");
        fs::write(
            &path,
            "Codigo;Nombre del Bien; Valor sin iva ;Observaciones\nsld-001;Silla;1500;x\n",
        )
        .unwrap();
        let registry = registry();

        let report = import_file(&registry, &path, &ImportOptions::default()).unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.unmapped_headers, vec!["Observaciones".to_string()]);

        let found = registry.get_by_code(&code("  sld-001  ")).unwrap().unwrap();
        assert_eq!(found.attributes.get(Field::ValueNet), Some(&FieldValue::Real(1500.0)));
    }

    fn legacy_source(dir: &Path) -> SqliteRegistry {
        let path = dir.join("legacy.db");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE assets (
                    id INTEGER PRIMARY KEY, code TEXT, name TEXT, acquired_on TEXT,
                    verified INTEGER, verified_at TEXT, verified_by TEXT, is_new INTEGER,
                    created_at TEXT
                 );
                 INSERT INTO assets (code, name, acquired_on, verified, verified_at, is_new, created_at)
                 VALUES ('abc', 'Silla', '05/03/2024', 1, '06/03/2024 10:00:00', 1, '2024-03-05T10:30:00.123456');
                 INSERT INTO assets (code, name, acquired_on, verified, is_new)
                 VALUES ('abc ', 'Dup', NULL, 0, 0);
                 INSERT INTO assets (code, name, acquired_on, verified, is_new)
                 VALUES ('b-2', 'Mesa', 'not-a-date', 0, 1);",
            )
            .unwrap();
        SqliteRegistry::open(&path).unwrap()
    }

    #[test]
    fn test_migration_normalizes_and_collapses() {
        let dir = tempdir().unwrap();
        let source = legacy_source(dir.path());
        let target = registry();

        let report = migrate(&source, &target, false).unwrap();
        assert_eq!(report.read, 3);
        assert_eq!(report.collapsed_duplicates, 1);
        assert_eq!(report.written, 2);

        let abc = target.get_by_code(&code("abc")).unwrap().unwrap();
        assert_eq!(abc.text(Field::Name).as_deref(), Some("Silla"));
        assert_eq!(abc.text(Field::AcquiredOn).as_deref(), Some("2024-03-05"));
        assert_eq!(abc.verified_at.as_deref(), Some("2024-03-06"));
        assert_eq!(abc.created_at.as_deref(), Some("2024-03-05T10:30:00Z"));
        assert!(abc.verified);
        assert!(!abc.is_new);

        let b = target.get_by_code(&code("B-2")).unwrap().unwrap();
        assert!(b.attributes.get(Field::AcquiredOn).is_none());
        assert!(b.is_new);
    }

    #[test]
    fn test_migration_is_idempotent() {
        let dir = tempdir().unwrap();
        let source = legacy_source(dir.path());
        let target = registry();

        migrate(&source, &target, false).unwrap();
        let first: Vec<_> = target.fetch_all().unwrap();
        migrate(&source, &target, false).unwrap();
        let second = target.fetch_all().unwrap();

        assert_eq!(first, second);
        assert_eq!(target.stats().unwrap().total, 2);
    }

    #[test]
    fn test_migration_overwrites_where_import_does_not() {
        let source = registry();
        let target = registry();
        run(&target, &sheet(&[&["A-1", "Old name", "", ""]]));
        run(&source, &sheet(&[&["A-1", "New name", "", ""]]));
        source
            .mark_verified(&code("a-1"), None, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            .unwrap();

        // Re-importing never changes an existing record
        run(&target, &sheet(&[&["A-1", "New name", "", ""]]));
        let kept = target.get_by_code(&code("a-1")).unwrap().unwrap();
        assert_eq!(kept.text(Field::Name).as_deref(), Some("Old name"));

        // Migration replaces it wholesale
        migrate(&source, &target, false).unwrap();
        let replaced = target.get_by_code(&code("a-1")).unwrap().unwrap();
        assert_eq!(replaced.text(Field::Name).as_deref(), Some("New name"));
        assert!(replaced.verified);
        assert_eq!(replaced.verified_at.as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn test_migration_dry_run_writes_nothing() {
        let source = registry();
        let target = registry();
        run(&source, &sheet(&[&["A-1", "x", "", ""], &["A-2", "y", "", ""]]));

        let report = migrate(&source, &target, true).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.written, 2);
        assert_eq!(target.stats().unwrap().total, 0);
    }

    #[test]
    fn test_scanned_code_then_import_keeps_scan() {
        let registry = registry();
        assert_eq!(
            registry.insert_new(&NewAsset::new(code("x-9"))).unwrap(),
            InsertOutcome::Inserted
        );
        let report = run(&registry, &sheet(&[&["x-9", "Imported", "", ""]]));
        assert_eq!(report.ignored_existing, 1);
    }

    #[test]
    fn test_normalize_timestamp_forms() {
        assert_eq!(
            normalize_timestamp("2024-03-05T12:30:00+02:00").as_deref(),
            Some("2024-03-05T10:30:00Z")
        );
        assert_eq!(
            normalize_timestamp("2024-03-05 10:30:00").as_deref(),
            Some("2024-03-05T10:30:00Z")
        );
        assert_eq!(
            normalize_timestamp("05/03/2024").as_deref(),
            Some("2024-03-05T00:00:00Z")
        );
        assert_eq!(normalize_timestamp("soon"), None);
    }
}

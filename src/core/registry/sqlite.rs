//! SQLite registry backend

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Params};
use tracing::{debug, warn};

use super::schema::{sqlite_ddl, upsert_clause, Column, TABLE};
use super::{
    assemble_record, ListFilter, Registry, RegistryError, RegistryStats, StatusFilter,
};
use crate::core::code::AssetCode;
use crate::core::record::AssetRecord;
use crate::core::value::FieldValue;

/// Registry stored in a SQLite file
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteRegistry {
    /// Open or create a registry file, creating parent directories
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RegistryError::Connection(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(connection_error)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(connection_error)?;
        register_functions(&conn)?;

        debug!(path = %path.display(), "opened sqlite registry");
        Ok(Self {
            conn: Mutex::new(conn),
            label: format!("sqlite:{}", path.display()),
        })
    }

    /// Open an existing registry file read-only; a missing file is an error
    pub fn open_existing(path: &Path) -> Result<Self, RegistryError> {
        if !path.is_file() {
            return Err(RegistryError::Connection(format!(
                "registry file not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(connection_error)?;
        register_functions(&conn)?;

        debug!(path = %path.display(), "opened sqlite registry read-only");
        Ok(Self {
            conn: Mutex::new(conn),
            label: format!("sqlite:{}", path.display()),
        })
    }

    /// In-memory registry, mostly for tests
    pub fn open_in_memory() -> Result<Self, RegistryError> {
        let conn = Connection::open_in_memory().map_err(connection_error)?;
        register_functions(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            label: "sqlite::memory:".to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn
            .lock()
            .map_err(|e| RegistryError::Query(e.to_string()))
    }

    /// Write records with one prepared statement inside a transaction
    fn write(
        &self,
        columns: &[Column],
        records: &[AssetRecord],
        on_conflict: &str,
    ) -> Result<usize, RegistryError> {
        if records.is_empty() || columns.is_empty() {
            return Ok(0);
        }

        let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) {}",
            TABLE,
            names.join(", "),
            placeholders.join(", "),
            on_conflict
        );

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(query_error)?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql).map_err(query_error)?;
            for record in records {
                let values = columns.iter().map(|c| to_sql(c.value_of(record)));
                written += stmt.execute(params_from_iter(values)).map_err(query_error)?;
            }
        }
        tx.commit().map_err(query_error)?;

        Ok(written)
    }
}

impl Registry for SqliteRegistry {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn ensure_schema(&self) -> Result<(), RegistryError> {
        self.lock()?
            .execute_batch(&sqlite_ddl())
            .map_err(query_error)
    }

    fn columns(&self) -> Result<Vec<String>, RegistryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(query_error)?;
        let names = stmt
            .query_map(params![TABLE], |row| row.get::<_, String>(0))
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;
        Ok(names)
    }

    fn get_by_code(&self, code: &AssetCode) -> Result<Option<AssetRecord>, RegistryError> {
        let conn = self.lock()?;
        let sql = format!("SELECT * FROM {} WHERE code = ?1 LIMIT 1", TABLE);
        let mut records = query_records(&conn, &sql, params![code.as_str()])?;
        Ok(records.pop())
    }

    fn mark_verified(
        &self,
        code: &AssetCode,
        actor: Option<&str>,
        on: NaiveDate,
    ) -> Result<(), RegistryError> {
        let conn = self.lock()?;
        let sql = format!(
            "UPDATE {} SET verified = 1, is_new = 0, verified_at = ?1, \
             verified_by = COALESCE(?2, verified_by) WHERE code = ?3",
            TABLE
        );
        let changed = conn
            .execute(
                &sql,
                params![on.format("%Y-%m-%d").to_string(), actor, code.as_str()],
            )
            .map_err(query_error)?;

        if changed == 0 {
            return Err(RegistryError::NotFound(code.clone()));
        }
        Ok(())
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<AssetRecord>, RegistryError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        match filter.status {
            StatusFilter::All => {}
            StatusFilter::New => {
                clauses.push("COALESCE(is_new, 0) != 0 AND COALESCE(verified, 0) = 0")
            }
            StatusFilter::Verified => clauses.push("COALESCE(verified, 0) != 0"),
            StatusFilter::Unverified => clauses.push("COALESCE(verified, 0) = 0"),
        }
        if let Some(pattern) = filter.like_pattern() {
            clauses.push(concat!(
                r"(unicode_lower(code) LIKE ?1 ESCAPE '\'",
                r" OR unicode_lower(COALESCE(name, '')) LIKE ?1 ESCAPE '\')",
            ));
            values.push(Value::Text(pattern));
        }

        let mut sql = format!("SELECT * FROM {}", TABLE);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY COALESCE(is_new, 0) DESC, COALESCE(verified, 0) DESC, code ASC LIMIT {}",
            filter.limit
        ));

        let conn = self.lock()?;
        query_records(&conn, &sql, params_from_iter(values))
    }

    fn stats(&self) -> Result<RegistryStats, RegistryError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN COALESCE(verified, 0) != 0 THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN COALESCE(is_new, 0) != 0 AND COALESCE(verified, 0) = 0 \
             THEN 1 ELSE 0 END), 0) FROM {}",
            TABLE
        );
        conn.query_row(&sql, [], |row| {
            Ok(RegistryStats {
                total: row.get::<_, i64>(0)? as u64,
                verified: row.get::<_, i64>(1)? as u64,
                new: row.get::<_, i64>(2)? as u64,
            })
        })
        .map_err(query_error)
    }

    fn insert_ignore(&self, columns: &[Column], records: &[AssetRecord]) -> Result<usize, RegistryError> {
        let inserted = self.write(columns, records, "ON CONFLICT(code) DO NOTHING")?;
        debug!(registry = %self.label, inserted, offered = records.len(), "insert-or-ignore");
        Ok(inserted)
    }

    fn fetch_all(&self) -> Result<Vec<AssetRecord>, RegistryError> {
        let conn = self.lock()?;
        let sql = format!("SELECT * FROM {} ORDER BY code ASC", TABLE);
        query_records(&conn, &sql, [])
    }

    fn upsert_records(&self, columns: &[Column], records: &[AssetRecord]) -> Result<usize, RegistryError> {
        let written = self.write(columns, records, &upsert_clause(columns))?;
        debug!(registry = %self.label, written, "upsert");
        Ok(written)
    }
}

/// Run a `SELECT` over the registry table and assemble records by column name
fn query_records<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<AssetRecord>, RegistryError> {
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let layout: Vec<Option<Column>> = stmt
        .column_names()
        .iter()
        .map(|name| Column::from_name(name))
        .collect();
    let id_idx = stmt.column_names().iter().position(|name| *name == "id");

    let rows = stmt
        .query_map(params, |row| {
            let id = match id_idx {
                Some(idx) => row.get::<_, Option<i64>>(idx).ok().flatten(),
                None => None,
            };
            let mut cells = Vec::with_capacity(layout.len());
            for (idx, column) in layout.iter().enumerate() {
                if let Some(column) = column {
                    cells.push((*column, from_sql(row.get_ref(idx)?)));
                }
            }
            Ok((id, cells))
        })
        .map_err(query_error)?;

    let mut records = Vec::new();
    for row in rows {
        let (id, cells) = row.map_err(query_error)?;
        match assemble_record(id, cells) {
            Some(record) => records.push(record),
            None => warn!(?id, "skipping registry row without a usable code"),
        }
    }
    Ok(records)
}

/// `unicode_lower(text)`: full Unicode lowercase, unlike the ASCII-only `LOWER`
fn register_functions(conn: &Connection) -> Result<(), RegistryError> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .map_err(connection_error)
}

fn to_sql(value: Option<FieldValue>) -> Value {
    match value {
        None => Value::Null,
        Some(FieldValue::Text(s)) => Value::Text(s),
        Some(FieldValue::Integer(i)) => Value::Integer(i),
        Some(FieldValue::Real(f)) => Value::Real(f),
    }
}

fn from_sql(value: ValueRef<'_>) -> Option<FieldValue> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(FieldValue::Integer(i)),
        ValueRef::Real(f) => Some(FieldValue::Real(f)),
        ValueRef::Text(bytes) => Some(FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())),
    }
}

fn connection_error(e: rusqlite::Error) -> RegistryError {
    RegistryError::Connection(e.to_string())
}

fn query_error(e: rusqlite::Error) -> RegistryError {
    RegistryError::Query(e.to_string())
}

//! Registry table layout shared by both backends

use crate::core::record::{AssetRecord, Field, FieldKind, CODE_COLUMN};
use crate::core::value::FieldValue;

/// Registry table name
pub const TABLE: &str = "assets";

/// Storage type of a column, mapped per backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Date,
    Boolean,
    Timestamp,
}

impl SqlType {
    /// Declared type in SQLite.
    ///
    /// Integer attributes are `ANY` so a value too large for a 64-bit
    /// integer stays the exact text it was stored as.
    pub fn sqlite(&self) -> &'static str {
        match self {
            SqlType::Text | SqlType::Date | SqlType::Timestamp => "TEXT",
            SqlType::Integer => "ANY",
            SqlType::Real => "REAL",
            SqlType::Boolean => "INTEGER",
        }
    }

    /// Declared type in Postgres.
    ///
    /// Integer attributes are `NUMERIC` for the same reason.
    pub fn postgres(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "NUMERIC",
            SqlType::Real => "DOUBLE PRECISION",
            SqlType::Date => "DATE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamp => "TIMESTAMPTZ",
        }
    }
}

/// A column of the registry table other than the surrogate `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Code,
    Attr(Field),
    Verified,
    VerifiedAt,
    VerifiedBy,
    IsNew,
    CreatedAt,
}

impl Column {
    /// Every column in table order
    pub fn all() -> Vec<Column> {
        let mut columns = vec![Column::Code];
        columns.extend(Field::all().iter().copied().map(Column::Attr));
        columns.extend([
            Column::Verified,
            Column::VerifiedAt,
            Column::VerifiedBy,
            Column::IsNew,
            Column::CreatedAt,
        ]);
        columns
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::Code => CODE_COLUMN,
            Column::Attr(field) => field.column(),
            Column::Verified => "verified",
            Column::VerifiedAt => "verified_at",
            Column::VerifiedBy => "verified_by",
            Column::IsNew => "is_new",
            Column::CreatedAt => "created_at",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        match name {
            CODE_COLUMN => Some(Column::Code),
            "verified" => Some(Column::Verified),
            "verified_at" => Some(Column::VerifiedAt),
            "verified_by" => Some(Column::VerifiedBy),
            "is_new" => Some(Column::IsNew),
            "created_at" => Some(Column::CreatedAt),
            other => Field::from_column(other).map(Column::Attr),
        }
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            Column::Code | Column::VerifiedBy => SqlType::Text,
            Column::Attr(field) => match field.kind() {
                FieldKind::Text => SqlType::Text,
                FieldKind::Integer => SqlType::Integer,
                FieldKind::Real => SqlType::Real,
                FieldKind::Date => SqlType::Date,
            },
            Column::Verified | Column::IsNew => SqlType::Boolean,
            Column::VerifiedAt => SqlType::Date,
            Column::CreatedAt => SqlType::Timestamp,
        }
    }

    /// Value to write for a record; flags become 0/1
    pub fn value_of(&self, record: &AssetRecord) -> Option<FieldValue> {
        match self {
            Column::Code => Some(FieldValue::from(record.code.as_str())),
            Column::Attr(field) => record.attributes.get(*field).cloned(),
            Column::Verified => Some(FieldValue::Integer(record.verified as i64)),
            Column::VerifiedAt => record.verified_at.clone().map(FieldValue::Text),
            Column::VerifiedBy => record.verified_by.clone().map(FieldValue::Text),
            Column::IsNew => Some(FieldValue::Integer(record.is_new as i64)),
            Column::CreatedAt => record.created_at.clone().map(FieldValue::Text),
        }
    }

    /// Keep the columns whose names appear in `existing`
    pub fn present_in(columns: &[Column], existing: &[String]) -> Vec<Column> {
        columns
            .iter()
            .copied()
            .filter(|c| existing.iter().any(|e| e == c.name()))
            .collect()
    }
}

/// Columns written when registering a scanned code
pub fn new_asset_columns() -> Vec<Column> {
    vec![
        Column::Code,
        Column::Attr(Field::Name),
        Column::Attr(Field::Family),
        Column::Attr(Field::Responsible),
        Column::Attr(Field::Facility),
        Column::Verified,
        Column::IsNew,
        Column::CreatedAt,
    ]
}

/// `ON CONFLICT` clause overwriting every non-key column
pub fn upsert_clause(columns: &[Column]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .filter(|c| **c != Column::Code)
        .map(|c| format!("{0} = excluded.{0}", c.name()))
        .collect();
    if assignments.is_empty() {
        "ON CONFLICT(code) DO NOTHING".to_string()
    } else {
        format!("ON CONFLICT(code) DO UPDATE SET {}", assignments.join(", "))
    }
}

/// `CREATE TABLE` for SQLite
pub fn sqlite_ddl() -> String {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT",
        TABLE
    );
    for column in Column::all() {
        let decl = match column {
            Column::Code => "TEXT NOT NULL UNIQUE".to_string(),
            Column::Verified | Column::IsNew => "INTEGER NOT NULL DEFAULT 0".to_string(),
            other => other.sql_type().sqlite().to_string(),
        };
        ddl.push_str(&format!(",\n    {} {}", column.name(), decl));
    }
    ddl.push_str(&format!(
        "\n) STRICT;\nCREATE UNIQUE INDEX IF NOT EXISTS idx_{0}_code ON {0}(code);\n",
        TABLE
    ));
    ddl
}

/// `CREATE TABLE` for Postgres
pub fn postgres_ddl() -> Vec<String> {
    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id BIGSERIAL PRIMARY KEY",
        TABLE
    );
    for column in Column::all() {
        let decl = match column {
            Column::Code => "TEXT NOT NULL UNIQUE".to_string(),
            Column::Verified | Column::IsNew => "BOOLEAN NOT NULL DEFAULT FALSE".to_string(),
            other => other.sql_type().postgres().to_string(),
        };
        ddl.push_str(&format!(",\n    {} {}", column.name(), decl));
    }
    ddl.push_str("\n)");
    vec![
        ddl,
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{0}_code ON {0}(code)",
            TABLE
        ),
    ]
}

//! Asset record model and the field catalog
//!
//! The catalog ties each registry column to its storage kind and to the
//! spreadsheet headers it is imported from. Import, both registry backends
//! and migration are all driven by it.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::code::AssetCode;
use crate::core::value::FieldValue;

/// Registry column holding the natural key
pub const CODE_COLUMN: &str = "code";

/// Spreadsheet headers recognized for the identity column
pub const CODE_HEADERS: &[&str] = &["Codigo", "Código", CODE_COLUMN];

/// Workflow columns, written by the interactive actions and by migration
pub const WORKFLOW_COLUMNS: &[&str] = &[
    "verified",
    "verified_at",
    "verified_by",
    "is_new",
    "created_at",
];

/// How a field is stored and coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Kept verbatim; never numerically re-interpreted
    Text,
    Integer,
    Real,
    /// ISO calendar date (or date-time) text
    Date,
}

impl FieldKind {
    /// Re-type a stored or raw value to this kind.
    ///
    /// Returns `None` for blank text and for text a numeric kind cannot
    /// read. Date text is passed through; reformatting it is up to the
    /// import pipeline.
    pub fn conform(&self, value: FieldValue) -> Option<FieldValue> {
        match (self, value) {
            (FieldKind::Text | FieldKind::Date, FieldValue::Text(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| FieldValue::Text(s.to_string()))
            }
            (FieldKind::Text | FieldKind::Date, v) => Some(FieldValue::Text(v.to_string())),
            (FieldKind::Integer, FieldValue::Text(s)) => FieldValue::parse_integer(&s),
            (FieldKind::Integer, v) => Some(v),
            (FieldKind::Real, FieldValue::Text(s)) => {
                FieldValue::parse_real(&s).map(FieldValue::Real)
            }
            (FieldKind::Real, FieldValue::Integer(i)) => Some(FieldValue::Real(i as f64)),
            (FieldKind::Real, v) => Some(v),
        }
    }
}

/// Descriptive, provenance, lifecycle and financial attributes of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    CasCode,
    Name,
    Subfamily,
    Family,
    Denomination,
    Account,
    Brand,
    Model,
    Serial,
    Description,
    Origin,
    Responsible,
    Dependency,
    Facility,
    Unit,
    AcquiredOn,
    Status,
    ValueNet,
    ValueGross,
    PurchaseOrder,
    InUse,
    ControlType,
    UsefulLifeYears,
    UsefulLifeMonths,
    UsefulLifeCgrMonths,
    LifeConsumedMonths,
    LifeRemainingMonths,
    MonthlyDepreciation,
    AccumulatedDepreciation,
    BookValue,
}

impl Field {
    /// All fields in registry column order
    pub fn all() -> &'static [Field] {
        &[
            Field::CasCode,
            Field::Name,
            Field::Subfamily,
            Field::Family,
            Field::Denomination,
            Field::Account,
            Field::Brand,
            Field::Model,
            Field::Serial,
            Field::Description,
            Field::Origin,
            Field::Responsible,
            Field::Dependency,
            Field::Facility,
            Field::Unit,
            Field::AcquiredOn,
            Field::Status,
            Field::ValueNet,
            Field::ValueGross,
            Field::PurchaseOrder,
            Field::InUse,
            Field::ControlType,
            Field::UsefulLifeYears,
            Field::UsefulLifeMonths,
            Field::UsefulLifeCgrMonths,
            Field::LifeConsumedMonths,
            Field::LifeRemainingMonths,
            Field::MonthlyDepreciation,
            Field::AccumulatedDepreciation,
            Field::BookValue,
        ]
    }

    /// Registry column name
    pub fn column(&self) -> &'static str {
        match self {
            Field::CasCode => "cas_code",
            Field::Name => "name",
            Field::Subfamily => "subfamily",
            Field::Family => "family",
            Field::Denomination => "denomination",
            Field::Account => "account",
            Field::Brand => "brand",
            Field::Model => "model",
            Field::Serial => "serial",
            Field::Description => "description",
            Field::Origin => "origin",
            Field::Responsible => "responsible",
            Field::Dependency => "dependency",
            Field::Facility => "facility",
            Field::Unit => "unit",
            Field::AcquiredOn => "acquired_on",
            Field::Status => "status",
            Field::ValueNet => "value_net",
            Field::ValueGross => "value_gross",
            Field::PurchaseOrder => "purchase_order",
            Field::InUse => "in_use",
            Field::ControlType => "control_type",
            Field::UsefulLifeYears => "useful_life_years",
            Field::UsefulLifeMonths => "useful_life_months",
            Field::UsefulLifeCgrMonths => "useful_life_cgr_months",
            Field::LifeConsumedMonths => "life_consumed_months",
            Field::LifeRemainingMonths => "life_remaining_months",
            Field::MonthlyDepreciation => "monthly_depreciation",
            Field::AccumulatedDepreciation => "accumulated_depreciation",
            Field::BookValue => "book_value",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::AcquiredOn => FieldKind::Date,
            Field::ValueNet
            | Field::ValueGross
            | Field::MonthlyDepreciation
            | Field::AccumulatedDepreciation
            | Field::BookValue => FieldKind::Real,
            Field::UsefulLifeYears
            | Field::UsefulLifeMonths
            | Field::UsefulLifeCgrMonths
            | Field::LifeConsumedMonths
            | Field::LifeRemainingMonths => FieldKind::Integer,
            _ => FieldKind::Text,
        }
    }

    /// External spreadsheet headers this field is imported from.
    ///
    /// Matching trims whitespace and ignores case, so stray padding in the
    /// source sheet (`" Valor sin iva "`) still matches.
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Field::CasCode => &["Codigo CAS-CHILE"],
            Field::Name => &["Nombre del Bien"],
            Field::Subfamily => &["Subfamilia"],
            Field::Family => &["Familia"],
            Field::Denomination => &["Denominación", "Denominacion"],
            Field::Account => &["Cuenta Contable"],
            Field::Brand => &["Marca"],
            Field::Model => &["Modelo"],
            Field::Serial => &["Serie"],
            Field::Description => &["Descripcion", "Descripción"],
            Field::Origin => &["Origen"],
            Field::Responsible => &["Responsable"],
            Field::Dependency => &["Dependencia"],
            Field::Facility => &["Establecimiento"],
            Field::Unit => &["Unidad"],
            Field::AcquiredOn => &["Fecha"],
            Field::Status => &["Estado"],
            Field::ValueNet => &["Valor sin iva"],
            Field::ValueGross => &["Valor con iva"],
            Field::PurchaseOrder => &["OCompra"],
            Field::InUse => &["En Uso"],
            Field::ControlType => &["TIPO DE CONTROL"],
            Field::UsefulLifeYears => &["VIDA UTIL EN AÑOS S/CGR"],
            Field::UsefulLifeMonths => &["VIDA UTIL EN MESES"],
            Field::UsefulLifeCgrMonths => &["VIDA UTIL SEGÚN CRITERIO CGR EN MESES"],
            Field::LifeConsumedMonths => &["VIDA UTIL INSUMIDA EN MESES"],
            // The source sheets misspell RESTANTE
            Field::LifeRemainingMonths => {
                &["VIDA UTIL RETANTE EN MESES", "VIDA UTIL RESTANTE EN MESES"]
            }
            Field::MonthlyDepreciation => &["DEPRECIACION MENSUAL"],
            Field::AccumulatedDepreciation => &["DEPRECIACION ACUMULADA"],
            Field::BookValue => &["VALOR LIBRO"],
        }
    }

    /// Look up a field by registry column name
    pub fn from_column(column: &str) -> Option<Field> {
        Self::all().iter().copied().find(|f| f.column() == column)
    }

    /// Whether an external header names this field (its column name included)
    pub fn matches_header(&self, header: &str) -> bool {
        header_matches(header, self.column())
            || self.headers().iter().any(|h| header_matches(header, h))
    }
}

/// Compare headers ignoring surrounding whitespace and case
pub fn header_matches(header: &str, expected: &str) -> bool {
    header.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Attribute values keyed by field, in catalog order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(BTreeMap<Field, FieldValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.0.get(&field)
    }

    /// Text form of a value, whatever its kind
    pub fn text(&self, field: Field) -> Option<String> {
        self.0.get(&field).map(|v| v.to_string())
    }

    /// Set a value; `None` removes it
    pub fn set(&mut self, field: Field, value: Option<FieldValue>) {
        match value {
            Some(v) => {
                self.0.insert(field, v);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.0.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field.column(), value)?;
        }
        map.end()
    }
}

/// Where a record sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    /// Loaded by a batch import with full descriptive fields
    Imported,
    /// Registered from a scan of an unknown code, minimal fields
    ScannedUnknown,
    /// Physically verified; terminal
    Verified,
}

impl AssetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetState::Imported => "imported",
            AssetState::ScannedUnknown => "new",
            AssetState::Verified => "verified",
        }
    }
}

/// One row of the asset registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRecord {
    /// Surrogate key assigned by the storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub code: AssetCode,
    #[serde(flatten)]
    pub attributes: Attributes,
    pub verified: bool,
    /// ISO date of the verification
    pub verified_at: Option<String>,
    pub verified_by: Option<String>,
    pub is_new: bool,
    /// RFC 3339 UTC timestamp, second precision
    pub created_at: Option<String>,
}

impl AssetRecord {
    /// A record with no attributes and all flags cleared
    pub fn new(code: AssetCode) -> Self {
        Self {
            id: None,
            code,
            attributes: Attributes::new(),
            verified: false,
            verified_at: None,
            verified_by: None,
            is_new: false,
            created_at: None,
        }
    }

    pub fn state(&self) -> AssetState {
        if self.verified {
            AssetState::Verified
        } else if self.is_new {
            AssetState::ScannedUnknown
        } else {
            AssetState::Imported
        }
    }

    /// Text form of an attribute
    pub fn text(&self, field: Field) -> Option<String> {
        self.attributes.text(field)
    }
}

/// Minimal fields captured when registering an unknown scanned code
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub code: AssetCode,
    pub name: Option<String>,
    pub family: Option<String>,
    pub responsible: Option<String>,
    pub facility: Option<String>,
}

impl NewAsset {
    pub fn new(code: AssetCode) -> Self {
        Self {
            code,
            name: None,
            family: None,
            responsible: None,
            facility: None,
        }
    }

    /// The populated fields, blank strings dropped
    pub fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        for (field, value) in [
            (Field::Name, &self.name),
            (Field::Family, &self.family),
            (Field::Responsible, &self.responsible),
            (Field::Facility, &self.facility),
        ] {
            let value = value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(FieldValue::from);
            attrs.set(field, value);
        }
        attrs
    }
}

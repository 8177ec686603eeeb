//! Core module - asset codes, records, configuration and registry storage

pub mod code;
pub mod config;
pub mod project;
pub mod record;
pub mod registry;
pub mod value;

pub use code::{normalize_code, AssetCode, CodeError};
pub use config::{Backend, Config, ConfigError};
pub use project::{Project, ProjectError};
pub use record::{AssetRecord, AssetState, Attributes, Field, FieldKind, NewAsset};
pub use registry::{
    open_registry, open_source_registry, InsertOutcome, ListFilter, Registry, RegistryError,
    RegistryStats, StatusFilter, StoreLocator,
};
pub use value::FieldValue;

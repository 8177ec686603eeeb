//! Shared helper functions for CLI commands
//!
//! Workspace/config resolution and small formatting helpers used across
//! command modules.

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::code::AssetCode;
use crate::core::registry::{open_registry, Registry, StoreLocator};
use crate::core::{Config, Project};

/// Workspace and configuration resolved for one command
pub struct Context {
    pub project: Option<Project>,
    pub config: Config,
    database: Option<String>,
}

impl Context {
    /// Discover the workspace (or use `--project`) and load configuration.
    ///
    /// A missing workspace is not an error here; commands that need the
    /// default SQLite registry fail later with a hint.
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Some(Project::discover_from(path).map_err(|e| miette::miette!("{}", e))?),
            None => Project::discover().ok(),
        };
        let config = Config::load(project.as_ref())?;
        Ok(Self {
            project,
            config,
            database: global.database.clone(),
        })
    }

    /// `--database` if given, else the configured registry
    pub fn locator(&self) -> Result<StoreLocator> {
        if let Some(database) = &self.database {
            return Ok(database.parse::<StoreLocator>()?);
        }
        Ok(self.config.registry_locator(self.project.as_ref())?)
    }

    /// Open the registry and create its table if missing
    pub fn registry(&self) -> Result<Box<dyn Registry>> {
        let locator = self.locator()?;
        open_with_schema(&locator)
    }
}

/// Open a registry and make sure its table exists
pub fn open_with_schema(locator: &StoreLocator) -> Result<Box<dyn Registry>> {
    let registry = open_registry(locator)?;
    registry.ensure_schema()?;
    tracing::debug!(registry = %registry.describe(), "registry ready");
    Ok(registry)
}

/// Parse a code argument, normalizing it
pub fn parse_code(raw: &str) -> Result<AssetCode> {
    AssetCode::parse(raw).map_err(|e| miette::miette!("invalid asset code '{}': {}", raw, e))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

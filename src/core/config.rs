//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::core::registry::{PgTarget, StoreLocator};
use crate::core::Project;

/// Which store holds the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Postgres,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(ConfigError::InvalidValue {
                key: "backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Postgres connection settings, either a URL or separate parts
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub sslmode: Option<String>,
}

/// AIT configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry backend (default: sqlite)
    pub backend: Option<Backend>,

    /// SQLite registry file; relative paths resolve against the workspace
    pub database: Option<PathBuf>,

    pub postgres: PostgresConfig,

    /// Recorded as `verified_by` when verifying
    pub actor: Option<String>,

    /// Default cap for `ait list`
    pub list_limit: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/ait/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.ait/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. .env file, then the environment
        load_dotenv(project);
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        Self::parse(&contents, path)
    }

    /// Parse config YAML; a file with only comments is no config at all
    fn parse(contents: &str, path: &Path) -> Option<Config> {
        let has_content = contents
            .lines()
            .map(str::trim)
            .any(|l| !l.is_empty() && !l.starts_with('#'));
        if !has_content {
            return None;
        }
        match serde_yml::from_str::<Config>(contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ait")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.backend.is_some() {
            self.backend = other.backend;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.actor.is_some() {
            self.actor = other.actor;
        }
        if other.list_limit.is_some() {
            self.list_limit = other.list_limit;
        }

        let pg = other.postgres;
        let mine = &mut self.postgres;
        if pg.url.is_some() {
            mine.url = pg.url;
        }
        if pg.host.is_some() {
            mine.host = pg.host;
        }
        if pg.port.is_some() {
            mine.port = pg.port;
        }
        if pg.dbname.is_some() {
            mine.dbname = pg.dbname;
        }
        if pg.user.is_some() {
            mine.user = pg.user;
        }
        if pg.password.is_some() {
            mine.password = pg.password;
        }
        if pg.sslmode.is_some() {
            mine.sslmode = pg.sslmode;
        }
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("AIT_BACKEND") {
            self.backend = Some(backend.parse()?);
        }
        if let Some(database) = get("AIT_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(actor) = get("AIT_ACTOR") {
            self.actor = Some(actor);
        }

        let pg = &mut self.postgres;
        if let Some(url) = get("PG_URL") {
            pg.url = Some(url);
        }
        if let Some(host) = get("PG_HOST") {
            pg.host = Some(host);
        }
        if let Some(port) = get("PG_PORT") {
            let parsed = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PG_PORT".to_string(),
                value: port.clone(),
            })?;
            pg.port = Some(parsed);
        }
        if let Some(dbname) = get("PG_DB") {
            pg.dbname = Some(dbname);
        }
        if let Some(user) = get("PG_USER") {
            pg.user = Some(user);
        }
        if let Some(password) = get("PG_PASSWORD") {
            pg.password = Some(password);
        }
        if let Some(sslmode) = get("PG_SSLMODE") {
            pg.sslmode = Some(sslmode);
        }

        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    /// The configured registry location
    pub fn registry_locator(&self, project: Option<&Project>) -> Result<StoreLocator, ConfigError> {
        match self.backend() {
            Backend::Sqlite => self.sqlite_path(project).map(StoreLocator::Sqlite),
            Backend::Postgres => self.postgres_target().map(StoreLocator::Postgres),
        }
    }

    /// SQLite registry file: `database` if set, else the workspace default
    pub fn sqlite_path(&self, project: Option<&Project>) -> Result<PathBuf, ConfigError> {
        match (&self.database, project) {
            (Some(path), Some(project)) if path.is_relative() => Ok(project.root().join(path)),
            (Some(path), _) => Ok(path.clone()),
            (None, Some(project)) => Ok(project.registry_path()),
            (None, None) => Err(ConfigError::NoWorkspace),
        }
    }

    /// Postgres connection settings.
    ///
    /// Fails with [`ConfigError::MissingSecrets`] naming every missing key
    /// when neither a URL nor the full set of parts is configured.
    pub fn postgres_target(&self) -> Result<PgTarget, ConfigError> {
        let pg = &self.postgres;
        if let Some(url) = &pg.url {
            return Ok(PgTarget::Url(url.clone()));
        }

        let missing: Vec<String> = [
            ("PG_HOST", pg.host.is_none()),
            ("PG_PORT", pg.port.is_none()),
            ("PG_DB", pg.dbname.is_none()),
            ("PG_USER", pg.user.is_none()),
            ("PG_PASSWORD", pg.password.is_none()),
            ("PG_SSLMODE", pg.sslmode.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| key.to_string())
        .collect();

        match (&pg.host, pg.port, &pg.dbname, &pg.user, &pg.password) {
            (Some(host), Some(port), Some(dbname), Some(user), Some(password))
                if missing.is_empty() =>
            {
                Ok(PgTarget::Parts {
                    host: host.clone(),
                    port,
                    dbname: dbname.clone(),
                    user: user.clone(),
                    password: password.clone(),
                    sslmode: pg.sslmode.clone(),
                })
            }
            _ => Err(ConfigError::MissingSecrets(missing)),
        }
    }
}

/// Load `.env` from the workspace root, falling back to the usual search
fn load_dotenv(project: Option<&Project>) {
    if let Some(path) = project.map(|p| p.root().join(".env")) {
        if path.is_file() {
            let _ = dotenvy::from_path(&path);
            return;
        }
    }
    let _ = dotenvy::dotenv();
}

/// Errors that can occur while resolving configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("postgres connection settings missing: {}", .0.join(", "))]
    #[diagnostic(
        code(ait::config::missing_secrets),
        help("set PG_URL, or every PG_* variable, in the environment, .env or .ait/config.yaml")
    )]
    MissingSecrets(Vec<String>),

    #[error("invalid value for {key}: '{value}'")]
    #[diagnostic(code(ait::config::invalid_value))]
    InvalidValue { key: String, value: String },

    #[error("no registry configured and no workspace found")]
    #[diagnostic(
        code(ait::config::no_workspace),
        help("run 'ait init', pass --project, or pass --database")
    )]
    NoWorkspace,
}

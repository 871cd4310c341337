use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::pricing::UnitsPolicy;

/// Candidate config files, checked in order when no explicit path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["estimator.toml", "config/estimator.toml"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub document: DocumentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// TOML catalog file; the built-in catalog is used when unset.
    pub path: Option<PathBuf>,
    pub units_policy: UnitsPolicy,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    pub pdf_enabled: bool,
    pub company_name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Values set by the caller, applied after the file and environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub pdf_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("config file references `${{{var}}}` but it is not set")]
    MissingEnvInterpolation { var: String },
    #[error("`${{` in config file is never closed")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://estimator.db?mode=rwc".to_string(),
            max_connections: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), port: 8080, graceful_shutdown_secs: 15 }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self { pdf_enabled: true, company_name: "Multi-Service Estimator".to_string() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::default() }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl FromStr for UnitsPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_wins" => Ok(Self::LastWins),
            "sum" => Ok(Self::Sum),
            other => Err(ConfigError::Validation(format!(
                "unsupported units policy `{other}` (expected last_wins|sum)"
            ))),
        }
    }
}

impl AppConfig {
    /// Layers defaults, the TOML file, `ESTIMATOR_*` variables and explicit
    /// overrides, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match locate_file(options.config_path.as_deref()) {
            Some(path) => Self::from_file(&path)?,
            None if options.require_file => {
                let expected = options
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    /// Reads one config file. Missing sections and keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
        let expanded = expand_env_references(&raw)?;
        toml::from_str(&expanded)
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        set_from_env(&mut self.database.url, "ESTIMATOR_DATABASE_URL")?;
        set_from_env(&mut self.database.max_connections, "ESTIMATOR_DATABASE_MAX_CONNECTIONS")?;
        set_from_env(&mut self.database.timeout_secs, "ESTIMATOR_DATABASE_TIMEOUT_SECS")?;
        set_from_env(&mut self.server.bind_address, "ESTIMATOR_SERVER_BIND_ADDRESS")?;
        set_from_env(&mut self.server.port, "ESTIMATOR_SERVER_PORT")?;
        set_from_env(
            &mut self.server.graceful_shutdown_secs,
            "ESTIMATOR_SERVER_GRACEFUL_SHUTDOWN_SECS",
        )?;
        if let Some(path) = env_value::<PathBuf>("ESTIMATOR_CATALOG_PATH")? {
            self.catalog.path = Some(path);
        }
        set_from_env(&mut self.catalog.units_policy, "ESTIMATOR_CATALOG_UNITS_POLICY")?;
        set_from_env(&mut self.document.pdf_enabled, "ESTIMATOR_DOCUMENT_PDF_ENABLED")?;
        set_from_env(&mut self.document.company_name, "ESTIMATOR_DOCUMENT_COMPANY_NAME")?;

        // The long names win over the short aliases.
        for key in ["ESTIMATOR_LOG_LEVEL", "ESTIMATOR_LOGGING_LEVEL"] {
            set_from_env(&mut self.logging.level, key)?;
        }
        for key in ["ESTIMATOR_LOG_FORMAT", "ESTIMATOR_LOGGING_FORMAT"] {
            set_from_env(&mut self.logging.format, key)?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        replace(&mut self.database.url, overrides.database_url);
        replace(&mut self.logging.level, overrides.log_level);
        if overrides.catalog_path.is_some() {
            self.catalog.path = overrides.catalog_path;
        }
        replace(&mut self.server.bind_address, overrides.bind_address);
        replace(&mut self.server.port, overrides.port);
        replace(&mut self.document.pdf_enabled, overrides.pdf_enabled);
    }

    /// Reports every problem at once so a broken file can be fixed in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let url = self.database.url.trim();
        if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
            problems.push(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                    .to_string(),
            );
        }
        if self.database.max_connections == 0 {
            problems.push("database.max_connections must be greater than zero".to_string());
        }
        if !(1..=300).contains(&self.database.timeout_secs) {
            problems.push("database.timeout_secs must be in range 1..=300".to_string());
        }

        if self.server.bind_address.trim().is_empty() {
            problems.push("server.bind_address must not be empty".to_string());
        }
        if self.server.port == 0 {
            problems.push("server.port must be greater than zero".to_string());
        }
        if self.server.graceful_shutdown_secs == 0 {
            problems.push("server.graceful_shutdown_secs must be greater than zero".to_string());
        }

        if let Some(path) = self.catalog.path.as_ref().filter(|path| !path.exists()) {
            problems.push(format!(
                "catalog.path `{}` does not exist; unset it to use the built-in catalog",
                path.display()
            ));
        }

        if self.document.company_name.trim().is_empty() {
            problems.push("document.company_name must not be empty".to_string());
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            problems.push("logging.level must be one of trace|debug|info|warn|error".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

/// Replaces every `${NAME}` with the value of environment variable `NAME`.
fn expand_env_references(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let end = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let name = &after_open[..end];
        let value = env::var(name)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: name.to_string() })?;
        output.push_str(&value);
        rest = &after_open[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

/// Parses a non-blank environment variable; blank or unset reads as `None`.
fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    let Some(raw) = env::var(key).ok().filter(|value| !value.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: raw })
}

fn set_from_env<T: FromStr>(slot: &mut T, key: &str) -> Result<(), ConfigError> {
    replace(slot, env_value(key)?);
    Ok(())
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

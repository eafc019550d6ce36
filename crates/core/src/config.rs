use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub quoting: QuotingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotingConfig {
    /// Display label only; the core performs no currency conversion.
    pub currency: String,
    /// Role granted the quote approve/reject capability.
    pub approver_role: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
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
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://rately.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            quoting: QuotingConfig {
                currency: "GBP".to_string(),
                approver_role: "support_manager".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<RawDatabase>,
    quoting: Option<RawQuoting>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQuoting {
    currency: Option<String>,
    approver_role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Layered load: defaults, then the TOML file (if present), then
    /// `RATELY_*` environment variables, then explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("rately.toml"));
        match read_raw(&path) {
            Ok(Some(raw)) => config.apply_raw(raw),
            Ok(None) if options.require_file => {
                return Err(ConfigError::MissingConfigFile(path));
            }
            Ok(None) => {}
            Err(error) => return Err(error),
        }

        if let Ok(url) = env::var("RATELY_DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(level) = env::var("RATELY_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(url) = options.overrides.database_url {
            config.database.url = url;
        }
        if let Some(level) = options.overrides.log_level {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_raw(&mut self, raw: RawConfig) {
        if let Some(database) = raw.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(quoting) = raw.quoting {
            if let Some(currency) = quoting.currency {
                self.quoting.currency = currency;
            }
            if let Some(approver_role) = quoting.approver_role {
                self.quoting.approver_role = approver_role;
            }
        }
        if let Some(logging) = raw.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_owned()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_owned(),
            ));
        }
        if self.quoting.approver_role.is_empty() {
            return Err(ConfigError::Validation(
                "quoting.approver_role must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn read_raw(path: &Path) -> Result<Option<RawConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let raw = toml::from_str(&content)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
    Ok(Some(raw))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quoting.currency, "GBP");
    }

    #[test]
    fn missing_optional_file_falls_back_to_defaults() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/rately.toml")),
            ..LoadOptions::default()
        })
        .expect("optional file");

        assert_eq!(config.database.url, "sqlite://rately.db");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/rately.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("required file absent");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn file_values_and_overrides_layer_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rately.toml");
        let mut file = fs::File::create(&path).expect("create");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://from-file.db\"\n[quoting]\ncurrency = \"EUR\"\n[logging]\nformat = \"json\""
        )
        .expect("write");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://override.db".to_owned()),
                log_level: None,
            },
            ..LoadOptions::default()
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite://override.db");
        assert_eq!(config.quoting.currency, "EUR");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn zero_connections_fails_validation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rately.toml");
        fs::write(&path, "[database]\nmax_connections = 0\n").expect("write");

        let error = AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        })
        .expect_err("invalid");
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}

//! Application configuration.
//!
//! # Responsibility
//! - Load TOML configuration with defaults for every optional value.
//! - Apply environment overrides for deployment-specific values and secrets.
//!
//! # Invariants
//! - SMTP passwords are never part of built-in defaults.
//! - A missing config file path means "defaults", a present but unreadable
//!   or malformed file is an error.

use crate::service::greeting::GreetingTemplate;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "BIRTHDAY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BIRTHDAY_LOG_LEVEL";
pub const ENV_SMTP_PASSWORD: &str = "BIRTHDAY_SMTP_PASSWORD";

const DEFAULT_DB_FILE_NAME: &str = "birthdays.sqlite3";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 15 * 60;

/// Configuration load errors.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "failed to read config file `{}`: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config file `{}`: {message}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Roster database file.
    pub db_path: PathBuf,
    /// Directory for rolling log files; relative paths resolve against the
    /// working directory.
    pub log_dir: PathBuf,
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    pub log_level: Option<String>,
    /// Outbound mail relay; required for real (non dry-run) sends.
    pub smtp: Option<SmtpConfig>,
    pub greeting: GreetingTemplate,
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: None,
            smtp: None,
            greeting: GreetingTemplate::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    /// Usually supplied through `BIRTHDAY_SMTP_PASSWORD`.
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

/// Scheduler settings for `watch` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between scheduler ticks (reset-if-new-day, then check).
    pub check_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Birthday Manager".to_string()
}

fn default_smtp_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Loads configuration from `path` (or defaults) and applies process
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Reads and parses one TOML file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup` (the process environment in `load`).
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
            self.db_path = PathBuf::from(db_path.trim());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            self.log_level = Some(level.trim().to_string());
        }
        if let Some(password) = lookup(ENV_SMTP_PASSWORD) {
            match self.smtp.as_mut() {
                Some(smtp) => smtp.password = Some(password),
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "{ENV_SMTP_PASSWORD} is set but no [smtp] section is configured"
                    )));
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("log_dir cannot be empty".to_string()));
        }
        if self.schedule.check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedule.check_interval_secs must be positive".to_string(),
            ));
        }
        if let Some(smtp) = &self.smtp {
            if smtp.host.trim().is_empty() {
                return Err(ConfigError::Invalid("smtp.host cannot be empty".to_string()));
            }
            if smtp.timeout_secs == 0 {
                return Err(ConfigError::Invalid(
                    "smtp.timeout_secs must be positive".to_string(),
                ));
            }
        }
        self.greeting
            .validate()
            .map_err(|message| ConfigError::Invalid(format!("greeting: {message}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, ENV_DB_PATH, ENV_SMTP_PASSWORD};
    use std::path::PathBuf;

    const SAMPLE: &str = r#"
db_path = "/var/lib/birthday/roster.sqlite3"
log_level = "warn"

[smtp]
host = "smtp.gmail.com"
username = "mailer@example.com"
from_address = "mailer@example.com"

[greeting]
subject = "Many happy returns"
body = "Hi {name}!"

[schedule]
check_interval_secs = 60
"#;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, AppConfig::default());
        assert!(config.smtp.is_none());
    }

    #[test]
    fn parses_sections_and_fills_smtp_defaults() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("sample parses");
        let smtp = config.smtp.expect("smtp section");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from_name, "Birthday Manager");
        assert_eq!(smtp.timeout_secs, 30);
        assert!(smtp.password.is_none());
        assert_eq!(config.greeting.subject, "Many happy returns");
        assert_eq!(config.schedule.check_interval_secs, 60);
    }

    #[test]
    fn env_overrides_replace_db_path_and_inject_password() {
        let config = AppConfig::from_toml_str(SAMPLE)
            .expect("sample parses")
            .with_env_overrides(|key| match key {
                ENV_DB_PATH => Some("/tmp/other.sqlite3".to_string()),
                ENV_SMTP_PASSWORD => Some("app-password".to_string()),
                _ => None,
            })
            .expect("overrides apply");
        assert_eq!(config.db_path, PathBuf::from("/tmp/other.sqlite3"));
        assert_eq!(
            config.smtp.and_then(|smtp| smtp.password).as_deref(),
            Some("app-password")
        );
    }

    #[test]
    fn password_override_without_smtp_section_is_rejected() {
        let err = AppConfig::default()
            .with_env_overrides(|key| (key == ENV_SMTP_PASSWORD).then(|| "x".to_string()))
            .expect_err("password without smtp must fail");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = AppConfig::from_toml_str("[schedule]\ncheck_interval_secs = 0\n")
            .expect_err("zero interval must fail");
        assert!(err.to_string().contains("check_interval_secs"));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("db_path = [").expect_err("malformed toml");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}

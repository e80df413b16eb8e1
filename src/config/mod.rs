mod file_config;

pub use file_config::{FileConfig, SessionFileConfig};

use crate::server::RequestsLoggingLevel;
use crate::session::SessionPolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub store_timeout_ms: u64,
    pub session_idle_timeout_sec: u64,
    pub session_max_lifetime_sec: u64,
    pub session_prune_interval_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub store_timeout: Duration,
    pub session: SessionSettings,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub prune_interval: Duration,
    pub secure_cookie: bool,
}

impl SessionSettings {
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            idle_timeout: self.idle_timeout,
            max_lifetime: self.max_lifetime,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let store_timeout =
            Duration::from_millis(file.store_timeout_ms.unwrap_or(cli.store_timeout_ms));

        let session_file = file.session.unwrap_or_default();
        let session = SessionSettings {
            idle_timeout: Duration::from_secs(
                session_file
                    .idle_timeout_sec
                    .unwrap_or(cli.session_idle_timeout_sec),
            ),
            max_lifetime: Duration::from_secs(
                session_file
                    .max_lifetime_sec
                    .unwrap_or(cli.session_max_lifetime_sec),
            ),
            prune_interval: Duration::from_secs(
                session_file
                    .prune_interval_sec
                    .unwrap_or(cli.session_prune_interval_sec),
            ),
            secure_cookie: session_file.secure_cookie.unwrap_or(false),
        };
        if session.idle_timeout.is_zero() || session.max_lifetime.is_zero() {
            bail!("Session timeouts must be greater than zero");
        }
        if session.prune_interval.is_zero() {
            bail!("Session prune interval must be greater than zero");
        }

        Ok(Self {
            db_path,
            port,
            logging_level,
            frontend_dir_path,
            store_timeout,
            session,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

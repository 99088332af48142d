//! Configuration management for the filesystem API
//!
//! Settings are read once from the environment at startup and handed to the
//! engine and the HTTP layer explicitly.

use crate::error::{FsError, Result};
use std::path::PathBuf;

/// Environment variable names
pub const ENV_ROOT_DIR: &str = "FSAPI_ROOT_DIR";
pub const ENV_SERVER_HOST: &str = "FSAPI_SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "FSAPI_SERVER_PORT";
pub const ENV_AUTH_TOKEN: &str = "FSAPI_SERVER_AUTH_TOKEN";
pub const ENV_MAX_UPLOAD_SIZE: &str = "FSAPI_MAX_FILE_UPLOAD_SIZE";
pub const ENV_LOG_LEVEL: &str = "FSAPI_LOG_LEVEL";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_MAX_UPLOAD_SIZE: &str = "2.0mb";
pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Top-level settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory that the virtual path `/` maps to
    pub root_dir: PathBuf,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Shared secret; `None` disables the check
    pub auth_token: Option<String>,
    /// Maximum request body size in bytes
    pub max_upload_size: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let root_dir = non_empty(ENV_ROOT_DIR)
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"));

        let host = non_empty(ENV_SERVER_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match non_empty(ENV_SERVER_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                FsError::InvalidConfig(format!("{} '{}': {}", ENV_SERVER_PORT, raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_size = parse_size(
            &non_empty(ENV_MAX_UPLOAD_SIZE).unwrap_or_else(|| DEFAULT_MAX_UPLOAD_SIZE.to_string()),
        )?;

        let level = non_empty(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            root_dir,
            server: ServerSettings {
                host,
                port,
                auth_token: non_empty(ENV_AUTH_TOKEN),
                max_upload_size,
            },
            logging: LoggingSettings { level },
        })
    }

    /// `host:port` string suitable for binding a listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check that the configured root is an existing directory
    pub fn validate(&self) -> Result<()> {
        let meta = std::fs::metadata(&self.root_dir).map_err(|e| {
            FsError::Config(format!(
                "root directory {} is not accessible: {}",
                self.root_dir.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(FsError::Config(format!(
                "root directory {} is not a directory",
                self.root_dir.display()
            )));
        }
        Ok(())
    }
}

/// Parse a human readable size such as `512kb`, `2.0mb` or `1024`
pub fn parse_size(raw: &str) -> Result<usize> {
    let value = raw.trim().to_ascii_lowercase();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let multiplier: f64 = match unit.trim() {
        "" | "b" => 1.0,
        "kb" | "k" => 1024.0,
        "mb" | "m" => 1024.0 * 1024.0,
        "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        other => {
            return Err(FsError::InvalidConfig(format!(
                "unknown size unit '{}' in '{}'",
                other, raw
            )))
        }
    };

    let number: f64 = number
        .parse()
        .map_err(|_| FsError::InvalidConfig(format!("invalid size '{}'", raw)))?;

    Ok((number * multiplier).floor() as usize)
}

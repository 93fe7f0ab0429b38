//! Daemon configuration.
//!
//! Loaded once at startup from a YAML file, then layered:
//! file → environment (`GARDINAR_*`, after `.env`) → CLI flags.
//! The result is immutable and shared behind an `Arc`.
//!
//! # Configuration File Format
//!
//! ```yaml
//! listen_host: 0.0.0.0
//! listen_port: 8080
//! secret_key: "change-me"
//! secret_header: X-Secret-Key
//! git_path: /usr/bin/git
//! task_timeout_secs: 600
//!
//! # Either named tasks ...
//! tasks:
//!   deploy: ./scripts/deploy.sh
//!   restart: systemctl --user restart app
//!
//! # ... or a single post-update script. A relative path is resolved
//! # against the directory holding this file.
//! # post_update_script: /srv/hooks/post-update.sh
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderName;
use serde::Deserialize;

use crate::errors::ConfigError;
use crate::webhook::resolver::TaskResolver;

pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
pub const DEFAULT_SECRET_HEADER: &str = "x-secret-key";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Overrides `secret_key`.
pub const ENV_SECRET_KEY: &str = "GARDINAR_SECRET_KEY";
/// Overrides `listen_port`.
pub const ENV_LISTEN_PORT: &str = "GARDINAR_LISTEN_PORT";

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_host: String,
    pub listen_port: u16,
    pub secret_key: String,
    pub secret_header: HeaderName,
    /// Revision-control executable used for branch synchronization.
    pub git_path: PathBuf,
    /// `None` means tasks may run forever.
    pub task_timeout: Option<Duration>,
    pub tasks: TaskResolver,
}

/// On-disk shape.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_listen_host")]
    listen_host: String,
    #[serde(default)]
    listen_port: Option<PortValue>,
    #[serde(default)]
    secret_key: String,
    #[serde(default)]
    secret_header: Option<String>,
    #[serde(default)]
    git_path: Option<PathBuf>,
    #[serde(default)]
    task_timeout_secs: Option<u64>,
    #[serde(default)]
    tasks: Option<BTreeMap<String, String>>,
    #[serde(default)]
    post_update_script: Option<PathBuf>,
}

/// Ports may be written as numbers or as strings such as `"8080"` / `":8080"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

/// Parse `8080` or `:8080`.
pub fn parse_port(value: &str) -> Result<u16, ConfigError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix(':').unwrap_or(trimmed);
    match digits.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value.to_string())),
    }
}

/// The config path must exist and be a regular file.
pub fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    let meta = std::fs::metadata(path).map_err(|source| ConfigError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_dir() {
        return Err(ConfigError::IsDirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Make a relative post-update script absolute against the config file's
/// directory. Tasks run inside the request's `source_dir`, so a relative
/// path would otherwise be checked and executed in different places.
fn resolve_script_path(script: PathBuf, origin: &Path) -> Result<PathBuf, ConfigError> {
    if script.is_absolute() {
        return Ok(script);
    }
    let base = origin.parent().unwrap_or(Path::new(""));
    std::path::absolute(base.join(&script))
        .map_err(|source| ConfigError::ScriptPath { path: script, source })
}

impl Config {
    /// A configuration with defaults for everything but the secret and the
    /// task strategy.
    pub fn new(secret_key: impl Into<String>, tasks: TaskResolver) -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: DEFAULT_LISTEN_PORT,
            secret_key: secret_key.into(),
            secret_header: HeaderName::from_static(DEFAULT_SECRET_HEADER),
            git_path: PathBuf::from("git"),
            task_timeout: None,
            tasks,
        }
    }

    /// Load and validate the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        validate_config_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Parse and validate YAML text. `origin` names the file in error
    /// messages and anchors a relative `post_update_script`.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let listen_port = match file.listen_port {
            None => DEFAULT_LISTEN_PORT,
            Some(PortValue::Number(0)) => return Err(ConfigError::InvalidPort("0".into())),
            Some(PortValue::Number(port)) => port,
            Some(PortValue::Text(text)) => parse_port(&text)?,
        };

        let secret_header = match file.secret_header {
            None => HeaderName::from_static(DEFAULT_SECRET_HEADER),
            Some(name) => HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name))?,
        };

        let tasks = match (file.tasks, file.post_update_script) {
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousTaskStrategy),
            (None, None) => return Err(ConfigError::NoTaskStrategy),
            (Some(tasks), None) if tasks.is_empty() => return Err(ConfigError::NoTasks),
            (Some(tasks), None) => TaskResolver::Named(tasks),
            (None, Some(script)) => TaskResolver::Fixed {
                script: resolve_script_path(script, origin)?,
            },
        };

        let config = Self {
            listen_host: file.listen_host,
            listen_port,
            secret_key: file.secret_key,
            secret_header,
            git_path: file.git_path.unwrap_or_else(|| PathBuf::from("git")),
            task_timeout: file.task_timeout_secs.map(Duration::from_secs),
            tasks,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `GARDINAR_*` overrides using `lookup` to read variables.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(secret) = lookup(ENV_SECRET_KEY) {
            self.secret_key = secret;
        }
        if let Some(port) = lookup(ENV_LISTEN_PORT) {
            self.listen_port = parse_port(&port)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Apply a CLI port override.
    pub fn with_port(mut self, port: Option<u16>) -> Result<Self, ConfigError> {
        if let Some(port) = port {
            if port == 0 {
                return Err(ConfigError::InvalidPort("0".into()));
            }
            self.listen_port = port;
        }
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(())
    }

    /// `host:port` to bind. IPv6 literals are bracketed.
    pub fn listen_addr(&self) -> String {
        let host = self.listen_host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.listen_port)
        } else {
            format!("{}:{}", host, self.listen_port)
        }
    }
}

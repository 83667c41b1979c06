//! Configuration for the `hypernotes` binary
//!
//! Read from a TOML file, then overridden by environment variables:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! open_browser = true
//!
//! [log]
//! level = "info"
//! format = "text"   # or "json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "HYPERNOTES_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Viewer server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Viewer server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind; 0 picks a free one.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Open the default browser once the server is listening.
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_open_browser() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open_browser: default_open_browser(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration and apply environment overrides.
    ///
    /// The file is `config_path`, else `$HYPERNOTES_CONFIG`. With neither,
    /// defaults are used. An explicitly named file must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is missing or malformed, or an
    /// override has an invalid value.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Apply `HYPERNOTES_*` overrides looked up through `var`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unparsable port, boolean or format.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HYPERNOTES_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("HYPERNOTES_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("invalid HYPERNOTES_PORT: {e}")))?;
        }
        if let Some(open) = var("HYPERNOTES_OPEN_BROWSER") {
            self.server.open_browser = open
                .parse()
                .map_err(|e| Error::Config(format!("invalid HYPERNOTES_OPEN_BROWSER: {e}")))?;
        }
        if let Some(level) = var("HYPERNOTES_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(format) = var("HYPERNOTES_LOG_FORMAT") {
            self.log.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(Error::Config(format!(
                        "invalid HYPERNOTES_LOG_FORMAT '{other}', expected 'text' or 'json'"
                    )));
                }
            };
        }
        Ok(())
    }
}

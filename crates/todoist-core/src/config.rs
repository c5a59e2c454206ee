//! Configuration management for todoist-mcp.
//!
//! Two layers:
//!
//! - [`Config`]: the optional TOML file, stored in a platform-specific location
//!   (`~/.config/todoist-mcp/config.toml` on Linux,
//!   `~/Library/Application Support/todoist-mcp/config.toml` on macOS,
//!   `%APPDATA%\todoist-mcp\config.toml` on Windows).
//! - [`ServerSettings`]: the immutable settings the server runs with, resolved
//!   once at startup from CLI overrides, environment, the config file and
//!   defaults, in that order of precedence.
//!
//! # Example
//!
//! ```ignore
//! use todoist_core::config::{Config, ServerSettings, SettingsOverrides};
//!
//! let config = Config::load()?;
//! let settings = ServerSettings::from_env(&config, &SettingsOverrides::default(), || None)?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "todoist-mcp";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "TODOIST_API_TOKEN";

/// Environment variable selecting the transport.
pub const TRANSPORT_ENV: &str = "TRANSPORT";

/// Environment variable for the SSE bind host.
pub const HOST_ENV: &str = "HOST";

/// Environment variable for the SSE bind port.
pub const PORT_ENV: &str = "PORT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8050;

// =============================================================================
// Configuration file
// =============================================================================

/// Contents of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transport settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    /// Upstream API settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todoist: Option<TodoistConfig>,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// `[todoist]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoistConfig {
    /// REST API base URL (for proxies and tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `server.port`, `todoist.base_url`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "server" => {
                let server = self.server.get_or_insert_with(ServerConfig::default);
                match field {
                    "transport" => server.transport = Some(value.parse()?),
                    "host" => server.host = Some(value.to_string()),
                    "port" => server.port = Some(parse_port(value)?),
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown server config field: {}",
                            field
                        )))
                    }
                }
            }
            "todoist" => {
                let todoist = self.todoist.get_or_insert_with(TodoistConfig::default);
                match field {
                    "base_url" | "url" => todoist.base_url = Some(value.to_string()),
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown todoist config field: {}",
                            field
                        )))
                    }
                }
            }
            _ => return Err(Error::Config(format!("Unknown config section: {}", section))),
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `server.port`, `todoist.base_url`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "server" => {
                let Some(server) = &self.server else {
                    return Ok(None);
                };
                match field {
                    "transport" => Ok(server.transport.map(|t| t.to_string())),
                    "host" => Ok(server.host.clone()),
                    "port" => Ok(server.port.map(|p| p.to_string())),
                    _ => Err(Error::Config(format!(
                        "Unknown server config field: {}",
                        field
                    ))),
                }
            }
            "todoist" => {
                let Some(todoist) = &self.todoist else {
                    return Ok(None);
                };
                match field {
                    "base_url" | "url" => Ok(todoist.base_url.clone()),
                    _ => Err(Error::Config(format!(
                        "Unknown todoist config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

fn parse_port(value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::Config(format!(
            "Invalid port '{}': expected a number between 1 and 65535",
            value
        ))),
        Ok(port) => Ok(port),
    }
}

// =============================================================================
// Resolved settings
// =============================================================================

/// Transport the server listens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Sse,
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "sse" => Ok(TransportKind::Sse),
            other => Err(Error::Config(format!(
                "Unknown transport '{}': expected 'stdio' or 'sse'",
                other
            ))),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => f.write_str("stdio"),
            TransportKind::Sse => f.write_str("sse"),
        }
    }
}

/// The API token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, rejecting empty values.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Config("Todoist API token is empty".to_string()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where the server accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSettings {
    Stdio,
    Sse { host: String, port: u16 },
}

impl TransportSettings {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportSettings::Stdio => TransportKind::Stdio,
            TransportSettings::Sse { .. } => TransportKind::Sse,
        }
    }
}

impl fmt::Display for TransportSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSettings::Stdio => f.write_str("stdio"),
            TransportSettings::Sse { host, port } => write!(f, "sse on {}:{}", host, port),
        }
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub token: Option<String>,
    pub transport: Option<TransportKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Settings the server runs with. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub credential: Credential,
    pub transport: TransportSettings,
    pub base_url: Option<String>,
}

impl ServerSettings {
    /// Resolve settings from the process environment.
    pub fn from_env(
        config: &Config,
        overrides: &SettingsOverrides,
        stored_token: impl FnOnce() -> Option<String>,
    ) -> Result<Self> {
        Self::resolve(config, |key| std::env::var(key).ok(), overrides, stored_token)
    }

    /// Resolve settings.
    ///
    /// `lookup` reads environment variables; `stored_token` is only consulted
    /// when neither the overrides nor the environment carry a token.
    pub fn resolve<F>(
        config: &Config,
        lookup: F,
        overrides: &SettingsOverrides,
        stored_token: impl FnOnce() -> Option<String>,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let server = config.server.clone().unwrap_or_default();

        let token = overrides
            .token
            .clone()
            .or_else(|| env(TOKEN_ENV))
            .or_else(stored_token)
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} not found. Set it in the environment, a .env file, \
                     or store it with `todoist-mcp auth login`",
                    TOKEN_ENV
                ))
            })?;
        let credential = Credential::new(token)?;

        let kind = match overrides.transport {
            Some(kind) => kind,
            None => match env(TRANSPORT_ENV) {
                Some(raw) => raw.parse()?,
                None => server.transport.unwrap_or_default(),
            },
        };

        let transport = match kind {
            TransportKind::Stdio => TransportSettings::Stdio,
            TransportKind::Sse => {
                let host = overrides
                    .host
                    .clone()
                    .or_else(|| env(HOST_ENV))
                    .or(server.host)
                    .unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = match overrides.port {
                    Some(port) => port,
                    None => match env(PORT_ENV) {
                        Some(raw) => parse_port(&raw)?,
                        None => server.port.unwrap_or(DEFAULT_PORT),
                    },
                };
                if port == 0 {
                    return Err(Error::Config("Port 0 is not allowed".to_string()));
                }
                TransportSettings::Sse { host, port }
            }
        };

        let base_url = config.todoist.as_ref().and_then(|t| t.base_url.clone());

        Ok(Self {
            credential,
            transport,
            base_url,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Configuration loading.
//!
//! The configuration is one TOML file:
//!
//! ```toml
//! [login]
//! username = "me@example.com"
//! password = "app-password"
//! imap_server = "imap.example.com"
//!
//! [settings]
//! inbox = "INBOX"
//! folder_delimiter = "/"
//!
//! [[folders]]
//! parent = "banco"
//! labels = ["openbank", "santander"]
//!
//! [filters.openbank]
//! sender = "openbank"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::rules::{FolderEntry, LeafPredicate, RuleTree, RuleTreeError};

/// Name of the environment variable that may point at the config file.
pub const CONFIG_ENV: &str = "MAILSORT_CONFIG";

/// Configuration errors. All of them are fatal before any connection.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found.
    #[error("no configuration file found (tried {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unexpected keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is missing or blank.
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    /// A setting has an unusable value.
    #[error("invalid setting '{key}': {reason}")]
    InvalidSetting {
        /// Offending key.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The rule tree is inconsistent.
    #[error("invalid rules: {0}")]
    Rules(#[from] RuleTreeError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Server credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginConfig {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
    /// IMAP server host name.
    pub imap_server: String,
    /// IMAP server port.
    pub port: u16,
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("imap_server", &self.imap_server)
            .field("port", &self.port)
            .finish()
    }
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Folder the engine classifies.
    #[serde(default = "default_inbox")]
    pub inbox: String,
    /// Server hierarchy delimiter used to build `parent<delim>leaf`.
    #[serde(default = "default_delimiter")]
    pub folder_delimiter: String,
    /// Per-command timeout in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Directory for log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Whether to use implicit TLS.
    #[serde(default = "default_tls")]
    pub tls: bool,
}

impl Settings {
    /// Returns the per-command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inbox: default_inbox(),
            folder_delimiter: default_delimiter(),
            command_timeout_secs: default_command_timeout(),
            log_dir: default_log_dir(),
            tls: default_tls(),
        }
    }
}

fn default_inbox() -> String {
    "INBOX".to_string()
}

fn default_delimiter() -> String {
    "/".to_string()
}

const fn default_command_timeout() -> u64 {
    60
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

const fn default_tls() -> bool {
    true
}

const fn default_port() -> u16 {
    993
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    login: RawLogin,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    folders: Vec<FolderEntry>,
    #[serde(default)]
    filters: HashMap<String, LeafPredicate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogin {
    username: Option<String>,
    password: Option<String>,
    imap_server: Option<String>,
    #[serde(default = "default_port")]
    port: u16,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server credentials.
    pub login: LoginConfig,
    /// Runtime settings.
    pub settings: Settings,
    /// Classification rules.
    pub rules: RuleTree,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;

        let login = LoginConfig {
            username: required(raw.login.username, "login.username")?,
            password: required(raw.login.password, "login.password")?,
            imap_server: required(raw.login.imap_server, "login.imap_server")?,
            port: raw.login.port,
        };
        if login.port == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "login.port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }

        let settings = raw.settings;
        if settings.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "settings.command_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if settings.folder_delimiter.is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "settings.folder_delimiter",
                reason: "must not be empty".to_string(),
            });
        }
        if settings.inbox.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "settings.inbox",
                reason: "must not be empty".to_string(),
            });
        }

        let rules = RuleTree::build(&raw.folders, &raw.filters)?;

        Ok(Self {
            login,
            settings,
            rules,
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingKey(key))
}

/// Returns the places searched for a configuration file, in order.
///
/// An explicit path (from `--config` or `MAILSORT_CONFIG`) wins outright.
#[must_use]
pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let mut paths = Vec::with_capacity(2);
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("mailsort").join("config.toml"));
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

/// Finds the configuration file to use.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let candidates = candidate_paths(explicit);
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or(ConfigError::NotFound(candidates))
}

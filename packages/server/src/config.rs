//! Server configuration.
//!
//! Values are resolved in three layers: the defaults embedded from
//! `config/default.toml`, then environment variables, then command-line
//! flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Errors produced while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The embedded defaults are not valid TOML.
    #[error("Invalid default configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment variable held a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Which service the binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    /// Kindergarten records, listings, and the municipality report.
    Preschool,
    /// Coverage, ranking, and projection over the municipality report.
    Analytics,
}

impl ServiceRole {
    /// Short name used in logs and health responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preschool => "preschool",
            Self::Analytics => "analytics",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DefaultPorts {
    preschool: u16,
    analytics: u16,
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    bind_addr: String,
    db_path: PathBuf,
    population_csv: PathBuf,
    peer_timeout_secs: u64,
    jwt_secret: String,
    auth_salt: String,
    token_ttl_secs: u64,
    ports: DefaultPorts,
}

/// Command-line overrides. Every field left unset keeps the value from the
/// lower layers.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    /// Address to bind the HTTP server to
    #[arg(long, global = true)]
    pub bind_addr: Option<String>,
    /// Port to listen on
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Path of the `SQLite` record store
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,
    /// Path of the child population CSV
    #[arg(long, global = true)]
    pub population_csv: Option<PathBuf>,
    /// Base URL of the preschool service to fetch the municipality report from
    #[arg(long, global = true)]
    pub peer_base_url: Option<String>,
    /// Timeout in seconds for requests to the preschool service
    #[arg(long, global = true)]
    pub peer_timeout_secs: Option<u64>,
}

/// Fully resolved configuration for one service role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
    /// `SQLite` record store location.
    pub db_path: PathBuf,
    /// Child population CSV location (analytics role).
    pub population_csv: PathBuf,
    /// Peer preschool service. When unset, the analytics role aggregates
    /// the local record store directly.
    pub peer_base_url: Option<String>,
    /// Request timeout for the peer service.
    pub peer_timeout: Duration,
    /// HMAC secret for access tokens (preschool role).
    pub jwt_secret: String,
    /// Salt mixed into stored password hashes (preschool role).
    pub auth_salt: String,
    /// Lifetime of issued access tokens.
    pub token_ttl: Duration,
}

impl ServerConfig {
    /// Loads the embedded defaults for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the embedded defaults do not parse.
    pub fn defaults(role: ServiceRole) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::de::from_str(DEFAULT_CONFIG)?;
        let port = match role {
            ServiceRole::Preschool => file.ports.preschool,
            ServiceRole::Analytics => file.ports.analytics,
        };

        Ok(Self {
            bind_addr: file.bind_addr,
            port,
            db_path: file.db_path,
            population_csv: file.population_csv,
            peer_base_url: None,
            peer_timeout: Duration::from_secs(file.peer_timeout_secs),
            jwt_secret: file.jwt_secret,
            auth_salt: file.auth_salt,
            token_ttl: Duration::from_secs(file.token_ttl_secs),
        })
    }

    /// Resolves the full configuration from defaults, the process
    /// environment, and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the defaults do not parse or an
    /// environment variable is malformed.
    pub fn load(role: ServiceRole, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::defaults(role)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);

        log::info!(
            "Resolved {} configuration: {}:{}, db {}",
            role.as_str(),
            config.bind_addr,
            config.port,
            config.db_path.display()
        );

        Ok(config)
    }

    /// Applies environment overrides read through `var`.
    ///
    /// Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `PORT`,
    /// `PEER_TIMEOUT_SECS`, or `TOKEN_TTL_SECS` is not a number.
    pub fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(bind_addr) = get("BIND_ADDR") {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = get("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value: port })?;
        }
        if let Some(path) = get("PRESCHOOL_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(path) = get("POPULATION_CSV") {
            self.population_csv = PathBuf::from(path);
        }
        if let Some(url) = get("PEER_BASE_URL") {
            self.peer_base_url = Some(url);
        }
        if let Some(secs) = get("PEER_TIMEOUT_SECS") {
            let parsed: u64 = secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PEER_TIMEOUT_SECS",
                value: secs,
            })?;
            self.peer_timeout = Duration::from_secs(parsed);
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(salt) = get("AUTH_SALT") {
            self.auth_salt = salt;
        }
        if let Some(secs) = get("TOKEN_TTL_SECS") {
            let parsed: u64 = secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TOKEN_TTL_SECS",
                value: secs,
            })?;
            self.token_ttl = Duration::from_secs(parsed);
        }

        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_addr) = overrides.bind_addr {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(path) = overrides.db_path {
            self.db_path = path;
        }
        if let Some(path) = overrides.population_csv {
            self.population_csv = path;
        }
        if let Some(url) = overrides.peer_base_url {
            self.peer_base_url = Some(url);
        }
        if let Some(secs) = overrides.peer_timeout_secs {
            self.peer_timeout = Duration::from_secs(secs);
        }
    }
}

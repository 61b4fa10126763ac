//! Collection handle configuration
//!
//! A [`CollectionConfig`] names the server, database and collection a handle
//! talks to, plus the timeout every call on that handle starts its deadline
//! from. Configs can be built in code, read from `CNCT_*` environment
//! variables, or parsed from TOML.

use crate::{CnctError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Per-call timeout applied when none is configured
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect and server selection timeout applied when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const ENV_URI: &str = "CNCT_MONGODB_URI";
pub const ENV_DATABASE: &str = "CNCT_DATABASE";
pub const ENV_COLLECTION: &str = "CNCT_COLLECTION";
pub const ENV_TIMEOUT_MS: &str = "CNCT_TIMEOUT_MS";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CNCT_CONNECT_TIMEOUT_MS";
pub const ENV_APP_NAME: &str = "CNCT_APP_NAME";

/// Where a collection handle connects and how long each call may take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Connection URI (`mongodb://host:port` or `mongodb+srv://host`)
    pub uri: String,
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
    /// Deadline for each individual operation
    #[serde(
        rename = "timeout_ms",
        with = "duration_ms",
        default = "default_operation_timeout"
    )]
    pub timeout: Duration,
    /// Connect and server selection timeout
    #[serde(
        rename = "connect_timeout_ms",
        with = "duration_ms",
        default = "default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    /// Application name reported to the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

fn default_operation_timeout() -> Duration {
    DEFAULT_OPERATION_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

impl CollectionConfig {
    /// Create a configuration with default timeouts
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
            timeout: DEFAULT_OPERATION_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            app_name: None,
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the application name
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Read a configuration from `CNCT_*` environment variables
    ///
    /// `CNCT_MONGODB_URI`, `CNCT_DATABASE` and `CNCT_COLLECTION` are required.
    /// Timeouts are given in milliseconds and fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CnctError::Configuration(format!("{} is not set", key)))
        };
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_millis).map_err(|e| {
                    CnctError::Configuration(format!("{} must be milliseconds: {}", key, e))
                }),
                None => Ok(default),
            }
        };

        let config = Self {
            uri: required(ENV_URI)?,
            database: required(ENV_DATABASE)?,
            collection: required(ENV_COLLECTION)?,
            timeout: millis(ENV_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT)?,
            connect_timeout: millis(ENV_CONNECT_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT)?,
            app_name: lookup(ENV_APP_NAME).filter(|v| !v.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from TOML
    ///
    /// ```toml
    /// uri = "mongodb://localhost:27017"
    /// database = "exampleDB"
    /// collection = "users"
    /// timeout_ms = 5000
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| CnctError::Configuration(format!("Invalid TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to open a handle
    pub fn validate(&self) -> Result<()> {
        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            return Err(CnctError::Configuration(format!(
                "URI must start with mongodb:// or mongodb+srv://, got {:?}",
                self.uri
            )));
        }
        if self.database.is_empty() {
            return Err(CnctError::Configuration(
                "database name must not be empty".to_string(),
            ));
        }
        if self.database.contains(['/', '\\', '.', ' ', '"', '$', '\0']) {
            return Err(CnctError::Configuration(format!(
                "invalid database name {:?}",
                self.database
            )));
        }
        if self.collection.is_empty() {
            return Err(CnctError::Configuration(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.collection.contains(['$', '\0']) {
            return Err(CnctError::Configuration(format!(
                "invalid collection name {:?}",
                self.collection
            )));
        }
        if self.timeout.is_zero() {
            return Err(CnctError::Configuration(
                "operation timeout must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(CnctError::Configuration(
                "connect timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Whole milliseconds, saturating at `u64::MAX`
    pub fn millis(value: &Duration) -> u64 {
        u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(millis(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

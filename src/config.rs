//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const ENV_STORE_URI: &str = "FEEDBACK_DASH_STORE_URI";
pub const ENV_STORE_HOST: &str = "FEEDBACK_DASH_STORE_HOST";
pub const ENV_AUTH_TOKEN: &str = "FEEDBACK_DASH_STORE_AUTH_TOKEN";
pub const ENV_DATABASE: &str = "FEEDBACK_DASH_DATABASE";
pub const ENV_PORT: &str = "FEEDBACK_DASH_PORT";
pub const ENV_QUERY_TIMEOUT: &str = "FEEDBACK_DASH_QUERY_TIMEOUT_SECS";
pub const ENV_LOG_DIR: &str = "FEEDBACK_DASH_LOG_DIR";

const DEFAULT_PORT: u16 = 8501;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the document store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// libSQL URL or local database file path.
    pub uri: String,
    /// Namespace of the collection tables (`"<database>.<collection>"`).
    pub database: String,
    /// Credential for remote stores.
    pub auth_token: Option<SecretString>,
    /// Upper bound on connect, ping and collection reads.
    pub query_timeout: Duration,
}

impl StoreConfig {
    /// Whether `uri` points at a remote libSQL server rather than a local file.
    pub fn is_remote(&self) -> bool {
        ["libsql://", "https://", "http://", "wss://", "ws://"]
            .iter()
            .any(|scheme| self.uri.starts_with(scheme))
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub store: StoreConfig,
    /// HTTP port for the dashboard API.
    pub port: u16,
    /// Directory for rolling log files (stderr only when unset).
    pub log_dir: Option<String>,
}

impl DashboardConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let uri = match (var(ENV_STORE_URI), var(ENV_STORE_HOST)) {
            (Some(uri), _) => uri,
            (None, Some(host)) => format!("libsql://{host}"),
            (None, None) => {
                return Err(ConfigError::MissingRequired {
                    key: ENV_STORE_URI.to_string(),
                    hint: format!("Set {ENV_STORE_URI}, or {ENV_STORE_HOST} with {ENV_AUTH_TOKEN}."),
                });
            }
        };

        let database = var(ENV_DATABASE).ok_or_else(|| ConfigError::MissingEnvVar(ENV_DATABASE.into()))?;
        if database.contains('"') {
            return Err(ConfigError::InvalidValue {
                key: ENV_DATABASE.into(),
                message: "must not contain double quotes".into(),
            });
        }

        let port = match var(ENV_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: ENV_PORT.into(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match var(ENV_QUERY_TIMEOUT) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_QUERY_TIMEOUT.into(),
                        message: format!("expected a positive number of seconds, got `{raw}`"),
                    });
                }
                Ok(secs) => secs,
            },
            None => DEFAULT_QUERY_TIMEOUT_SECS,
        };

        Ok(Self {
            store: StoreConfig {
                uri,
                database,
                auth_token: var(ENV_AUTH_TOKEN).map(SecretString::from),
                query_timeout: Duration::from_secs(timeout_secs),
            },
            port,
            log_dir: var(ENV_LOG_DIR),
        })
    }
}

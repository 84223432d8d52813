//! # Environment Configuration
//!
//! Runtime settings for the tax engine, read from `TAVOLA_*` environment
//! variables with development defaults.
//!
//! | Variable                    | Default                  |
//! |-----------------------------|--------------------------|
//! | `TAVOLA_DB_PATH`            | `tavola.db`              |
//! | `TAVOLA_DB_MAX_CONNECTIONS` | `5`                      |
//! | `TAVOLA_QUERY_TIMEOUT_MS`   | `2000`                   |
//! | `TAVOLA_TAX_ROUNDING`       | `half_up`                |
//! | `TAVOLA_TENANT_ID`          | `DEFAULT_TENANT_ID`      |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tavola_core::{RoundingMode, DEFAULT_TENANT_ID};

use crate::pool::DbConfig;

/// Tax engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TavolaConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Upper bound for any single repository query
    pub query_timeout: Duration,

    /// Rounding applied to every line's tax
    pub rounding: RoundingMode,

    /// Tenant whose products and rules are read
    pub tenant_id: String,
}

impl TavolaConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `load()` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = TavolaConfig {
            database_path: lookup("TAVOLA_DB_PATH")
                .unwrap_or_else(|| "tavola.db".to_string())
                .into(),

            max_connections: lookup("TAVOLA_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TAVOLA_DB_MAX_CONNECTIONS".to_string()))?,

            query_timeout: lookup("TAVOLA_QUERY_TIMEOUT_MS")
                .unwrap_or_else(|| "2000".to_string())
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue("TAVOLA_QUERY_TIMEOUT_MS".to_string()))?,

            rounding: match lookup("TAVOLA_TAX_ROUNDING") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("TAVOLA_TAX_ROUNDING".to_string()))?,
                None => RoundingMode::default(),
            },

            tenant_id: lookup("TAVOLA_TENANT_ID")
                .unwrap_or_else(|| DEFAULT_TENANT_ID.to_string()),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("TAVOLA_DB_MAX_CONNECTIONS".to_string()));
        }
        if config.query_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("TAVOLA_QUERY_TIMEOUT_MS".to_string()));
        }
        if config.tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TAVOLA_TENANT_ID".to_string()));
        }

        Ok(config)
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .query_timeout(self.query_timeout)
            .tenant_id(&self.tenant_id)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<TavolaConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TavolaConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("tavola.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.query_timeout, Duration::from_millis(2000));
        assert_eq!(config.rounding, RoundingMode::HalfUp);
        assert_eq!(config.tenant_id, DEFAULT_TENANT_ID);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TAVOLA_DB_PATH", "/var/lib/tavola/tax.db"),
            ("TAVOLA_QUERY_TIMEOUT_MS", "150"),
            ("TAVOLA_TAX_ROUNDING", "half_even"),
        ])
        .unwrap();
        assert_eq!(config.query_timeout, Duration::from_millis(150));
        assert_eq!(config.rounding, RoundingMode::HalfEven);

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/tavola/tax.db"));
        assert_eq!(db.query_timeout, Duration::from_millis(150));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("TAVOLA_TAX_ROUNDING", "truncate")]),
            Err(ConfigError::InvalidValue(key)) if key == "TAVOLA_TAX_ROUNDING"
        ));
        assert!(config_from(&[("TAVOLA_QUERY_TIMEOUT_MS", "0")]).is_err());
        assert!(config_from(&[("TAVOLA_DB_MAX_CONNECTIONS", "many")]).is_err());
        assert!(matches!(
            config_from(&[("TAVOLA_TENANT_ID", "  ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}

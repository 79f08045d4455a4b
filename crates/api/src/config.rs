//! Application configuration loaded from environment variables.

use std::time::Duration;

use emitter::TransportKind;
use order_store::UserLookup;
use thiserror::Error;

use crate::consumer::{DEFAULT_DEAD_LETTER_CAPACITY, RedeliveryPolicy};

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable has a value that cannot be used.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// A variable required by the selected backends is not set.
    #[error("{key} must be set when {context}")]
    Missing {
        key: &'static str,
        context: &'static str,
    },
}

/// Which order store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown order store: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `ORDER_STORE` — `memory` or `postgres` (default: `memory`)
/// - `DATABASE_URL` — required for `postgres`
/// - `DATABASE_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `USER_LOOKUP` — `index` or `scan` (default: `index`)
/// - `EVENT_TRANSPORT` — `log`, `queue`, `bus` or `http` (default: `log`)
/// - `PAYMENT_URL`, `SHIPMENT_URL` — endpoints for the `http` transport
/// - `STORE_TIMEOUT_MS`, `EMIT_TIMEOUT_MS` — call bounds (default: `5000`)
/// - `UPDATE_MAX_ATTEMPTS` — status update retries on conflict (default: `3`)
/// - `SIMULATE_SERVICES` — answer requests in-process (default: `false`)
/// - `REDELIVERY_MAX_ATTEMPTS` — inbound delivery attempts (default: `5`)
/// - `REDELIVERY_BACKOFF_MS` — first redelivery delay (default: `100`)
/// - `DEAD_LETTER_CAPACITY` — parked messages kept (default: `1000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub order_store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub user_lookup: UserLookup,
    pub transport: TransportKind,
    pub payment_url: Option<String>,
    pub shipment_url: Option<String>,
    pub store_timeout: Duration,
    pub emit_timeout: Duration,
    pub update_max_attempts: u32,
    pub simulate_services: bool,
    pub redelivery: RedeliveryPolicy,
    pub dead_letter_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse(&var, "PORT")?.unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            order_store: parse(&var, "ORDER_STORE")?.unwrap_or(defaults.order_store),
            database_url: var("DATABASE_URL"),
            database_max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            user_lookup: parse(&var, "USER_LOOKUP")?.unwrap_or(defaults.user_lookup),
            transport: parse(&var, "EVENT_TRANSPORT")?.unwrap_or(defaults.transport),
            payment_url: var("PAYMENT_URL"),
            shipment_url: var("SHIPMENT_URL"),
            store_timeout: parse(&var, "STORE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            emit_timeout: parse(&var, "EMIT_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.emit_timeout),
            update_max_attempts: parse(&var, "UPDATE_MAX_ATTEMPTS")?
                .unwrap_or(defaults.update_max_attempts),
            simulate_services: parse(&var, "SIMULATE_SERVICES")?
                .unwrap_or(defaults.simulate_services),
            redelivery: RedeliveryPolicy {
                max_attempts: parse(&var, "REDELIVERY_MAX_ATTEMPTS")?
                    .unwrap_or(defaults.redelivery.max_attempts),
                initial_backoff: parse(&var, "REDELIVERY_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.redelivery.initial_backoff),
                ..defaults.redelivery
            },
            dead_letter_capacity: parse(&var, "DEAD_LETTER_CAPACITY")?
                .unwrap_or(defaults.dead_letter_capacity),
        };

        config.validate()?;
        Ok(config)
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.order_store == StoreBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Missing {
                key: "DATABASE_URL",
                context: "ORDER_STORE=postgres",
            });
        }
        if self.transport == TransportKind::Http && self.payment_url.is_none() {
            return Err(ConfigError::Missing {
                key: "PAYMENT_URL",
                context: "EVENT_TRANSPORT=http",
            });
        }

        let in_process = matches!(self.transport, TransportKind::Queue | TransportKind::Bus);
        if self.simulate_services && !in_process {
            return Err(ConfigError::Invalid {
                key: "SIMULATE_SERVICES",
                value: "true".to_string(),
                reason: format!("simulated services need the queue or bus transport, not {}", self.transport),
            });
        }
        if self.transport == TransportKind::Queue && !self.simulate_services {
            return Err(ConfigError::Invalid {
                key: "EVENT_TRANSPORT",
                value: self.transport.to_string(),
                reason: "the in-process queue has no consumer unless SIMULATE_SERVICES=true"
                    .to_string(),
            });
        }
        for (key, value) in [
            ("UPDATE_MAX_ATTEMPTS", self.update_max_attempts as usize),
            ("REDELIVERY_MAX_ATTEMPTS", self.redelivery.max_attempts as usize),
            ("DATABASE_MAX_CONNECTIONS", self.database_max_connections as usize),
            ("DEAD_LETTER_CAPACITY", self.dead_letter_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    value: value.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse<T, F>(var: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            order_store: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 5,
            user_lookup: UserLookup::Index,
            transport: TransportKind::Log,
            payment_url: None,
            shipment_url: None,
            store_timeout: Duration::from_millis(5000),
            emit_timeout: Duration::from_millis(5000),
            update_max_attempts: 3,
            simulate_services: false,
            redelivery: RedeliveryPolicy::default(),
            dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.order_store, StoreBackend::Memory);
        assert_eq!(config.user_lookup, UserLookup::Index);
        assert_eq!(config.transport, TransportKind::Log);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.update_max_attempts, 3);
        assert_eq!(config.redelivery.max_attempts, 5);
        assert_eq!(config.redelivery.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.dead_letter_capacity, 1000);
        assert!(!config.simulate_services);
    }

    #[test]
    fn test_addr_formatting() {
        let config = load(&[("HOST", "127.0.0.1"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_backend_selection() {
        let config = load(&[
            ("ORDER_STORE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("USER_LOOKUP", "scan"),
            ("EVENT_TRANSPORT", "bus"),
            ("SIMULATE_SERVICES", "true"),
            ("STORE_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert_eq!(config.order_store, StoreBackend::Postgres);
        assert_eq!(config.user_lookup, UserLookup::Scan);
        assert_eq!(config.transport, TransportKind::Bus);
        assert!(config.simulate_services);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("EVENT_TRANSPORT", "kafka")]),
            Err(ConfigError::Invalid {
                key: "EVENT_TRANSPORT",
                ..
            })
        ));
        assert!(matches!(
            load(&[("UPDATE_MAX_ATTEMPTS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            load(&[("DEAD_LETTER_CAPACITY", "0")]),
            Err(ConfigError::Invalid {
                key: "DEAD_LETTER_CAPACITY",
                ..
            })
        ));
    }

    #[test]
    fn test_backend_requirements() {
        assert!(matches!(
            load(&[("ORDER_STORE", "postgres")]),
            Err(ConfigError::Missing {
                key: "DATABASE_URL",
                ..
            })
        ));
        assert!(matches!(
            load(&[("EVENT_TRANSPORT", "http")]),
            Err(ConfigError::Missing {
                key: "PAYMENT_URL",
                ..
            })
        ));
        assert!(load(&[("EVENT_TRANSPORT", "queue")]).is_err());
        assert!(load(&[("SIMULATE_SERVICES", "true")]).is_err());
    }
}

use anyhow::{bail, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Where rate limit records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => bail!("unknown rate limit store '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window: Duration,
    pub max_requests: u32,
    pub store: StoreBackend,
    /// How often stale records are pruned. Zero disables pruning.
    pub prune_interval: Duration,
    /// Records untouched for this many windows are pruned.
    pub retention_windows: u32,
    pub max_contention_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(60),
            max_requests: 100,
            store: StoreBackend::Memory,
            prune_interval: Duration::from_secs(300),
            retention_windows: 10,
            max_contention_retries: 32,
        }
    }
}

impl RateLimitConfig {
    /// Age after which a record is considered abandoned.
    pub fn retention(&self) -> Duration {
        self.window.saturating_mul(self.retention_windows.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        if self.max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be greater than zero");
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let default_store = if database_url.is_some() { "postgres" } else { "memory" };

        let rate_limit = RateLimitConfig {
            enabled: env::var("RATE_LIMIT_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            window: Duration::from_secs(
                env::var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()?,
            ),
            max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            store: env::var("RATE_LIMIT_STORE")
                .unwrap_or_else(|_| default_store.to_string())
                .parse()?,
            prune_interval: Duration::from_secs(
                env::var("RATE_LIMIT_PRUNE_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()?,
            ),
            retention_windows: env::var("RATE_LIMIT_RETENTION_WINDOWS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            max_contention_retries: env::var("RATE_LIMIT_MAX_CONTENTION_RETRIES")
                .unwrap_or_else(|_| "32".to_string())
                .parse()?,
        };
        rate_limit.validate()?;

        if rate_limit.store == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when RATE_LIMIT_STORE=postgres");
        }

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(" Postgres ".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_rate_limit_defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.retention(), Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let zero_window = RateLimitConfig {
            window: Duration::ZERO,
            ..RateLimitConfig::default()
        };
        assert!(zero_window.validate().is_err());

        let zero_max = RateLimitConfig {
            max_requests: 0,
            ..RateLimitConfig::default()
        };
        assert!(zero_max.validate().is_err());
    }
}

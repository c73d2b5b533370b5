//! Application configuration loaded from environment variables.

use std::env;

use quill_infra::JwtConfig;
use quill_infra::database::{DatabaseConfig, SecondaryDbConfig};
#[cfg(feature = "rate-limit")]
use quill_infra::RateLimitConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on the in-memory repositories.
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[cfg(feature = "rate-limit")]
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|main_url| DatabaseConfig {
            main_url,
            main_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            main_min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            secondary_databases: parse_secondary_databases(env::vars()),
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database,
            jwt: JwtConfig::from_env(),
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig::from_env(),
        }
    }
}

/// Secondary pools come from `SECONDARY_DB_<NAME>=<URL>[,<MAX_CONNECTIONS>]`,
/// e.g. `SECONDARY_DB_REPORTING=postgres://...,5`.
fn parse_secondary_databases(vars: impl Iterator<Item = (String, String)>) -> Vec<SecondaryDbConfig> {
    let mut secondary: Vec<SecondaryDbConfig> = vars
        .filter_map(|(key, value)| {
            let name = key.strip_prefix("SECONDARY_DB_")?;
            let mut parts = value.splitn(2, ',');
            let url = parts.next().filter(|u| !u.is_empty())?;
            let max_connections = parts.next().and_then(|s| s.trim().parse().ok()).unwrap_or(5);

            Some(SecondaryDbConfig {
                name: name.to_lowercase(),
                url: url.to_string(),
                max_connections,
            })
        })
        .collect();

    secondary.sort_by(|a, b| a.name.cmp(&b.name));
    secondary
}

use std::env;
use std::time::Duration;

use crate::infrastructure::persistence::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    /// Actor recorded when a request names none
    pub system_actor: String,
    pub retry: RetryPolicy,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://storekeep.db?mode=rwc".to_string()
            } else {
                format!("sqlite://storekeep_{}.db?mode=rwc", profile)
            }
        });

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new()
            .with_max_attempts(parse_var("RETRY_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts))
            .with_base_delay(
                parse_var("RETRY_BASE_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.base_delay),
            )
            .with_max_delay(
                parse_var("RETRY_MAX_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.max_delay),
            );

        Self {
            database_url,
            port: parse_var("PORT").unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(Vec::new),
            system_actor: env::var("SYSTEM_ACTOR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "system".to_string()),
            profile,
            retry,
        }
    }

    /// In-memory configuration for tests and embedded use
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
            profile: "test".to_string(),
            system_actor: "system".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

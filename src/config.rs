use std::env;
use std::net::SocketAddr;

use clap::Parser;

use crate::balldontlie::DEFAULT_BASE_URL;
use crate::error::ConfigError;

/// Environment variable holding the BallDontLie API key.
pub const API_KEY_ENV: &str = "BALLDONTLIE_API_KEY";

/// Misspelled variant still honored for existing deployments.
pub const API_KEY_ENV_FALLBACK: &str = "BALDONTLIE_API_KEY";

/// Largest page size the games endpoint accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Runtime configuration, from flags or the environment.
#[derive(Debug, Parser)]
#[command(name = "nba-games-dashboard", version, about = "NBA schedule dashboard")]
pub struct Config {
    /// Address the dashboard listens on.
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: SocketAddr,

    /// Base URL of the games API.
    #[arg(long, env = "BALLDONTLIE_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Rows requested per API page.
    #[arg(long, env = "PER_PAGE", default_value_t = MAX_PER_PAGE)]
    pub per_page: u32,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidPerPage {
                value: self.per_page,
                max: MAX_PER_PAGE,
            });
        }
        Ok(())
    }
}

/// Read the API key from the environment. The correctly spelled variable
/// wins; empty values count as unset.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    for name in [API_KEY_ENV, API_KEY_ENV_FALLBACK] {
        if let Ok(value) = env::var(name) {
            if !value.is_empty() {
                return Ok(value);
            }
        }
    }
    Err(ConfigError::MissingApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_local_use() {
        let config = Config::try_parse_from(["nba-games-dashboard"]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.per_page, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn per_page_bounds_are_enforced() {
        let parse = |value: &str| {
            Config::try_parse_from(["nba-games-dashboard", "--per-page", value]).unwrap()
        };
        assert!(parse("0").validate().is_err());
        assert!(parse("101").validate().is_err());
        assert!(parse("1").validate().is_ok());
        assert!(parse("100").validate().is_ok());
    }

    // Single test so the two variables are never mutated concurrently.
    #[test]
    fn api_key_resolution_prefers_the_primary_variable() {
        unsafe {
            env::remove_var(API_KEY_ENV);
            env::remove_var(API_KEY_ENV_FALLBACK);
        }
        assert!(api_key_from_env().is_err());

        unsafe { env::set_var(API_KEY_ENV_FALLBACK, "fallback-key") };
        assert_eq!(api_key_from_env().unwrap(), "fallback-key");

        // An empty primary does not shadow the fallback.
        unsafe { env::set_var(API_KEY_ENV, "") };
        assert_eq!(api_key_from_env().unwrap(), "fallback-key");

        unsafe { env::set_var(API_KEY_ENV, "primary-key") };
        assert_eq!(api_key_from_env().unwrap(), "primary-key");

        unsafe {
            env::remove_var(API_KEY_ENV);
            env::remove_var(API_KEY_ENV_FALLBACK);
        }
    }
}

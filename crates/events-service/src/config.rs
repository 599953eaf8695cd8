//! Events service configuration.
//!
//! Configuration is loaded once from environment variables, validated, and
//! treated as immutable afterwards.

use crate::auth::jwks::{DEFAULT_CACHE_TTL_SECONDS, DEFAULT_FETCH_TIMEOUT_SECONDS};
use crate::auth::jwt::{is_rsa_algorithm, AuthSettings};
use common::jwt::{DEFAULT_LEEWAY, MAX_LEEWAY};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default number of extra JWKS fetch attempts.
pub const DEFAULT_FETCH_RETRIES: u32 = 1;

/// Upper bound on the per-attempt JWKS fetch timeout.
pub const MAX_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Upper bound on extra JWKS fetch attempts.
pub const MAX_FETCH_RETRIES: u32 = 5;

/// Events service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider domain (e.g. "tenant.us.auth0.com").
    pub auth0_domain: String,

    /// Closed allow-list of accepted signature algorithms.
    pub algorithms: Vec<Algorithm>,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// Expected `iss` claim (default: `https://<domain>/`).
    pub api_issuer: String,

    /// JWKS endpoint (default: `https://<domain>/.well-known/jwks.json`).
    pub jwks_url: String,

    /// How long a fetched key set is served before it is refetched.
    pub jwks_cache_ttl: Duration,

    /// Background refresh period; `None` means lazy refresh only.
    pub jwks_refresh_interval: Option<Duration>,

    /// Per-attempt JWKS request timeout.
    pub jwks_fetch_timeout: Duration,

    /// Extra JWKS fetch attempts after the first.
    pub jwks_fetch_retries: u32,

    /// Clock tolerance applied to `exp`.
    pub jwt_leeway: Duration,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWKS configuration: {0}")]
    InvalidJwks(String),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidJwtLeeway(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth0_domain = required(vars, "AUTH0_DOMAIN")?;
        let algorithms = parse_algorithms(&required(vars, "ALGORITHMS")?)?;
        let api_audience = required(vars, "API_AUDIENCE")?;

        let api_issuer = vars
            .get("API_ISSUER")
            .cloned()
            .unwrap_or_else(|| format!("https://{auth0_domain}/"));

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{auth0_domain}/.well-known/jwks.json"));

        let jwks_cache_ttl = match vars.get("JWKS_CACHE_TTL_SECONDS") {
            Some(value_str) => {
                let value = parse_u64("JWKS_CACHE_TTL_SECONDS", value_str, ConfigError::InvalidJwks)?;
                if value == 0 {
                    return Err(ConfigError::InvalidJwks(
                        "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                    ));
                }
                Duration::from_secs(value)
            }
            None => Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
        };

        let jwks_refresh_interval = match vars.get("JWKS_REFRESH_INTERVAL_SECONDS") {
            Some(value_str) => {
                let value = parse_u64(
                    "JWKS_REFRESH_INTERVAL_SECONDS",
                    value_str,
                    ConfigError::InvalidJwks,
                )?;
                if value == 0 {
                    return Err(ConfigError::InvalidJwks(
                        "JWKS_REFRESH_INTERVAL_SECONDS must be greater than 0".to_string(),
                    ));
                }
                Some(Duration::from_secs(value))
            }
            None => None,
        };

        let jwks_fetch_timeout = match vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
            Some(value_str) => {
                let value = parse_u64(
                    "JWKS_FETCH_TIMEOUT_SECONDS",
                    value_str,
                    ConfigError::InvalidJwks,
                )?;
                if value == 0 || value > MAX_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidJwks(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {MAX_FETCH_TIMEOUT_SECONDS}, got {value}"
                    )));
                }
                Duration::from_secs(value)
            }
            None => Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
        };

        let jwks_fetch_retries = match vars.get("JWKS_FETCH_RETRIES") {
            Some(value_str) => {
                let value: u32 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwks(format!(
                        "JWKS_FETCH_RETRIES must be a valid integer, got '{value_str}': {e}"
                    ))
                })?;
                if value > MAX_FETCH_RETRIES {
                    return Err(ConfigError::InvalidJwks(format!(
                        "JWKS_FETCH_RETRIES must not exceed {MAX_FETCH_RETRIES}, got {value}"
                    )));
                }
                value
            }
            None => DEFAULT_FETCH_RETRIES,
        };

        let jwt_leeway = match vars.get("JWT_LEEWAY_SECONDS") {
            Some(value_str) => {
                let value = parse_u64("JWT_LEEWAY_SECONDS", value_str, ConfigError::InvalidJwtLeeway)?;
                if value > MAX_LEEWAY.as_secs() {
                    return Err(ConfigError::InvalidJwtLeeway(format!(
                        "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {value}",
                        MAX_LEEWAY.as_secs()
                    )));
                }
                Duration::from_secs(value)
            }
            None => DEFAULT_LEEWAY,
        };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Config {
            auth0_domain,
            algorithms,
            api_audience,
            api_issuer,
            jwks_url,
            jwks_cache_ttl,
            jwks_refresh_interval,
            jwks_fetch_timeout,
            jwks_fetch_retries,
            jwt_leeway,
            bind_address,
        })
    }

    /// Token expectations derived from this configuration.
    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            algorithms: self.algorithms.clone(),
            audience: self.api_audience.clone(),
            issuer: self.api_issuer.clone(),
            leeway: self.jwt_leeway,
        }
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_u64(
    name: &str,
    value_str: &str,
    to_error: fn(String) -> ConfigError,
) -> Result<u64, ConfigError> {
    value_str.parse().map_err(|e| {
        to_error(format!(
            "{name} must be a valid non-negative integer, got '{value_str}': {e}"
        ))
    })
}

/// Parse a comma-separated algorithm list. Only RSA algorithms are allowed.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{name}'"))
        })?;
        if !is_rsa_algorithm(alg) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "'{name}' is not an RSA algorithm"
            )));
        }
        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "ALGORITHMS must list at least one algorithm".to_string(),
        ));
    }
    Ok(algorithms)
}

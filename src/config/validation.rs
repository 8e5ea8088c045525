//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse
//! - Validate value ranges (timeouts > 0, capacities > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontendConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{CacheRoleConfig, FrontendConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &FrontendConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.querier_url) {
        Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.querier_url",
            format!("unsupported querier url '{}'", url),
        )),
        Err(e) => errors.push(ValidationError::new(
            "upstream.querier_url",
            format!("invalid url '{}': {}", config.upstream.querier_url, e),
        )),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    validate_role("cache.search.max_entries", &config.cache.search, &mut errors);
    validate_role("cache.metrics.max_entries", &config.cache.metrics, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_role(field: &'static str, role: &CacheRoleConfig, errors: &mut Vec<ValidationError>) {
    if role.enabled && role.max_entries == 0 {
        errors.push(ValidationError::new(field, "must be greater than 0 when the cache is enabled"));
    }
}

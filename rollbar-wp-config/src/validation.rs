//! Custom validation functions for host configuration.

use std::net::SocketAddr;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static ENV_VAR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Z_][A-Z0-9_]*$").expect("env var pattern compiles"));

/// Validate that a deployment environment variable name is a plain
/// upper-case identifier.
pub fn validate_env_var_name(name: &str) -> Result<(), ValidationError> {
    if ENV_VAR_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_env_var_name"))
    }
}

/// Validate that the test endpoint bind address parses.
pub fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_listen_addr"))
}

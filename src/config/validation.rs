//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values. All errors are collected,
//! not just the first.

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::WebConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("common.ip '{0}' is not an IP address")]
    InvalidIp(String),
    #[error("common.port must be non-zero")]
    ZeroPort,
    #[error("common.core-server-rpc '{0}' is not an http(s) URL")]
    InvalidRpcUrl(String),
    #[error("common.log-level '{0}' is not one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("common.request-timeout-secs must be non-zero")]
    ZeroRequestTimeout,
    #[error("database.sqlite-file must not be empty")]
    EmptySqliteFile,
}

pub fn validate_config(config: &WebConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let common = &config.common;

    if common.ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidIp(common.ip.clone()));
    }
    if common.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    match Url::parse(&common.core_server_rpc) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidRpcUrl(common.core_server_rpc.clone())),
    }
    if !LOG_LEVELS.contains(&common.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(common.log_level.clone()));
    }
    if common.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.database.sqlite_file.trim().is_empty() {
        errors.push(ValidationError::EmptySqliteFile);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

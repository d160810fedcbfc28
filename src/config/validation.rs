//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the base URL is absolute
//! - Check header names and values are valid HTTP
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base_url {0:?} is not an absolute URL")]
    InvalidBaseUrl(String),

    #[error("user_agent {0:?} is not a valid header value")]
    InvalidUserAgent(String),

    #[error("default header name {0:?} is invalid")]
    InvalidHeaderName(String),

    #[error("default header {0:?} has an invalid value")]
    InvalidHeaderValue(String),

    #[error("request_id.header {0:?} is not a valid header name")]
    InvalidRequestIdHeader(String),
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(base) = &config.base_url {
        let absolute = Url::parse(base).is_ok_and(|url| !url.cannot_be_a_base());
        if !absolute {
            errors.push(ValidationError::InvalidBaseUrl(base.clone()));
        }
    }

    if HeaderValue::from_str(&config.user_agent).is_err() {
        errors.push(ValidationError::InvalidUserAgent(config.user_agent.clone()));
    }

    for (name, value) in &config.default_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        } else if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue(name.clone()));
        }
    }

    if config.request_id.enabled
        && HeaderName::from_bytes(config.request_id.header.as_bytes()).is_err()
    {
        errors.push(ValidationError::InvalidRequestIdHeader(
            config.request_id.header.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

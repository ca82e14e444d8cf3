//! Error types for the smart meter backfill engine.
//!
//! This module defines typed errors for the collaborators of the engine (portal and
//! store) and for configuration, so callers can tell a retryable fetch failure apart
//! from a fatal storage failure.

use thiserror::Error;

/// Result type alias using our custom error types.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error type that encompasses all application errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// InfluxDB storage errors
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Generic errors that don't fit other categories
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration value is invalid
    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Portal communication and parsing errors.
///
/// Every variant is treated by the engine as a failed fetch of the day in question.
#[derive(Error, Debug)]
pub enum PortalError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Login was rejected (401/403)
    #[error("authentication failed: invalid credentials")]
    AuthFailed,

    /// Server returned an error status
    #[error("server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The portal did not accept the requested date range
    #[error("date range not applied: requested {requested}, portal shows {from}-{to}")]
    DateMismatch {
        requested: String,
        from: String,
        to: String,
    },

    /// HTML parsing failed
    #[error("HTML parsing error")]
    Parse(#[from] ParseError),
}

/// HTML parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Invalid CSS selector
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Unexpected HTML structure
    #[error("unexpected HTML structure: {0}")]
    UnexpectedStructure(String),
}

/// InfluxDB storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// HTTP request to the query API failed
    #[error("InfluxDB query request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Query API answered with an error status
    #[error("InfluxDB query failed (status {status}): {message}")]
    QueryFailed { status: u16, message: String },

    /// Query response could not be decoded
    #[error("malformed query response: {0}")]
    MalformedResponse(String),

    /// Write operation failed
    #[error("failed to write {count} data points: {message}")]
    WriteFailed { count: usize, message: String },

    /// Invalid data point
    #[error("invalid data point: {0}")]
    InvalidDataPoint(String),
}

impl ConfigError {
    /// Creates a new invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl PortalError {
    /// Creates an error from a non-success HTTP status and the response body.
    pub fn server_error(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::AuthFailed,
            code => Self::ServerError {
                status: code,
                message: body,
            },
        }
    }
}

impl ParseError {
    /// Creates an invalid selector error.
    pub fn invalid_selector(selector: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: err.to_string(),
        }
    }
}

impl StorageError {
    /// Creates a write failed error.
    pub fn write_failed(count: usize, err: impl std::fmt::Display) -> Self {
        Self::WriteFailed {
            count,
            message: err.to_string(),
        }
    }

    /// Creates a query failed error.
    pub fn query_failed(status: u16, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            status,
            message: message.into(),
        }
    }
}

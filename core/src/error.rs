//! Error types for the feature toggle client.
//!
//! # Design
//! The variants follow what a caller can observe on the wire. A non-2xx
//! response is split three ways depending on how much of the `{"error": ..}`
//! envelope could be read, so the rendered message is always the most
//! specific one available. `Display` output is what ends up in the error
//! branch of a completion handler, after the controller adds its label.

use thiserror::Error;

/// Errors produced while building requests, executing them, or parsing
/// responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response carrying `{"error": "<message>"}`.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Non-2xx response whose JSON body has no `error` field.
    #[error("Unknown error")]
    UnknownServerError { status: u16 },

    /// Non-2xx response whose body is missing or not JSON.
    #[error("Failed to parse error response.")]
    MalformedErrorBody { status: u16 },

    /// 2xx response without the payload a list operation needs.
    #[error("No data received")]
    EmptyBody,

    /// The response body could not be decoded into the expected type.
    #[error("Failed to parse {what} response: {reason}")]
    Deserialization { what: &'static str, reason: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// No response was received at all.
    #[error("Error: {0}")]
    Transport(String),

    /// The configured base URL cannot be used to build endpoint URLs.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The worker runtime that runs dispatched calls could not be started.
    #[error("failed to start worker runtime: {0}")]
    Runtime(String),
}

impl ApiError {
    /// HTTP status of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. }
            | ApiError::UnknownServerError { status }
            | ApiError::MalformedErrorBody { status } => Some(*status),
            _ => None,
        }
    }
}

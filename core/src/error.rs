//! Error types for the API client.
//!
//! # Design
//! Only HTTP-level failures are normalized (`RequestFailed`). Network
//! failures keep the transport's own error as their `source()`. Token storage
//! failures have their own `StorageError`, which the client logs and drops.

use serde_json::Value;
use thiserror::Error;

/// Message used when neither the payload nor the status line explains a failure.
pub const FALLBACK_MESSAGE: &str = "Request failed";

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `ApiClient` and `RestClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    RequestFailed {
        status: u16,
        message: String,
        /// Parsed error body, `None` when empty or not JSON.
        payload: Option<Value>,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A JSON envelope could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            ApiError::RequestFailed { payload, .. } => payload.as_ref(),
            _ => None,
        }
    }
}

/// The transport could not complete the exchange (DNS, connect, timeout, I/O).
#[derive(Debug, Error)]
#[error("transport error: {source}")]
pub struct TransportError {
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn into_inner(self) -> BoxError {
        self.source
    }
}

/// A token store could not persist or remove a value.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token storage unavailable: {0}")]
    Unavailable(String),
}

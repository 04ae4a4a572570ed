//! Unified error handling for client operations.

use crate::transport::TransportError;
use flute_engine::ModelInstance;
use serde_json::Value;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Engine error: {0}")]
    Engine(#[from] flute_engine::Error),

    #[error("No dispatcher attached to the client")]
    NotConfigured,

    #[error("#<{0}> has no id")]
    UnsavedRecord(String),

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Request failed with status {status}")]
    Response { status: u16, body: Value },

    /// A save the server refused. The instance carries `_request` and `errors`.
    #[error("#<{}> was rejected with status {}", .0.name(), .0.request().status.unwrap_or_default())]
    Rejected(Box<ModelInstance>),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status of a refused request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Response { status, .. } => Some(*status),
            ClientError::Rejected(instance) => instance.request().status,
            _ => None,
        }
    }

    /// The rejected instance of a failed save.
    pub fn rejected(&self) -> Option<&ModelInstance> {
        match self {
            ClientError::Rejected(instance) => Some(instance),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

//! Protocol error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Message is missing the 'type' field")]
    MissingType,

    #[error("Unknown message type: '{0}'")]
    UnknownType(String),

    #[error("Invalid payload for '{kind}': {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

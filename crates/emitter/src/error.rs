use thiserror::Error;

/// Errors that can occur when publishing an event.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport failed to hand the message over.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The receiving endpoint answered with a non-success status.
    #[error("Event rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The transport has no destination for this event type.
    #[error("No destination configured for {0}")]
    NoRoute(String),

    /// The receiving side of the channel is gone.
    #[error("Transport closed")]
    Closed,
}

impl From<reqwest::Error> for EmitError {
    fn from(err: reqwest::Error) -> Self {
        EmitError::Transport(err.to_string())
    }
}

/// Result type for emit operations.
pub type Result<T> = std::result::Result<T, EmitError>;

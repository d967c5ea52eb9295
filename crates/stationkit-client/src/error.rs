/// Errors that can occur in client and producer operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] stationkit_transport::TransportError),

    /// Schema loading or validation error.
    #[error("schema error: {0}")]
    Schema(#[from] stationkit_schema::SchemaError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The broker rejected the request.
    #[error("broker error: {0}")]
    Broker(String),

    /// A station or producer name is not acceptable.
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    /// The producer was already destroyed.
    #[error("producer {0} destroyed")]
    ProducerDestroyed(String),

    /// The client has been closed.
    #[error("client closed")]
    Closed,
}

impl ClientError {
    /// True when a payload was rejected by the station's schema.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, ClientError::Schema(err) if err.is_validation_failure())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

use std::time::Duration;

/// Errors that can occur in broker transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the broker.
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// A request could not be delivered or answered.
    #[error("request on {subject} failed: {message}")]
    Request { subject: String, message: String },

    /// Nobody is listening for requests on the subject.
    #[error("no responders on {0}")]
    NoResponders(String),

    /// The request was delivered but nobody replied.
    #[error("no reply on {0}")]
    NoReply(String),

    /// A request did not complete in time.
    #[error("request on {subject} timed out after {timeout:?}")]
    Timeout { subject: String, timeout: Duration },

    /// Publishing a message failed.
    #[error("publish on {subject} failed: {message}")]
    Publish { subject: String, message: String },

    /// Creating a subscription failed.
    #[error("subscribe on {subject} failed: {message}")]
    Subscribe { subject: String, message: String },

    /// Unsubscribing or draining a subscription failed.
    #[error("unsubscribe from {subject} failed: {message}")]
    Unsubscribe { subject: String, message: String },

    /// The subscriber fell behind and messages were dropped.
    #[error("subscription on {subject} lagged, {skipped} messages skipped")]
    Lagged { subject: String, skipped: u64 },

    /// The transport has been shut down.
    #[error("transport shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

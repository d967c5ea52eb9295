use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Message headers. Ordered so encoded output is stable.
pub type Headers = BTreeMap<String, String>;

/// A message delivered on a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub headers: Headers,
    pub payload: Bytes,
}

impl Message {
    /// Create a message without headers.
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            headers: Headers::new(),
            payload: payload.into(),
        }
    }
}

/// A connection to the broker.
///
/// Implementations must be shareable across tasks: the client holds one
/// instance behind an `Arc` and calls it from producers and from every
/// background listener concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the single reply.
    ///
    /// The timeout is owned by the transport.
    async fn request(&self, subject: &str, payload: Bytes) -> Result<Bytes>;

    /// Publish a message without waiting for a reply.
    async fn publish(&self, subject: &str, headers: Headers, payload: Bytes) -> Result<()>;

    /// Subscribe to a subject.
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>>;
}

/// A live subscription on one subject.
#[async_trait]
pub trait Subscription: Send {
    /// Subject this subscription listens on.
    fn subject(&self) -> &str;

    /// Wait for the next message.
    ///
    /// Blocks with no timeout. Returns `None` once the subscription is
    /// unsubscribed, fully drained, or the transport is closed. An `Err`
    /// item is a per-message failure; the subscription stays usable.
    async fn next_message(&mut self) -> Option<Result<Message>>;

    /// Stop delivery immediately, discarding anything buffered.
    async fn unsubscribe(&mut self) -> Result<()>;

    /// Stop accepting new messages but keep delivering those already in
    /// flight. `next_message` returns `None` once they are consumed.
    async fn drain(&mut self) -> Result<()>;
}

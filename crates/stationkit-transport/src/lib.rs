//! Broker transport abstraction.
//!
//! Provides the two primitives the client runtime needs from a broker
//! connection:
//! - request/reply with an implicit timeout
//! - subject subscriptions with blocking receive, unsubscribe and drain
//!
//! This is the lowest layer of stationkit. Everything else talks to the
//! broker through the [`Transport`] trait provided here.

pub mod error;
pub mod local;
pub mod traits;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::{Result, TransportError};
pub use local::LocalBus;
pub use traits::{Headers, Message, Subscription, Transport};

#[cfg(feature = "nats")]
pub use nats::NatsTransport;

//! Schema-enforcing producer runtime for station-based pub/sub brokers.
//!
//! Producers publish to stations. A station may enforce a schema that the
//! broker pushes at any time; stationkit keeps a local copy of every active
//! schema and rejects payloads that do not conform before they are sent.
//!
//! # Crate Structure
//!
//! - [`transport`]: broker request/reply and subscriptions (in-process bus, NATS behind `nats`)
//! - [`schema`]: per-format schema validators and their registry
//! - [`client`]: producers, station listeners and the validation gate

/// Re-export transport types.
pub mod transport {
    pub use stationkit_transport::*;
}

/// Re-export schema types.
pub mod schema {
    pub use stationkit_schema::*;
}

/// Re-export client types.
pub mod client {
    pub use stationkit_client::*;
}

pub use stationkit_client::{Client, ClientConfig, ClientError, Producer};

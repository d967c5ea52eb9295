//! Producer runtime with background schema synchronization.
//!
//! This is the "just works" layer. Create producers on stations, produce
//! messages, and every payload is checked against the schema the broker
//! currently enforces for its station. Schema state is seeded when the first
//! producer of a station is created and kept current by one background
//! listener per station until the last producer is destroyed.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod listener;
pub mod producer;
pub mod protocol;
pub mod registry;
pub mod station;
pub mod sync;

pub use cache::{SchemaDescriptor, SchemaStateCache};
pub use client::Client;
pub use config::{ClientConfig, SubjectConfig};
pub use error::{ClientError, Result};
pub use gate::MessageValidationGate;
pub use listener::{ListenerState, SchemaUpdateListener};
pub use producer::Producer;
pub use protocol::{
    ActiveVersion, CreateProducerRequest, CreateProducerResponse, DeadLetterRecord,
    DestroyProducerRequest, Notification, SchemaInit, SchemaUpdate,
};
pub use registry::ProducerStationRegistry;
pub use station::{internal_station_name, validate_name};
pub use sync::SchemaSync;

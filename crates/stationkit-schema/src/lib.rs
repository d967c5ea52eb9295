//! Schema validation for produced payloads.
//!
//! Each supported format has a [`SchemaValidator`] that owns a cache of
//! compiled schemas keyed by schema name. A [`ValidatorRegistry`] maps the
//! closed set of [`SchemaFormat`] tags to those validators.
//!
//! JSON Schema and GraphQL are enforced. Protobuf is recognized but every
//! operation on it reports [`SchemaError::Unimplemented`].

pub mod config;
pub mod error;
pub mod format;
pub mod graphql;
pub mod json;
pub mod protobuf;
pub mod registry;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{Result, SchemaError};
pub use format::SchemaFormat;
pub use graphql::GraphqlValidator;
pub use json::JsonSchemaValidator;
pub use protobuf::ProtobufValidator;
pub use registry::ValidatorRegistry;
pub use validator::SchemaValidator;

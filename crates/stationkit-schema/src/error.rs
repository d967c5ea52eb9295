use crate::format::SchemaFormat;

/// Errors that can occur while loading schemas or validating payloads.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The schema content could not be parsed or compiled.
    #[error("failed to parse {format} schema {schema}: {reason}")]
    ParseFailed {
        format: SchemaFormat,
        schema: String,
        reason: String,
    },

    /// The schema content exceeds the configured size limit.
    #[error("{format} schema {schema} too large ({size} bytes, max {max})")]
    SchemaTooLarge {
        format: SchemaFormat,
        schema: String,
        size: usize,
        max: usize,
    },

    /// The payload does not satisfy the schema.
    #[error("schema validation failed for {schema}: {reason}")]
    ValidationFailed { schema: String, reason: String },

    /// The format is recognized but has no implementation.
    #[error("{0} schemas are not implemented")]
    Unimplemented(SchemaFormat),

    /// The schema type tag is not one of the known formats.
    #[error("unknown schema type: {0}")]
    UnknownFormat(String),

    /// Two validators were registered for the same format.
    #[error("validator for {0} registered twice")]
    DuplicateFormat(SchemaFormat),

    /// No validator is registered for the format.
    #[error("no validator registered for {0}")]
    UnregisteredFormat(SchemaFormat),
}

impl SchemaError {
    /// True when the payload was rejected by a schema, as opposed to an
    /// operational failure loading or dispatching the schema.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, SchemaError::ValidationFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;

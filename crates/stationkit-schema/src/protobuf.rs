use crate::error::{Result, SchemaError};
use crate::format::SchemaFormat;
use crate::validator::SchemaValidator;

/// Placeholder for Protobuf schemas.
///
/// Registered so a Protobuf station is dispatched like any other format, but
/// every operation reports [`SchemaError::Unimplemented`] instead of
/// silently accepting payloads.
#[derive(Debug, Default)]
pub struct ProtobufValidator;

impl ProtobufValidator {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaValidator for ProtobufValidator {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Protobuf
    }

    fn parse_and_store(&self, _name: &str, _content: &str) -> Result<()> {
        Err(SchemaError::Unimplemented(SchemaFormat::Protobuf))
    }

    fn validate(&self, _payload: &[u8], _name: &str) -> Result<()> {
        Err(SchemaError::Unimplemented(SchemaFormat::Protobuf))
    }

    fn remove_schema(&self, _name: &str) -> bool {
        false
    }

    fn has_schema(&self, _name: &str) -> bool {
        false
    }

    fn schema_names(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_unimplemented() {
        let validator = ProtobufValidator::new();
        let parse = validator
            .parse_and_store("p", "syntax = \"proto3\"; message Test {}")
            .unwrap_err();
        let validate = validator.validate(b"\x08\x01", "p").unwrap_err();

        for err in [parse, validate] {
            assert!(matches!(
                err,
                SchemaError::Unimplemented(SchemaFormat::Protobuf)
            ));
            assert!(!err.is_validation_failure());
        }
        assert!(!validator.remove_schema("p"));
    }
}

use jsonschema::Validator;
use serde_json::Value;

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};
use crate::format::SchemaFormat;
use crate::validator::{
    check_schema_size, join_errors, schema_not_loaded, ArtifactStore, SchemaValidator,
};

/// JSON Schema validator.
///
/// Schema content is a JSON Schema document; payloads must be JSON.
pub struct JsonSchemaValidator {
    schemas: ArtifactStore<Validator>,
    config: ValidatorConfig,
}

impl JsonSchemaValidator {
    /// Create an empty validator with default config.
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create an empty validator with explicit config.
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self {
            schemas: ArtifactStore::new(),
            config,
        }
    }

    fn parse_failed(name: &str, reason: impl ToString) -> SchemaError {
        SchemaError::ParseFailed {
            format: SchemaFormat::Json,
            schema: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Json
    }

    fn parse_and_store(&self, name: &str, content: &str) -> Result<()> {
        check_schema_size(&self.config, SchemaFormat::Json, name, content)?;

        let schema: Value =
            serde_json::from_str(content).map_err(|err| Self::parse_failed(name, err))?;
        let compiled =
            jsonschema::validator_for(&schema).map_err(|err| Self::parse_failed(name, err))?;

        self.schemas.replace(name, compiled);
        tracing::debug!(schema = name, "json schema stored");
        Ok(())
    }

    fn validate(&self, payload: &[u8], name: &str) -> Result<()> {
        let validator = self.schemas.get(name).ok_or_else(|| schema_not_loaded(name))?;

        let value: Value =
            serde_json::from_slice(payload).map_err(|err| SchemaError::ValidationFailed {
                schema: name.to_string(),
                reason: format!("payload is not valid JSON: {err}"),
            })?;

        let mut errors = validator.iter_errors(&value).peekable();
        if errors.peek().is_some() {
            return Err(SchemaError::ValidationFailed {
                schema: name.to_string(),
                reason: join_errors(errors, self.config.max_error_details),
            });
        }

        Ok(())
    }

    fn remove_schema(&self, name: &str) -> bool {
        self.schemas.remove(name)
    }

    fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains(name)
    }

    fn schema_names(&self) -> Vec<String> {
        self.schemas.names()
    }
}

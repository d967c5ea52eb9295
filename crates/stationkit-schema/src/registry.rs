use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};
use crate::format::SchemaFormat;
use crate::graphql::GraphqlValidator;
use crate::json::JsonSchemaValidator;
use crate::protobuf::ProtobufValidator;
use crate::validator::SchemaValidator;

/// Format-keyed registry of schema validators.
///
/// Built once and then shared read-only; all mutable state lives in the
/// validators' own artifact stores.
pub struct ValidatorRegistry {
    validators: HashMap<SchemaFormat, Arc<dyn SchemaValidator>>,
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Create a registry with a validator for every known format.
    pub fn with_defaults() -> Result<Self> {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a registry with every known format and explicit config.
    pub fn with_config(config: ValidatorConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonSchemaValidator::with_config(config)))?;
        registry.register(Arc::new(GraphqlValidator::with_config(config)))?;
        registry.register(Arc::new(ProtobufValidator::new()))?;
        Ok(registry)
    }

    /// Register a validator for its format.
    pub fn register(&mut self, validator: Arc<dyn SchemaValidator>) -> Result<()> {
        let format = validator.format();
        if self.validators.contains_key(&format) {
            return Err(SchemaError::DuplicateFormat(format));
        }
        self.validators.insert(format, validator);
        Ok(())
    }

    /// Validator registered for `format`.
    pub fn get(&self, format: SchemaFormat) -> Result<&Arc<dyn SchemaValidator>> {
        self.validators
            .get(&format)
            .ok_or(SchemaError::UnregisteredFormat(format))
    }

    /// Compile and store a schema with the validator for `format`.
    pub fn parse_and_store(&self, format: SchemaFormat, name: &str, content: &str) -> Result<()> {
        self.get(format)?.parse_and_store(name, content)
    }

    /// Validate a payload with the validator for `format`.
    pub fn validate(&self, format: SchemaFormat, payload: &[u8], name: &str) -> Result<()> {
        self.get(format)?.validate(payload, name)
    }

    /// Evict a compiled schema. Unknown formats and names are a no-op.
    pub fn remove_schema(&self, format: SchemaFormat, name: &str) -> bool {
        self.validators
            .get(&format)
            .map(|validator| validator.remove_schema(name))
            .unwrap_or(false)
    }

    /// Whether a compiled schema is stored for `format` and `name`.
    pub fn has_schema(&self, format: SchemaFormat, name: &str) -> bool {
        self.validators
            .get(&format)
            .map(|validator| validator.has_schema(name))
            .unwrap_or(false)
    }

    /// Formats with a registered validator, sorted.
    pub fn formats(&self) -> Vec<SchemaFormat> {
        let mut formats: Vec<SchemaFormat> = self.validators.keys().copied().collect();
        formats.sort_unstable();
        formats
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

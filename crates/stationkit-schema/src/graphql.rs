use apollo_compiler::validation::Valid;
use apollo_compiler::{ExecutableDocument, Schema};

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};
use crate::format::SchemaFormat;
use crate::validator::{check_schema_size, schema_not_loaded, ArtifactStore, SchemaValidator};

/// GraphQL validator.
///
/// Schema content is SDL. Payloads are UTF-8 executable documents
/// (queries, mutations, subscriptions) checked against the schema.
pub struct GraphqlValidator {
    schemas: ArtifactStore<Valid<Schema>>,
    config: ValidatorConfig,
}

impl GraphqlValidator {
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
}

impl Default for GraphqlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator for GraphqlValidator {
    fn format(&self) -> SchemaFormat {
        SchemaFormat::Graphql
    }

    fn parse_and_store(&self, name: &str, content: &str) -> Result<()> {
        check_schema_size(&self.config, SchemaFormat::Graphql, name, content)?;

        let schema = Schema::parse_and_validate(content, format!("{name}.graphql")).map_err(
            |invalid| SchemaError::ParseFailed {
                format: SchemaFormat::Graphql,
                schema: name.to_string(),
                reason: invalid.errors.to_string(),
            },
        )?;

        self.schemas.replace(name, schema);
        tracing::debug!(schema = name, "graphql schema stored");
        Ok(())
    }

    fn validate(&self, payload: &[u8], name: &str) -> Result<()> {
        let schema = self.schemas.get(name).ok_or_else(|| schema_not_loaded(name))?;

        let document = std::str::from_utf8(payload).map_err(|err| {
            SchemaError::ValidationFailed {
                schema: name.to_string(),
                reason: format!("payload is not valid UTF-8: {err}"),
            }
        })?;

        ExecutableDocument::parse_and_validate(&schema, document, "payload.graphql")
            .map(|_| ())
            .map_err(|invalid| SchemaError::ValidationFailed {
                schema: name.to_string(),
                reason: invalid.errors.to_string(),
            })
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

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP_SDL: &str = r#"
        type Query {
            order(id: ID!): Order
        }

        type Order {
            id: ID!
            sku: String
            quantity: Int
        }
    "#;

    #[test]
    fn parse_and_validate_query() {
        let validator = GraphqlValidator::new();
        validator.parse_and_store("shop", SHOP_SDL).unwrap();

        assert!(validator
            .validate(br#"query { order(id: "1") { id sku } }"#, "shop")
            .is_ok());
    }

    #[test]
    fn unknown_field_fails_validation() {
        let validator = GraphqlValidator::new();
        validator.parse_and_store("shop", SHOP_SDL).unwrap();

        let err = validator
            .validate(br#"query { order(id: "1") { price } }"#, "shop")
            .unwrap_err();
        assert!(err.is_validation_failure());
    }

    #[test]
    fn syntax_error_and_non_utf8_fail_validation() {
        let validator = GraphqlValidator::new();
        validator.parse_and_store("shop", SHOP_SDL).unwrap();

        assert!(validator
            .validate(b"query { order(", "shop")
            .unwrap_err()
            .is_validation_failure());
        assert!(validator
            .validate(&[0xff, 0xfe], "shop")
            .unwrap_err()
            .is_validation_failure());
    }

    #[test]
    fn invalid_sdl_fails_parse() {
        let validator = GraphqlValidator::new();
        assert!(matches!(
            validator.parse_and_store("broken", "type Query { order: MissingType }"),
            Err(SchemaError::ParseFailed { .. })
        ));
        assert!(!validator.has_schema("broken"));
    }

    #[test]
    fn missing_schema_and_idempotent_remove() {
        let validator = GraphqlValidator::new();
        assert!(validator
            .validate(b"{ order(id: \"1\") { id } }", "shop")
            .unwrap_err()
            .is_validation_failure());

        validator.parse_and_store("shop", SHOP_SDL).unwrap();
        assert!(validator.remove_schema("shop"));
        assert!(!validator.remove_schema("shop"));
    }
}

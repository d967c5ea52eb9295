use std::sync::Arc;

use stationkit_schema::{SchemaError, ValidatorRegistry};
use tracing::{debug, error, warn};

use crate::cache::{SchemaDescriptor, SchemaStateCache};
use crate::protocol::SchemaUpdate;

/// Keeps the station cache and the compiled artifacts in step.
///
/// Shared by the listeners (writers) and the validation gate (reader).
#[derive(Clone)]
pub struct SchemaSync {
    cache: Arc<SchemaStateCache>,
    validators: Arc<ValidatorRegistry>,
}

impl SchemaSync {
    pub fn new(cache: Arc<SchemaStateCache>, validators: Arc<ValidatorRegistry>) -> Self {
        Self { cache, validators }
    }

    pub fn cache(&self) -> &Arc<SchemaStateCache> {
        &self.cache
    }

    pub fn validators(&self) -> &Arc<ValidatorRegistry> {
        &self.validators
    }

    /// Apply a broker snapshot to `station`.
    ///
    /// Returns true when the station's descriptor was replaced. Compile
    /// failures are logged and leave the previous artifact in place; they
    /// never fail the caller. When the station moves to another schema the
    /// old artifact is dropped unless another station still enforces it.
    pub fn apply(&self, station: &str, update: &SchemaUpdate) -> bool {
        let Some(init) = update.schema_init() else {
            debug!(station, "schema update without schema name ignored");
            return false;
        };

        let descriptor = match SchemaDescriptor::from_init(init) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => return false,
            Err(err) => {
                warn!(station, schema = %init.schema_name, error = %err, "schema update ignored");
                return false;
            }
        };

        let format = descriptor.format;
        let schema_name = descriptor.schema_name.clone();
        let content = descriptor.content.clone();
        let version = descriptor.version_number;
        if let Some(previous) = self.cache.apply_update(station, descriptor) {
            let renamed = previous.format != format || previous.schema_name != schema_name;
            if renamed
                && !self
                    .cache
                    .is_schema_referenced(previous.format, &previous.schema_name)
            {
                self.validators
                    .remove_schema(previous.format, &previous.schema_name);
                debug!(station, schema = %previous.schema_name, "replaced schema dropped");
            }
        }

        match self
            .validators
            .parse_and_store(format, &schema_name, &content)
        {
            Ok(()) => {
                debug!(station, schema = %schema_name, %format, ?version, "schema applied");
            }
            Err(err @ SchemaError::Unimplemented(_)) => {
                warn!(station, schema = %schema_name, error = %err, "schema stored but not enforceable");
            }
            Err(err) => {
                error!(station, schema = %schema_name, %format, error = %err, "failed to compile schema");
            }
        }
        true
    }

    /// Forget `station`'s schema.
    ///
    /// The compiled artifact is dropped only when no other station still
    /// enforces the same schema.
    pub fn evict(&self, station: &str) -> bool {
        let Some(descriptor) = self.cache.evict(station) else {
            return false;
        };
        if !self
            .cache
            .is_schema_referenced(descriptor.format, &descriptor.schema_name)
        {
            self.validators
                .remove_schema(descriptor.format, &descriptor.schema_name);
        }
        debug!(station, schema = %descriptor.schema_name, "schema evicted");
        true
    }

    /// Compile `descriptor` again if its artifact is missing.
    ///
    /// A schema that does not compile is returned as the parse error, not
    /// as a payload rejection.
    pub fn ensure_compiled(
        &self,
        descriptor: &SchemaDescriptor,
    ) -> stationkit_schema::Result<()> {
        if self
            .validators
            .has_schema(descriptor.format, &descriptor.schema_name)
        {
            return Ok(());
        }
        self.validators
            .parse_and_store(
                descriptor.format,
                &descriptor.schema_name,
                &descriptor.content,
            )
            .inspect_err(|err| {
                debug!(schema = %descriptor.schema_name, error = %err, "schema recompile failed");
            })
    }

    /// Drop every station entry and its artifact.
    pub fn clear(&self) {
        for station in self.cache.stations() {
            self.evict(&station);
        }
    }
}

#[cfg(test)]
mod tests {
    use stationkit_schema::SchemaFormat;

    use super::*;

    const ID_SCHEMA: &str = r#"{"type":"object","required":["id"]}"#;

    fn sync() -> SchemaSync {
        SchemaSync::new(
            Arc::new(SchemaStateCache::new()),
            Arc::new(ValidatorRegistry::with_defaults().unwrap()),
        )
    }

    #[test]
    fn apply_stores_descriptor_and_artifact() {
        let sync = sync();
        assert!(sync.apply("orders", &SchemaUpdate::new("order-v1", "json", ID_SCHEMA)));

        assert_eq!(
            sync.cache().get_schema("orders").unwrap().schema_name,
            "order-v1"
        );
        assert!(sync.validators().has_schema(SchemaFormat::Json, "order-v1"));
    }

    #[test]
    fn apply_ignores_unnamed_and_unknown() {
        let sync = sync();
        assert!(!sync.apply("orders", &SchemaUpdate::default()));
        assert!(!sync.apply("orders", &SchemaUpdate::new("x", "avro", "{}")));
        assert!(sync.cache().is_empty());
    }

    #[test]
    fn bad_content_keeps_previous_artifact() {
        let sync = sync();
        sync.apply("orders", &SchemaUpdate::new("order-v1", "json", ID_SCHEMA));
        sync.apply("orders", &SchemaUpdate::new("order-v1", "json", "{not json"));

        assert!(sync
            .validators()
            .validate(SchemaFormat::Json, br#"{"id":1}"#, "order-v1")
            .is_ok());
    }

    #[test]
    fn evict_keeps_shared_artifact() {
        let sync = sync();
        sync.apply("orders", &SchemaUpdate::new("shared", "json", ID_SCHEMA));
        sync.apply("refunds", &SchemaUpdate::new("shared", "json", ID_SCHEMA));

        assert!(sync.evict("orders"));
        assert!(sync.validators().has_schema(SchemaFormat::Json, "shared"));

        assert!(sync.evict("refunds"));
        assert!(!sync.validators().has_schema(SchemaFormat::Json, "shared"));
        assert!(!sync.evict("refunds"));
    }

    #[test]
    fn ensure_compiled_restores_artifact() {
        let sync = sync();
        sync.apply("orders", &SchemaUpdate::new("order-v1", "json", ID_SCHEMA));
        sync.validators().remove_schema(SchemaFormat::Json, "order-v1");

        let descriptor = sync.cache().get_schema("orders").unwrap();
        sync.ensure_compiled(&descriptor).unwrap();
        assert!(sync.validators().has_schema(SchemaFormat::Json, "order-v1"));
    }

    #[test]
    fn uncompilable_schema_is_a_parse_error() {
        let sync = sync();
        sync.apply("orders", &SchemaUpdate::new("broken", "json", "{not json"));

        let descriptor = sync.cache().get_schema("orders").unwrap();
        assert!(matches!(
            sync.ensure_compiled(&descriptor),
            Err(SchemaError::ParseFailed { .. })
        ));
        assert!(!sync.validators().has_schema(SchemaFormat::Json, "broken"));
    }

    #[test]
    fn renamed_schema_drops_old_artifact() {
        let sync = sync();
        sync.apply("orders", &SchemaUpdate::new("order-v1", "json", ID_SCHEMA));
        sync.apply("refunds", &SchemaUpdate::new("shared", "json", ID_SCHEMA));
        sync.apply("orders", &SchemaUpdate::new("shared", "json", ID_SCHEMA));
        assert!(!sync.validators().has_schema(SchemaFormat::Json, "order-v1"));

        // still enforced by refunds
        sync.apply("orders", &SchemaUpdate::new("order-v2", "json", ID_SCHEMA));
        assert!(sync.validators().has_schema(SchemaFormat::Json, "shared"));

        assert!(sync.evict("orders"));
        assert!(!sync.validators().has_schema(SchemaFormat::Json, "order-v2"));
    }

    #[test]
    fn protobuf_descriptor_is_kept() {
        let sync = sync();
        assert!(sync.apply("orders", &SchemaUpdate::new("p", "protobuf", "message A {}")));
        assert_eq!(
            sync.cache().get_schema("orders").unwrap().format,
            SchemaFormat::Protobuf
        );
    }

    #[test]
    fn clear_drops_everything() {
        let sync = sync();
        sync.apply("a", &SchemaUpdate::new("s1", "json", ID_SCHEMA));
        sync.apply("b", &SchemaUpdate::new("s2", "json", ID_SCHEMA));
        sync.clear();

        assert!(sync.cache().is_empty());
        assert!(!sync.validators().has_schema(SchemaFormat::Json, "s1"));
    }
}

use std::sync::Arc;

use dashmap::DashMap;
use stationkit_schema::SchemaFormat;

use crate::protocol::SchemaInit;

/// The schema a station currently enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub schema_name: String,
    pub format: SchemaFormat,
    pub content: String,
    pub version_number: Option<u32>,
}

impl SchemaDescriptor {
    /// Build a descriptor from a broker snapshot.
    ///
    /// Returns `Ok(None)` for a snapshot without schema name and an error
    /// for an unknown type tag.
    pub fn from_init(init: &SchemaInit) -> stationkit_schema::Result<Option<Self>> {
        if init.schema_name.is_empty() {
            return Ok(None);
        }
        let format = init.schema_type.parse::<SchemaFormat>()?;
        Ok(Some(Self {
            schema_name: init.schema_name.clone(),
            format,
            content: init.active_version.content.clone(),
            version_number: init.active_version.version_number,
        }))
    }
}

/// Station-keyed record of active schemas.
///
/// Keys are internal station names. Entries are replaced whole so readers
/// never observe a half-applied update.
#[derive(Debug, Default)]
pub struct SchemaStateCache {
    entries: DashMap<String, Arc<SchemaDescriptor>>,
}

impl SchemaStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active schema for a station, if any.
    pub fn get_schema(&self, station: &str) -> Option<Arc<SchemaDescriptor>> {
        self.entries
            .get(station)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Replace the station's schema with `descriptor`.
    ///
    /// A descriptor without schema name leaves the entry untouched. Returns
    /// the previous descriptor.
    pub fn apply_update(
        &self,
        station: &str,
        descriptor: SchemaDescriptor,
    ) -> Option<Arc<SchemaDescriptor>> {
        if descriptor.schema_name.is_empty() {
            return None;
        }
        self.entries
            .insert(station.to_string(), Arc::new(descriptor))
    }

    /// Drop the station's entry.
    pub fn evict(&self, station: &str) -> Option<Arc<SchemaDescriptor>> {
        self.entries.remove(station).map(|(_, descriptor)| descriptor)
    }

    /// Whether any station still enforces `format`/`schema_name`.
    pub fn is_schema_referenced(&self, format: SchemaFormat, schema_name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.format == format && entry.schema_name == schema_name)
    }

    /// Stations with an active schema, sorted.
    pub fn stations(&self) -> Vec<String> {
        let mut stations: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        stations.sort_unstable();
        stations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SchemaUpdate;

    fn descriptor(name: &str, content: &str) -> SchemaDescriptor {
        SchemaDescriptor {
            schema_name: name.to_string(),
            format: SchemaFormat::Json,
            content: content.to_string(),
            version_number: None,
        }
    }

    #[test]
    fn descriptor_from_snapshot() {
        let update = SchemaUpdate::new("order-v1", "JSON", "{}");
        let descriptor = SchemaDescriptor::from_init(update.init.as_ref().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.format, SchemaFormat::Json);
        assert_eq!(descriptor.schema_name, "order-v1");

        let unnamed = SchemaInit::default();
        assert!(SchemaDescriptor::from_init(&unnamed).unwrap().is_none());

        let avro = SchemaUpdate::new("a", "avro", "{}");
        assert!(SchemaDescriptor::from_init(avro.init.as_ref().unwrap()).is_err());
    }

    #[test]
    fn update_replaces_whole_entry() {
        let cache = SchemaStateCache::new();
        assert!(cache.apply_update("orders", descriptor("v1", "a")).is_none());

        let previous = cache.apply_update("orders", descriptor("v2", "b")).unwrap();
        assert_eq!(previous.schema_name, "v1");

        let current = cache.get_schema("orders").unwrap();
        assert_eq!(current.schema_name, "v2");
        assert_eq!(current.content, "b");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unnamed_update_is_ignored() {
        let cache = SchemaStateCache::new();
        cache.apply_update("orders", descriptor("v1", "a"));
        assert!(cache.apply_update("orders", descriptor("", "b")).is_none());
        assert_eq!(cache.get_schema("orders").unwrap().schema_name, "v1");
    }

    #[test]
    fn evict_and_references() {
        let cache = SchemaStateCache::new();
        cache.apply_update("orders", descriptor("shared", "a"));
        cache.apply_update("refunds", descriptor("shared", "a"));

        assert!(cache.evict("orders").is_some());
        assert!(cache.evict("orders").is_none());
        assert!(cache.is_schema_referenced(SchemaFormat::Json, "shared"));
        assert!(!cache.is_schema_referenced(SchemaFormat::Graphql, "shared"));

        cache.evict("refunds");
        assert!(!cache.is_schema_referenced(SchemaFormat::Json, "shared"));
        assert!(cache.is_empty());
    }

    #[test]
    fn stations_are_sorted() {
        let cache = SchemaStateCache::new();
        cache.apply_update("b", descriptor("x", ""));
        cache.apply_update("a", descriptor("x", ""));
        assert_eq!(cache.stations(), vec!["a".to_string(), "b".to_string()]);
        cache.clear();
        assert!(cache.get_schema("a").is_none());
    }
}

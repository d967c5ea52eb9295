use std::fmt::Display;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};
use crate::format::SchemaFormat;

/// Capability set shared by every schema format.
///
/// A validator owns the compiled form of each schema it has been given,
/// keyed by schema name. Every method may be called concurrently from
/// producers and background listeners.
pub trait SchemaValidator: Send + Sync {
    /// Format this validator enforces.
    fn format(&self) -> SchemaFormat;

    /// Compile `content` and store it under `name`.
    ///
    /// On success the new artifact replaces any previous one. On failure the
    /// previous artifact, if any, is left untouched.
    fn parse_and_store(&self, name: &str, content: &str) -> Result<()>;

    /// Validate `payload` against the schema stored under `name`.
    ///
    /// A missing schema is a validation failure.
    fn validate(&self, payload: &[u8], name: &str) -> Result<()>;

    /// Evict the artifact stored under `name`. Returns whether one existed.
    fn remove_schema(&self, name: &str) -> bool;

    /// Whether an artifact is stored under `name`.
    fn has_schema(&self, name: &str) -> bool;

    /// Names of stored artifacts, sorted.
    fn schema_names(&self) -> Vec<String>;
}

/// Name-keyed store of compiled artifacts.
///
/// Locking is per shard, so validating against one schema never waits on a
/// replacement of an unrelated one.
pub(crate) struct ArtifactStore<T> {
    artifacts: DashMap<String, Arc<T>>,
}

impl<T> ArtifactStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            artifacts: DashMap::new(),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<T>> {
        self.artifacts.get(name).map(|entry| entry.value().clone())
    }

    pub(crate) fn replace(&self, name: &str, artifact: T) {
        self.artifacts.insert(name.to_string(), Arc::new(artifact));
    }

    pub(crate) fn remove(&self, name: &str) -> bool {
        self.artifacts.remove(name).is_some()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .artifacts
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort_unstable();
        names
    }
}

pub(crate) fn check_schema_size(
    config: &ValidatorConfig,
    format: SchemaFormat,
    name: &str,
    content: &str,
) -> Result<()> {
    if content.len() > config.max_schema_size {
        return Err(SchemaError::SchemaTooLarge {
            format,
            schema: name.to_string(),
            size: content.len(),
            max: config.max_schema_size,
        });
    }
    Ok(())
}

pub(crate) fn schema_not_loaded(name: &str) -> SchemaError {
    SchemaError::ValidationFailed {
        schema: name.to_string(),
        reason: "schema is not loaded".to_string(),
    }
}

/// Join up to `max` error messages into one reason string.
pub(crate) fn join_errors<E: Display>(errors: impl Iterator<Item = E>, max: usize) -> String {
    let mut message = String::new();
    for err in errors.take(max.max(1)) {
        if !message.is_empty() {
            message.push_str("; ");
        }
        message.push_str(&err.to_string());
    }
    message
}

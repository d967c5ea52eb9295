use std::time::Duration;

use stationkit_schema::ValidatorConfig;

/// Broker subjects used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfig {
    /// Request subject for producer creation.
    pub producer_creations: String,
    /// Request subject for producer destruction.
    pub producer_destructions: String,
    /// Prefix of the per-station schema update subject.
    pub schema_updates_prefix: String,
    /// Request subject for out-of-band notifications.
    pub notifications: String,
    /// Publish subject for payloads rejected by a schema.
    pub dead_letter: String,
    /// Suffix appended to the internal station name to form the produce subject.
    pub produce_suffix: String,
}

impl SubjectConfig {
    /// Schema update subject for an internal station name.
    pub fn schema_updates(&self, internal_station: &str) -> String {
        format!("{}{internal_station}", self.schema_updates_prefix)
    }

    /// Produce subject for an internal station name.
    pub fn produce(&self, internal_station: &str) -> String {
        format!("{internal_station}{}", self.produce_suffix)
    }
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            producer_creations: "$memphis_producer_creations".to_string(),
            producer_destructions: "$memphis_producer_destructions".to_string(),
            schema_updates_prefix: "$memphis_schema_updates_".to_string(),
            notifications: "$memphis_notifications".to_string(),
            dead_letter: "$memphis_schemaverse_dls".to_string(),
            produce_suffix: ".final".to_string(),
        }
    }
}

/// Client behavior config.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Username reported to the broker on producer requests.
    pub username: String,
    /// Connection identifier. Generated when `None`.
    pub connection_id: Option<String>,
    /// Request timeout applied by transports the client creates itself.
    pub request_timeout: Duration,
    /// Upper bound on draining a station's schema listener.
    pub listener_drain_timeout: Duration,
    /// Send a notification to the broker when a payload fails validation.
    pub send_notifications: bool,
    /// Limits applied by the schema validators.
    pub validator: ValidatorConfig,
    /// Broker subjects.
    pub subjects: SubjectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            connection_id: None,
            request_timeout: Duration::from_secs(20),
            listener_drain_timeout: Duration::from_secs(5),
            send_notifications: true,
            validator: ValidatorConfig::default(),
            subjects: SubjectConfig::default(),
        }
    }
}

use serde::{Deserialize, Serialize};
use stationkit_transport::Headers;

/// Producer type reported on creation.
pub const PRODUCER_TYPE: &str = "application";
/// Version of the producer request bodies.
pub const REQUEST_VERSION: u32 = 1;
/// Notification type tag for schema validation failures.
pub const SCHEMA_VALIDATION_ALERT: &str = "schema_validation_fail_alert";
/// Notification title for schema validation failures.
pub const SCHEMA_VALIDATION_TITLE: &str = "Schema validation has failed";
/// Header naming the producer of a message.
pub const HEADER_PRODUCED_BY: &str = "$memphis_producedBy";
/// Header carrying the producing connection id.
pub const HEADER_CONNECTION_ID: &str = "$memphis_connectionId";

/// Broker-pushed snapshot of a station's active schema.
///
/// The same shape is embedded in the producer creation response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<SchemaInit>,
}

impl SchemaUpdate {
    /// Update carrying a full schema snapshot.
    pub fn new(schema_name: &str, schema_type: &str, content: &str) -> Self {
        Self {
            init: Some(SchemaInit {
                schema_name: schema_name.to_string(),
                active_version: ActiveVersion {
                    content: content.to_string(),
                    version_number: None,
                },
                schema_type: schema_type.to_string(),
            }),
        }
    }

    /// The snapshot, if it names a schema. Anything else carries nothing to
    /// apply.
    pub fn schema_init(&self) -> Option<&SchemaInit> {
        self.init
            .as_ref()
            .filter(|init| !init.schema_name.is_empty())
    }
}

/// Schema snapshot inside a [`SchemaUpdate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaInit {
    #[serde(default)]
    pub schema_name: String,
    #[serde(default)]
    pub active_version: ActiveVersion,
    #[serde(rename = "type", default)]
    pub schema_type: String,
}

/// Active version of a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveVersion {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<u32>,
}

/// Producer creation request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProducerRequest {
    pub name: String,
    pub station_name: String,
    pub connection_id: String,
    pub producer_type: String,
    pub req_version: u32,
    pub username: String,
}

/// Producer creation response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProducerResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub schema_update: SchemaUpdate,
    #[serde(default)]
    pub schemaverse_to_dls: bool,
}

impl CreateProducerResponse {
    /// Decode a reply body.
    ///
    /// An empty body is success without schema. A body that is not a JSON
    /// response object is the broker's error text.
    pub fn from_reply(reply: &[u8]) -> Self {
        if reply.is_empty() {
            return Self::default();
        }
        match serde_json::from_slice(reply) {
            Ok(response) => response,
            Err(_) => Self {
                error: String::from_utf8_lossy(reply).trim().to_string(),
                ..Self::default()
            },
        }
    }
}

/// Producer destruction request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestroyProducerRequest {
    pub name: String,
    pub station_name: String,
    pub connection_id: String,
    pub username: String,
    pub req_version: u32,
}

/// Broker error carried by a plain request reply, if any.
///
/// Accepts an empty body, a JSON object with an `error` field, or raw error
/// text.
pub fn reply_error(reply: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorReply {
        #[serde(default)]
        error: String,
    }

    if reply.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let error = match serde_json::from_slice::<ErrorReply>(reply) {
        Ok(parsed) => parsed.error,
        Err(_) => String::from_utf8_lossy(reply).trim().to_string(),
    };
    (!error.is_empty()).then_some(error)
}

/// Out-of-band notification sent to the broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Notification {
    /// Alert for a payload rejected by a station's schema.
    pub fn schema_validation_failed(
        station: &str,
        producer: &str,
        error: &str,
        payload: &[u8],
    ) -> Self {
        Self {
            title: SCHEMA_VALIDATION_TITLE.to_string(),
            message: format!("Station: {station}\nProducer: {producer}\nError: {error}"),
            code: String::from_utf8_lossy(payload).into_owned(),
            kind: SCHEMA_VALIDATION_ALERT.to_string(),
        }
    }
}

/// Record published to the dead-letter subject for a rejected payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadLetterRecord {
    pub station_name: String,
    pub producer: DeadLetterProducer,
    pub message: DeadLetterMessage,
    pub validation_error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadLetterProducer {
    pub name: String,
    pub connection_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadLetterMessage {
    pub data: String,
    pub headers: Headers,
}

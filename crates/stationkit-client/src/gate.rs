use std::sync::Arc;

use bytes::Bytes;
use stationkit_schema::SchemaError;
use stationkit_transport::{Headers, Transport};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::cache::SchemaDescriptor;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::protocol::{DeadLetterRecord, Notification};
use crate::sync::SchemaSync;

/// Per-message schema check run before a payload is published.
///
/// A rejected payload raises a best-effort notification to the broker. The
/// notification is spawned, so its outcome never changes what the caller
/// sees and it may land before or after the caller observes the failure.
#[derive(Clone)]
pub struct MessageValidationGate {
    sync: SchemaSync,
    transport: Arc<dyn Transport>,
    notifications_subject: String,
    dead_letter_subject: String,
    send_notifications: bool,
}

impl MessageValidationGate {
    pub fn new(sync: SchemaSync, transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            sync,
            transport,
            notifications_subject: config.subjects.notifications.clone(),
            dead_letter_subject: config.subjects.dead_letter.clone(),
            send_notifications: config.send_notifications,
        }
    }

    /// Active schema of an internal station name.
    pub fn schema(&self, station: &str) -> Option<Arc<SchemaDescriptor>> {
        self.sync.cache().get_schema(station)
    }

    /// Check `payload` against the schema `station` enforces.
    ///
    /// Stations without a schema accept everything. Protobuf stations report
    /// [`SchemaError::Unimplemented`]. A schema that does not compile fails
    /// with [`SchemaError::ParseFailed`] and raises no notification.
    pub fn validate(&self, payload: &[u8], station: &str, producer: &str) -> Result<()> {
        let Some(descriptor) = self.schema(station) else {
            return Ok(());
        };

        self.sync.ensure_compiled(&descriptor)?;
        let result = self.sync.validators().validate(
            descriptor.format,
            payload,
            &descriptor.schema_name,
        );

        match result {
            Ok(()) => Ok(()),
            Err(err) if err.is_validation_failure() => {
                debug!(station, producer, schema = %descriptor.schema_name, error = %err, "payload rejected");
                self.notify(station, producer, &err, payload);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn notify(&self, station: &str, producer: &str, err: &SchemaError, payload: &[u8]) {
        if !self.send_notifications {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            debug!(station, "no runtime, schema notification skipped");
            return;
        };

        let reason = match err {
            SchemaError::ValidationFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        let notification = Notification::schema_validation_failed(station, producer, &reason, payload);
        let body = match serde_json::to_vec(&notification) {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                debug!(station, error = %err, "schema notification not encoded");
                return;
            }
        };

        let transport = Arc::clone(&self.transport);
        let subject = self.notifications_subject.clone();
        handle.spawn(async move {
            if let Err(err) = transport.request(&subject, body).await {
                debug!(subject = %subject, error = %err, "schema notification failed");
            }
        });
    }

    /// Publish a rejected payload to the dead-letter subject.
    ///
    /// Failures are logged and swallowed.
    pub async fn report_dead_letter(&self, record: &DeadLetterRecord) {
        let body = match serde_json::to_vec(record) {
            Ok(body) => Bytes::from(body),
            Err(err) => {
                warn!(station = %record.station_name, error = %err, "dead-letter record not encoded");
                return;
            }
        };
        if let Err(err) = self
            .transport
            .publish(&self.dead_letter_subject, Headers::new(), body)
            .await
        {
            warn!(station = %record.station_name, error = %err, "dead-letter publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use stationkit_schema::ValidatorRegistry;
    use stationkit_transport::{LocalBus, Subscription};

    use super::*;
    use crate::cache::SchemaStateCache;
    use crate::error::ClientError;
    use crate::protocol::{DeadLetterMessage, DeadLetterProducer, SchemaUpdate};

    fn gate(bus: &Arc<LocalBus>, config: &ClientConfig) -> MessageValidationGate {
        let sync = SchemaSync::new(
            Arc::new(SchemaStateCache::new()),
            Arc::new(ValidatorRegistry::with_defaults().unwrap()),
        );
        MessageValidationGate::new(sync, Arc::clone(bus) as Arc<dyn Transport>, config)
    }

    fn count_notifications(bus: &LocalBus, config: &ClientConfig) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        bus.handle(&config.subjects.notifications, move |message| {
            let notification: Notification = serde_json::from_slice(&message.payload).unwrap();
            assert_eq!(notification.code, "{}");
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::new())
        });
        count
    }

    #[tokio::test]
    async fn no_schema_accepts_anything() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig::default();
        let count = count_notifications(&bus, &config);
        let gate = gate(&bus, &config);

        assert!(gate.validate(b"\x00 not even json", "orders", "p1").is_ok());
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejection_sends_one_notification() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig::default();
        let count = count_notifications(&bus, &config);
        let gate = gate(&bus, &config);
        gate.sync.apply(
            "orders",
            &SchemaUpdate::new("order-v1", "json", r#"{"type":"object","required":["id"]}"#),
        );

        assert!(gate.validate(br#"{"id":1}"#, "orders", "p1").is_ok());
        let err = gate.validate(br#"{}"#, "orders", "p1").unwrap_err();
        assert!(err.is_validation_failure());

        for _ in 0..100 {
            if count.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn notification_failure_does_not_mask_rejection() {
        let bus = Arc::new(LocalBus::new());
        let gate = gate(&bus, &ClientConfig::default());
        gate.sync.apply(
            "orders",
            &SchemaUpdate::new("order-v1", "json", r#"{"required":["id"]}"#),
        );

        // nobody answers the notifications subject
        let err = gate.validate(br#"{}"#, "orders", "p1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Schema(SchemaError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn rejection_without_runtime_still_fails() {
        let bus = Arc::new(LocalBus::new());
        let gate = gate(&bus, &ClientConfig::default());
        gate.sync.apply(
            "orders",
            &SchemaUpdate::new("order-v1", "json", r#"{"required":["id"]}"#),
        );
        assert!(gate
            .validate(br#"{}"#, "orders", "p1")
            .unwrap_err()
            .is_validation_failure());
    }

    #[tokio::test]
    async fn protobuf_station_is_unimplemented() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig::default();
        let count = count_notifications(&bus, &config);
        let gate = gate(&bus, &config);
        gate.sync
            .apply("orders", &SchemaUpdate::new("p", "protobuf", "message A {}"));

        let err = gate.validate(b"", "orders", "p1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Schema(SchemaError::Unimplemented(_))
        ));
        assert!(!err.is_validation_failure());
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_schema_is_not_a_rejection() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig::default();
        let count = count_notifications(&bus, &config);
        let gate = gate(&bus, &config);
        gate.sync
            .apply("orders", &SchemaUpdate::new("broken", "json", "{not json"));

        let err = gate.validate(br#"{"id":1}"#, "orders", "p1").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Schema(SchemaError::ParseFailed { .. })
        ));
        assert!(!err.is_validation_failure());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn disabled_notifications_are_not_sent() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig {
            send_notifications: false,
            ..ClientConfig::default()
        };
        let count = count_notifications(&bus, &config);
        let gate = gate(&bus, &config);
        gate.sync.apply(
            "orders",
            &SchemaUpdate::new("order-v1", "json", r#"{"required":["id"]}"#),
        );

        assert!(gate.validate(br#"{}"#, "orders", "p1").is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dead_letter_record_is_published() {
        let bus = Arc::new(LocalBus::new());
        let config = ClientConfig::default();
        let gate = gate(&bus, &config);
        let mut sub = bus.subscribe(&config.subjects.dead_letter).await.unwrap();

        let record = DeadLetterRecord {
            station_name: "orders".to_string(),
            producer: DeadLetterProducer {
                name: "p1".to_string(),
                connection_id: "c".to_string(),
            },
            message: DeadLetterMessage {
                data: "{}".to_string(),
                headers: Headers::new(),
            },
            validation_error: "missing id".to_string(),
        };
        gate.report_dead_letter(&record).await;

        let message = sub.next_message().await.unwrap().unwrap();
        let decoded: DeadLetterRecord = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(decoded, record);
    }
}

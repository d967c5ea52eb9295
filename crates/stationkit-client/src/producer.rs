use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use stationkit_schema::SchemaError;
use stationkit_transport::{Headers, Transport};
use tracing::trace;

use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::protocol::{
    DeadLetterMessage, DeadLetterProducer, DeadLetterRecord, HEADER_CONNECTION_ID,
    HEADER_PRODUCED_BY,
};

/// A named producer on one station.
///
/// Every payload is checked against the station's active schema before it
/// is published. Dropping a producer does not release it on the broker;
/// call [`destroy`](Self::destroy).
pub struct Producer {
    client: Client,
    name: String,
    station: String,
    internal_station: String,
    dead_letter: bool,
    destroyed: AtomicBool,
}

impl Producer {
    pub(crate) fn new(
        client: Client,
        name: String,
        station: String,
        internal_station: String,
        dead_letter: bool,
    ) -> Self {
        Self {
            client,
            name,
            station,
            internal_station,
            dead_letter,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Station display name.
    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn internal_station(&self) -> &str {
        &self.internal_station
    }

    /// Whether rejected payloads are reported to the dead-letter subject.
    pub fn sends_dead_letters(&self) -> bool {
        self.dead_letter
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(ClientError::ProducerDestroyed(self.name.clone()));
        }
        self.client.ensure_open()
    }

    /// Check `payload` without publishing it.
    pub fn validate(&self, payload: &[u8]) -> Result<()> {
        self.ensure_live()?;
        self.client
            .gate()
            .validate(payload, &self.internal_station, &self.name)
    }

    /// Validate and publish `payload`.
    ///
    /// A rejected payload is not published. When the broker asked for it,
    /// the rejection is also reported to the dead-letter subject.
    pub async fn produce(&self, payload: impl Into<Bytes>, headers: Headers) -> Result<()> {
        self.ensure_live()?;
        let payload = payload.into();

        if let Err(err) = self
            .client
            .gate()
            .validate(&payload, &self.internal_station, &self.name)
        {
            if self.dead_letter && err.is_validation_failure() {
                let record = self.dead_letter_record(&payload, headers, &err);
                self.client.gate().report_dead_letter(&record).await;
            }
            return Err(err);
        }

        let mut headers = headers;
        headers.insert(HEADER_PRODUCED_BY.to_string(), self.name.clone());
        headers.insert(
            HEADER_CONNECTION_ID.to_string(),
            self.client.connection_id().to_string(),
        );

        let subject = self.client.config().subjects.produce(&self.internal_station);
        self.client
            .transport()
            .publish(&subject, headers, payload)
            .await?;
        trace!(station = %self.station, producer = %self.name, "message produced");
        Ok(())
    }

    fn dead_letter_record(
        &self,
        payload: &[u8],
        headers: Headers,
        err: &ClientError,
    ) -> DeadLetterRecord {
        let validation_error = match err {
            ClientError::Schema(SchemaError::ValidationFailed { reason, .. }) => reason.clone(),
            other => other.to_string(),
        };
        DeadLetterRecord {
            station_name: self.internal_station.clone(),
            producer: DeadLetterProducer {
                name: self.name.clone(),
                connection_id: self.client.connection_id().to_string(),
            },
            message: DeadLetterMessage {
                data: String::from_utf8_lossy(payload).into_owned(),
                headers,
            },
            validation_error,
        }
    }

    /// Release the producer. Later calls are a no-op.
    pub async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.client.destroy_producer(&self.station, &self.name).await
    }
}

impl std::fmt::Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("name", &self.name)
            .field("station", &self.station)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

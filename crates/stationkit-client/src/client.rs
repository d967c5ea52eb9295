use std::sync::Arc;

use bytes::Bytes;
use stationkit_schema::ValidatorRegistry;
use stationkit_transport::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{SchemaDescriptor, SchemaStateCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::gate::MessageValidationGate;
use crate::listener::{ListenerState, SchemaUpdateListener};
use crate::producer::Producer;
use crate::protocol::{
    reply_error, CreateProducerRequest, CreateProducerResponse, DestroyProducerRequest,
    PRODUCER_TYPE, REQUEST_VERSION,
};
use crate::registry::ProducerStationRegistry;
use crate::station::{internal_station_name, validate_name};
use crate::sync::SchemaSync;

/// Connection-scoped producer runtime.
///
/// Cheap to clone. Every clone shares the schema state, the station
/// listeners and the transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    connection_id: String,
    sync: SchemaSync,
    gate: MessageValidationGate,
    stations: ProducerStationRegistry<SchemaUpdateListener>,
    shutdown: CancellationToken,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl Client {
    /// Create a client over `transport` with validators for every format.
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Result<Self> {
        let validators = ValidatorRegistry::with_config(config.validator)?;
        Ok(Self::with_validators(transport, config, validators))
    }

    /// Create a client with an explicit validator registry.
    pub fn with_validators(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        validators: ValidatorRegistry,
    ) -> Self {
        let connection_id = config
            .connection_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let sync = SchemaSync::new(Arc::new(SchemaStateCache::new()), Arc::new(validators));
        let gate = MessageValidationGate::new(sync.clone(), Arc::clone(&transport), &config);

        debug!(connection_id = %connection_id, "client created");
        Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                connection_id,
                sync,
                gate,
                stations: ProducerStationRegistry::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Connect to a NATS server.
    #[cfg(feature = "nats")]
    pub async fn connect(url: &str, config: ClientConfig) -> Result<Self> {
        let transport = stationkit_transport::NatsTransport::connect(url)
            .await?
            .with_request_timeout(config.request_timeout);
        Self::new(Arc::new(transport), config)
    }

    pub fn connection_id(&self) -> &str {
        &self.inner.connection_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Active schema of a station, by display name.
    pub fn schema(&self, station: &str) -> Option<Arc<SchemaDescriptor>> {
        self.inner
            .sync
            .cache()
            .get_schema(&internal_station_name(station))
    }

    pub fn schema_cache(&self) -> &Arc<SchemaStateCache> {
        self.inner.sync.cache()
    }

    pub fn validators(&self) -> &Arc<ValidatorRegistry> {
        self.inner.sync.validators()
    }

    pub fn gate(&self) -> &MessageValidationGate {
        &self.inner.gate
    }

    /// Live producers on a station, by display name.
    pub async fn producer_count(&self, station: &str) -> usize {
        self.inner
            .stations
            .producer_count(&internal_station_name(station))
            .await
    }

    /// State of a station's schema listener, if one is running.
    pub async fn listener_state(&self, station: &str) -> Option<ListenerState> {
        self.inner
            .stations
            .with_listener(&internal_station_name(station), |listener| listener.state())
            .await
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    /// Register a producer named `name` on `station`.
    ///
    /// The first producer on a station seeds its schema from the broker's
    /// reply and starts the station's listener. If the listener cannot
    /// subscribe the seed is dropped and the error returned. A client closed
    /// while the broker request is in flight registers nothing.
    pub async fn create_producer(&self, station: &str, name: &str) -> Result<Producer> {
        self.ensure_open()?;
        validate_name("station", station)?;
        validate_name("producer", name)?;

        let inner = &self.inner;
        let request = CreateProducerRequest {
            name: name.to_string(),
            station_name: station.to_string(),
            connection_id: inner.connection_id.clone(),
            producer_type: PRODUCER_TYPE.to_string(),
            req_version: REQUEST_VERSION,
            username: inner.config.username.clone(),
        };
        let reply = inner
            .transport
            .request(
                &inner.config.subjects.producer_creations,
                Bytes::from(serde_json::to_vec(&request)?),
            )
            .await?;

        let response = CreateProducerResponse::from_reply(&reply);
        if !response.error.is_empty() {
            return Err(ClientError::Broker(response.error));
        }

        let internal = internal_station_name(station);
        let first = inner
            .stations
            .register_producer(&internal, || async {
                // close() may have run while the creation request was in flight
                if inner.shutdown.is_cancelled() {
                    return Err(ClientError::Closed);
                }
                inner.sync.apply(&internal, &response.schema_update);
                let started = SchemaUpdateListener::start(
                    Arc::clone(&inner.transport),
                    inner.config.subjects.schema_updates(&internal),
                    internal.clone(),
                    inner.sync.clone(),
                    inner.shutdown.child_token(),
                )
                .await;
                if started.is_err() {
                    inner.sync.evict(&internal);
                }
                started
            })
            .await?;

        info!(station, producer = name, first, "producer created");
        Ok(Producer::new(
            self.clone(),
            name.to_string(),
            station.to_string(),
            internal,
            response.schemaverse_to_dls,
        ))
    }

    /// Tell the broker `name` is gone and release its station slot.
    ///
    /// The slot is released even when the broker request fails. The last
    /// producer on a station drains its listener and drops its schema.
    pub(crate) async fn destroy_producer(&self, station: &str, name: &str) -> Result<()> {
        let inner = &self.inner;
        let internal = internal_station_name(station);

        let requested = self.request_destroy(station, name).await;

        let timeout = inner.config.listener_drain_timeout;
        let sync = &inner.sync;
        let key = internal.clone();
        let last = inner
            .stations
            .unregister_producer(&internal, move |listener| async move {
                listener.stop(timeout).await;
                sync.evict(&key);
            })
            .await;

        info!(station, producer = name, last, "producer destroyed");
        requested
    }

    async fn request_destroy(&self, station: &str, name: &str) -> Result<()> {
        let inner = &self.inner;
        let request = DestroyProducerRequest {
            name: name.to_string(),
            station_name: station.to_string(),
            connection_id: inner.connection_id.clone(),
            username: inner.config.username.clone(),
            req_version: REQUEST_VERSION,
        };
        let reply = inner
            .transport
            .request(
                &inner.config.subjects.producer_destructions,
                Bytes::from(serde_json::to_vec(&request)?),
            )
            .await?;

        match reply_error(&reply) {
            Some(error) => Err(ClientError::Broker(error)),
            None => Ok(()),
        }
    }

    /// Stop every listener and drop all schema state.
    ///
    /// Producers created from this client fail afterwards. Calling it twice
    /// is a no-op.
    pub async fn close(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();

        let timeout = self.inner.config.listener_drain_timeout;
        for listener in self.inner.stations.clear().await {
            listener.stop(timeout).await;
        }
        self.inner.sync.clear();
        info!(connection_id = %self.inner.connection_id, "client closed");
    }
}

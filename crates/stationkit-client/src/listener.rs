use std::sync::Arc;
use std::time::Duration;

use stationkit_transport::{Message, Subscription, Transport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::protocol::SchemaUpdate;
use crate::sync::SchemaSync;

/// Lifecycle of a station's schema listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Starting,
    Active,
    Draining,
    Stopped,
}

/// Background task applying a station's schema updates.
///
/// Runs until drained through [`stop`](Self::stop), the client shutdown
/// token fires, or the subscription ends.
pub struct SchemaUpdateListener {
    station: String,
    subject: String,
    drain: CancellationToken,
    state: watch::Receiver<ListenerState>,
    task: JoinHandle<()>,
}

enum Event {
    Shutdown,
    Drain,
    Delivery(Option<stationkit_transport::Result<Message>>),
}

impl SchemaUpdateListener {
    /// Subscribe to `subject` and spawn the update loop.
    ///
    /// A subscribe failure is returned and nothing is spawned.
    pub async fn start(
        transport: Arc<dyn Transport>,
        subject: String,
        station: String,
        sync: SchemaSync,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let (state_tx, state_rx) = watch::channel(ListenerState::Starting);
        let subscription = transport.subscribe(&subject).await?;
        let drain = CancellationToken::new();

        state_tx.send_replace(ListenerState::Active);
        let task = tokio::spawn(run(
            subscription,
            station.clone(),
            sync,
            drain.clone(),
            shutdown,
            state_tx,
        ));
        info!(station = %station, subject = %subject, "schema listener started");

        Ok(Self {
            station,
            subject,
            drain,
            state: state_rx,
            task,
        })
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Drain the subscription and wait for the loop to exit.
    ///
    /// Messages already delivered are still applied. If the loop has not
    /// exited within `timeout` it is aborted.
    pub async fn stop(self, timeout: Duration) {
        self.drain.cancel();
        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => {
                info!(station = %self.station, "schema listener stopped");
            }
            Ok(Err(err)) => {
                warn!(station = %self.station, error = %err, "schema listener task failed");
            }
            Err(_) => {
                warn!(station = %self.station, ?timeout, "schema listener drain timed out, aborting");
                task.abort();
            }
        }
    }

    /// Abort the loop without draining.
    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn run(
    mut subscription: Box<dyn Subscription>,
    station: String,
    sync: SchemaSync,
    drain: CancellationToken,
    shutdown: CancellationToken,
    state: watch::Sender<ListenerState>,
) {
    let mut draining = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Event::Shutdown,
            _ = drain.cancelled(), if !draining => Event::Drain,
            delivery = subscription.next_message() => Event::Delivery(delivery),
        };

        match event {
            Event::Shutdown => {
                if let Err(err) = subscription.unsubscribe().await {
                    debug!(station = %station, error = %err, "unsubscribe on shutdown failed");
                }
                break;
            }
            Event::Drain => {
                draining = true;
                state.send_replace(ListenerState::Draining);
                if let Err(err) = subscription.drain().await {
                    warn!(station = %station, error = %err, "schema subscription drain failed");
                    break;
                }
            }
            Event::Delivery(Some(Ok(message))) => apply_message(&sync, &station, &message),
            Event::Delivery(Some(Err(err))) => {
                warn!(station = %station, error = %err, "schema update receive failed");
            }
            Event::Delivery(None) => break,
        }
    }

    state.send_replace(ListenerState::Stopped);
    debug!(station = %station, "schema listener loop exited");
}

fn apply_message(sync: &SchemaSync, station: &str, message: &Message) {
    match serde_json::from_slice::<SchemaUpdate>(&message.payload) {
        Ok(update) => {
            sync.apply(station, &update);
        }
        Err(err) => {
            warn!(station, subject = %message.subject, error = %err, "malformed schema update skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use stationkit_schema::{SchemaFormat, ValidatorRegistry};
    use stationkit_transport::LocalBus;

    use super::*;
    use crate::cache::SchemaStateCache;

    const SUBJECT: &str = "$memphis_schema_updates_orders";

    fn sync() -> SchemaSync {
        SchemaSync::new(
            Arc::new(SchemaStateCache::new()),
            Arc::new(ValidatorRegistry::with_defaults().unwrap()),
        )
    }

    fn update(name: &str) -> Bytes {
        let body = SchemaUpdate::new(name, "json", r#"{"type":"object","required":["id"]}"#);
        Bytes::from(serde_json::to_vec(&body).unwrap())
    }

    async fn wait_for(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    async fn start(bus: &Arc<LocalBus>, sync: &SchemaSync) -> SchemaUpdateListener {
        SchemaUpdateListener::start(
            Arc::clone(bus) as Arc<dyn Transport>,
            SUBJECT.to_string(),
            "orders".to_string(),
            sync.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn applies_pushed_updates() {
        let bus = Arc::new(LocalBus::new());
        let sync = sync();
        let listener = start(&bus, &sync).await;
        assert_eq!(listener.state(), ListenerState::Active);

        bus.publish(SUBJECT, Default::default(), update("order-v1"))
            .await
            .unwrap();
        wait_for(|| sync.cache().get_schema("orders").is_some()).await;
        assert!(sync.validators().has_schema(SchemaFormat::Json, "order-v1"));

        bus.publish(SUBJECT, Default::default(), update("order-v2"))
            .await
            .unwrap();
        wait_for(|| {
            sync.cache()
                .get_schema("orders")
                .is_some_and(|d| d.schema_name == "order-v2")
        })
        .await;

        listener.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn malformed_update_does_not_stop_loop() {
        let bus = Arc::new(LocalBus::new());
        let sync = sync();
        let listener = start(&bus, &sync).await;

        bus.publish(SUBJECT, Default::default(), Bytes::from_static(b"not json"))
            .await
            .unwrap();
        bus.publish(SUBJECT, Default::default(), update("order-v1"))
            .await
            .unwrap();

        wait_for(|| sync.cache().get_schema("orders").is_some()).await;
        assert!(!listener.is_finished());
        listener.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn stop_drains_and_unsubscribes() {
        let bus = Arc::new(LocalBus::new());
        let sync = sync();
        let listener = start(&bus, &sync).await;
        assert_eq!(bus.subscriber_count(SUBJECT), 1);

        let mut state = listener.state.clone();
        listener.stop(Duration::from_secs(1)).await;

        assert_eq!(*state.borrow_and_update(), ListenerState::Stopped);
        assert_eq!(bus.subscriber_count(SUBJECT), 0);
    }

    #[tokio::test]
    async fn shutdown_token_ends_loop() {
        let bus = Arc::new(LocalBus::new());
        let shutdown = CancellationToken::new();
        let listener = SchemaUpdateListener::start(
            Arc::clone(&bus) as Arc<dyn Transport>,
            SUBJECT.to_string(),
            "orders".to_string(),
            sync(),
            shutdown.clone(),
        )
        .await
        .unwrap();

        shutdown.cancel();
        wait_for(|| listener.is_finished()).await;
        assert_eq!(listener.state(), ListenerState::Stopped);
        assert_eq!(bus.subscriber_count(SUBJECT), 0);
    }

    #[tokio::test]
    async fn closed_bus_ends_loop() {
        let bus = Arc::new(LocalBus::new());
        let listener = start(&bus, &sync()).await;

        bus.close();
        wait_for(|| listener.is_finished()).await;
        assert_eq!(listener.state(), ListenerState::Stopped);
    }
}

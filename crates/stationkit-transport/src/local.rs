use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::error::{Result, TransportError};
use crate::traits::{Headers, Message, Subscription, Transport};

/// Default per-subject buffer capacity.
pub const DEFAULT_SUBJECT_CAPACITY: usize = 1024;

type Responder = Arc<dyn Fn(&Message) -> Result<Bytes> + Send + Sync>;

/// In-process broker.
///
/// Subjects are exact-match broadcast channels created on first subscribe.
/// Requests are delivered to subscribers of the subject like a publish and
/// answered by the responder registered with [`LocalBus::handle`], if any.
pub struct LocalBus {
    subjects: DashMap<Arc<str>, broadcast::Sender<Message>>,
    responders: DashMap<String, Responder>,
    capacity: usize,
    closed: AtomicBool,
    publish_count: AtomicUsize,
}

impl LocalBus {
    /// Create a bus with the default per-subject capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBJECT_CAPACITY)
    }

    /// Create a bus with explicit per-subject capacity.
    ///
    /// A subscriber that falls more than `capacity` messages behind observes
    /// [`TransportError::Lagged`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subjects: DashMap::new(),
            responders: DashMap::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
            publish_count: AtomicUsize::new(0),
        }
    }

    /// Answer requests on `subject` with `responder`.
    ///
    /// Replaces any previous responder for the subject.
    pub fn handle<F>(&self, subject: &str, responder: F)
    where
        F: Fn(&Message) -> Result<Bytes> + Send + Sync + 'static,
    {
        self.responders
            .insert(subject.to_string(), Arc::new(responder));
    }

    /// Stop answering requests on `subject`.
    pub fn remove_handler(&self, subject: &str) {
        self.responders.remove(subject);
    }

    /// Number of live subscriptions on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.subjects
            .get(subject)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Total number of publishes and requests seen by the bus.
    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    /// Close the bus. Every subscription ends and later calls fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.subjects.clear();
        self.responders.clear();
    }

    /// Whether [`LocalBus::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    /// Deliver to subscribers. Returns how many received the message.
    fn deliver(&self, message: Message) -> usize {
        self.publish_count.fetch_add(1, Ordering::Relaxed);

        let subject = message.subject.clone();
        let Some(tx) = self.subjects.get(subject.as_str()).map(|tx| tx.clone()) else {
            return 0;
        };

        match tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                // every subscriber is gone
                self.subjects
                    .remove_if(subject.as_str(), |_, tx| tx.receiver_count() == 0);
                0
            }
        }
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalBus {
    async fn request(&self, subject: &str, payload: Bytes) -> Result<Bytes> {
        self.ensure_open()?;

        let message = Message::new(subject, payload);
        let delivered = self.deliver(message.clone());
        let responder = self.responders.get(subject).map(|r| r.value().clone());

        match responder {
            Some(responder) => responder(&message),
            None if delivered > 0 => Err(TransportError::NoReply(subject.to_string())),
            None => Err(TransportError::NoResponders(subject.to_string())),
        }
    }

    async fn publish(&self, subject: &str, headers: Headers, payload: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.deliver(Message {
            subject: subject.to_string(),
            headers,
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>> {
        self.ensure_open()?;

        let key: Arc<str> = Arc::from(subject);
        let tx = self
            .subjects
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();

        tracing::trace!(subject, "local subscription created");
        Ok(Box::new(LocalSubscription {
            subject: subject.to_string(),
            rx: Some(tx.subscribe()),
            draining: false,
        }))
    }
}

/// Subscription handed out by [`LocalBus`].
pub struct LocalSubscription {
    subject: String,
    rx: Option<broadcast::Receiver<Message>>,
    draining: bool,
}

#[async_trait]
impl Subscription for LocalSubscription {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn next_message(&mut self) -> Option<Result<Message>> {
        let rx = self.rx.as_mut()?;

        if self.draining {
            return match rx.try_recv() {
                Ok(message) => Some(Ok(message)),
                Err(TryRecvError::Lagged(skipped)) => Some(Err(TransportError::Lagged {
                    subject: self.subject.clone(),
                    skipped,
                })),
                Err(TryRecvError::Empty | TryRecvError::Closed) => {
                    self.rx = None;
                    None
                }
            };
        }

        match rx.recv().await {
            Ok(message) => Some(Ok(message)),
            Err(RecvError::Lagged(skipped)) => Some(Err(TransportError::Lagged {
                subject: self.subject.clone(),
                skipped,
            })),
            Err(RecvError::Closed) => {
                self.rx = None;
                None
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<()> {
        self.rx = None;
        Ok(())
    }

    async fn drain(&mut self) -> Result<()> {
        self.draining = true;
        Ok(())
    }
}

//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! Topics are free-form names (`"/scan"`, `"/imu/data"`, `"/cmd_vel"`, …).
//! A publisher registers a topic together with the [`MessageSchema`] it will
//! carry; the bus then rejects publishes on unregistered topics and messages
//! whose schema does not match the registration.
//!
//! | Operation | Behaviour |
//! |---|---|
//! | [`Transport::register_topic`] | creates the channel; idempotent for the same schema |
//! | [`Transport::publish`] | wraps the message in an [`Event`] and broadcasts it |
//! | [`Transport::subscribe`] | spawns a Tokio task that calls the handler for every message |
//! | [`EventBus::subscribe_to`] | returns an async [`TopicReceiver`] instead of a handler |

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use twin_types::{Event, Message, MessageSchema, SimError};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Callback invoked for every message delivered to a handler subscription.
pub type MessageHandler = Box<dyn Fn(&Message) + Send + Sync + 'static>;

/// The pub/sub surface the simulation core depends on.
///
/// The in-process [`EventBus`] implements it; a bridge to an external
/// robotics middleware would implement it the same way.
pub trait Transport: Send + Sync {
    /// Declare that `name` carries messages of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SchemaMismatch`] when the topic is already
    /// registered with a different schema.
    fn register_topic(&self, name: &str, schema: MessageSchema) -> Result<(), SimError>;

    /// Publish `message` on `name`.
    ///
    /// Returns the number of subscribers that were handed the message.
    /// `Ok(0)` when nobody is listening is a normal condition, not an error.
    fn publish(&self, name: &str, message: Message) -> Result<usize, SimError>;

    /// Invoke `handler` for every message subsequently published on `name`.
    fn subscribe(&self, name: &str, handler: MessageHandler) -> Result<Subscription, SimError>;
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TopicChannel {
    /// `None` until a publisher registers the topic; subscribers may attach
    /// first.
    schema: Option<MessageSchema>,
    sender: broadcast::Sender<Event>,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    capacity: usize,
    topics: Arc<RwLock<HashMap<String, TopicChannel>>>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently and is
    /// raised to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to `name` and receive events through an async
    /// [`TopicReceiver`].
    ///
    /// The channel is created on demand, so a subscriber may attach before
    /// the publisher registers the topic.
    pub fn subscribe_to(&self, name: &str) -> Result<TopicReceiver, SimError> {
        let receiver = self.channel_sender(name)?.subscribe();
        Ok(TopicReceiver {
            topic: name.to_string(),
            receiver,
        })
    }

    /// Names and schemas of every registered topic, sorted by name.
    pub fn topics(&self) -> Result<Vec<(String, MessageSchema)>, SimError> {
        let topics = self.topics.read().map_err(|_| poisoned())?;
        let mut list: Vec<(String, MessageSchema)> = topics
            .iter()
            .filter_map(|(name, ch)| ch.schema.map(|s| (name.clone(), s)))
            .collect();
        list.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(list)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Return the sender for `name`, creating an unregistered channel when
    /// none exists yet.
    fn channel_sender(&self, name: &str) -> Result<broadcast::Sender<Event>, SimError> {
        if let Some(ch) = self.topics.read().map_err(|_| poisoned())?.get(name) {
            return Ok(ch.sender.clone());
        }
        let mut topics = self.topics.write().map_err(|_| poisoned())?;
        let ch = topics.entry(name.to_string()).or_insert_with(|| TopicChannel {
            schema: None,
            sender: broadcast::channel(self.capacity).0,
        });
        Ok(ch.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Transport for EventBus {
    fn register_topic(&self, name: &str, schema: MessageSchema) -> Result<(), SimError> {
        let mut topics = self.topics.write().map_err(|_| poisoned())?;
        let ch = topics.entry(name.to_string()).or_insert_with(|| TopicChannel {
            schema: None,
            sender: broadcast::channel(self.capacity).0,
        });
        let current = ch.schema;
        match current {
            Some(existing) if existing != schema => Err(SimError::SchemaMismatch {
                topic: name.to_string(),
                expected: existing,
                found: schema,
            }),
            _ => {
                ch.schema = Some(schema);
                debug!(topic = name, schema = %schema, "topic registered");
                Ok(())
            }
        }
    }

    fn publish(&self, name: &str, message: Message) -> Result<usize, SimError> {
        let sender = {
            let topics = self.topics.read().map_err(|_| poisoned())?;
            let ch = topics
                .get(name)
                .ok_or_else(|| SimError::UnknownTopic(name.to_string()))?;
            let expected = ch
                .schema
                .ok_or_else(|| SimError::UnknownTopic(name.to_string()))?;
            if expected != message.schema() {
                return Err(SimError::SchemaMismatch {
                    topic: name.to_string(),
                    expected,
                    found: message.schema(),
                });
            }
            ch.sender.clone()
        };

        // A send error only means there are no receivers right now.
        Ok(sender.send(Event::new(name, message)).unwrap_or(0))
    }

    fn subscribe(&self, name: &str, handler: MessageHandler) -> Result<Subscription, SimError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SimError::Channel(format!("subscribing to {name} requires a Tokio runtime: {e}"))
        })?;
        let mut rx = self.subscribe_to(name)?;
        let topic = name.to_string();
        let handle = runtime.spawn(async move {
            loop {
                match rx.receiver.recv().await {
                    Ok(event) => handler(&event.payload),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Subscriber fell behind; log and continue.
                        warn!(topic = %rx.topic, lagged_by = n, "subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription { topic, handle })
    }
}

fn poisoned() -> SimError {
    SimError::Channel("topic registry lock poisoned".to_string())
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

/// Handle to a running handler subscription.
///
/// Dropping the handle leaves the subscription running; call
/// [`Subscription::cancel`] to stop it.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// The topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Stop delivering messages to the handler.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single topic channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: String,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`TopicReceiver::recv`].
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The topic this receiver is bound to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

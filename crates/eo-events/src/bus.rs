//! Event bus implementation
//!
//! This module provides the event bus abstraction and the in-process
//! implementation used for post-commit hooks.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// A handler failed to process an event
    #[error("Handler error: {0}")]
    HandlerError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    ///
    /// Handler failures are logged and never returned to the publisher.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `publication.*` matches `publication.saved`, `publication.deleted`
    /// - `#` matches every event
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe from a topic.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total events delivered to subscribers and handlers
    pub events_delivered: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// How matching handlers are run on publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerDispatch {
    /// Each handler runs on its own task; `publish` returns immediately.
    Spawned,
    /// Handlers run to completion before `publish` returns.
    Inline,
}

/// In-memory event bus implementation.
pub struct MemoryEventBus {
    /// Topic subscribers
    subscribers: Arc<RwLock<HashMap<String, broadcast::Sender<Event>>>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    /// Default channel capacity
    channel_capacity: usize,
    dispatch: HandlerDispatch,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            channel_capacity: capacity,
            dispatch: HandlerDispatch::Spawned,
        }
    }

    /// Run handlers before `publish` returns.
    pub fn inline() -> Self {
        Self::new().with_dispatch(HandlerDispatch::Inline)
    }

    /// Set the handler dispatch mode.
    pub fn with_dispatch(mut self, dispatch: HandlerDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Check if a topic matches a pattern.
    fn topic_matches(pattern: &str, topic: &str) -> bool {
        let pattern_parts: Vec<&str> = pattern.split('.').collect();
        let topic_parts: Vec<&str> = topic.split('.').collect();
        Self::segments_match(&pattern_parts, &topic_parts)
    }

    fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
        match (pattern.first(), topic.first()) {
            (None, None) => true,
            (Some(&"#"), _) => {
                // Zero segments, or consume one and stay on '#'
                Self::segments_match(&pattern[1..], topic)
                    || (!topic.is_empty() && Self::segments_match(pattern, &topic[1..]))
            }
            (Some(&"*"), Some(_)) => Self::segments_match(&pattern[1..], &topic[1..]),
            (Some(segment), Some(part)) if segment == part => {
                Self::segments_match(&pattern[1..], &topic[1..])
            }
            _ => false,
        }
    }

    async fn run_handler(stats: &RwLock<EventBusStats>, handler: &Arc<dyn EventHandler>, event: Event) {
        let topic = event.event_type.clone();
        let event_id = event.id;
        match handler.handle(event).await {
            Ok(()) => stats.write().await.events_delivered += 1,
            Err(e) => {
                stats.write().await.handler_failures += 1;
                tracing::warn!(topic = %topic, event_id = %event_id, error = %e, "Event handler failed");
            }
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic().to_string();

        {
            let mut stats = self.stats.write().await;
            stats.events_published += 1;
        }

        // Notify matching subscribers
        let mut delivered = 0;
        {
            let subscribers = self.subscribers.read().await;
            for (pattern, sender) in subscribers.iter() {
                if Self::topic_matches(pattern, &topic) && sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        if delivered > 0 {
            self.stats.write().await.events_delivered += delivered;
        }

        // Notify handlers
        let matching: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().await;
            handlers
                .iter()
                .filter(|h| h.topics().iter().any(|t| Self::topic_matches(t, &topic)))
                .cloned()
                .collect()
        };

        for handler in matching {
            match self.dispatch {
                HandlerDispatch::Inline => {
                    Self::run_handler(&self.stats, &handler, event.clone()).await;
                }
                HandlerDispatch::Spawned => {
                    let stats = self.stats.clone();
                    let event = event.clone();
                    tokio::task::spawn(async move {
                        Self::run_handler(&stats, &handler, event).await;
                    });
                }
            }
        }

        tracing::debug!(topic = %topic, event_id = %event.id, "Event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        let id = uuid::Uuid::now_v7().to_string();

        let receiver = {
            let mut subscribers = self.subscribers.write().await;

            if let Some(sender) = subscribers.get(topic) {
                sender.subscribe()
            } else {
                let (sender, receiver) = broadcast::channel(self.channel_capacity);
                subscribers.insert(topic.to_string(), sender);
                receiver
            }
        };

        {
            let mut stats = self.stats.write().await;
            stats.active_subscriptions += 1;
        }

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);

        {
            let mut stats = self.stats.write().await;
            stats.registered_handlers += 1;
        }

        Ok(())
    }

    async fn unsubscribe(&self, _subscription_id: &str) -> EventBusResult<()> {
        let mut stats = self.stats.write().await;
        if stats.active_subscriptions > 0 {
            stats.active_subscriptions -= 1;
        }
        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        topics: Vec<String>,
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn new(topic: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                topics: vec![topic.to_string()],
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: Event) -> EventBusResult<()> {
            self.seen.lock().unwrap().push(event.event_type.clone());
            if self.fail {
                return Err(EventBusError::HandlerError("boom".to_string()));
            }
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            self.topics.clone()
        }
    }

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("publication.*").await.unwrap();

        bus.publish(Event::new("publication.saved", serde_json::json!({}))).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type, "publication.saved");
    }

    #[test]
    fn test_topic_matching() {
        assert!(MemoryEventBus::topic_matches("publication.saved", "publication.saved"));
        assert!(MemoryEventBus::topic_matches("publication.*", "publication.saved"));
        assert!(MemoryEventBus::topic_matches("*.saved", "publication.saved"));
        assert!(MemoryEventBus::topic_matches("#", "publication.saved"));
        assert!(MemoryEventBus::topic_matches("publication.#", "publication"));
        assert!(MemoryEventBus::topic_matches("#.released", "attachment.file.released"));

        assert!(!MemoryEventBus::topic_matches("publication.deleted", "publication.saved"));
        assert!(!MemoryEventBus::topic_matches("publication.*", "publication"));
        assert!(!MemoryEventBus::topic_matches("membership.#", "publication.saved"));
    }

    #[tokio::test]
    async fn test_inline_handlers_run_before_publish_returns() {
        let bus = MemoryEventBus::inline();
        let recorder = Recorder::new("attachment.*", false);
        bus.register_handler(recorder.clone()).await.unwrap();

        bus.publish(Event::new("attachment.file_released", serde_json::json!({}))).await.unwrap();
        bus.publish(Event::new("publication.saved", serde_json::json!({}))).await.unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["attachment.file_released".to_string()]);
    }

    #[tokio::test]
    async fn test_handler_failure_is_not_returned() {
        let bus = MemoryEventBus::inline();
        bus.register_handler(Recorder::new("#", true)).await.unwrap();

        assert!(bus.publish(Event::new("organisation.created", serde_json::json!({}))).await.is_ok());

        let stats = bus.stats().await;
        assert_eq!(stats.handler_failures, 1);
        assert_eq!(stats.events_delivered, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let bus = MemoryEventBus::new();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let _sub = bus.subscribe("test.*").await.unwrap();
        let stats = bus.stats().await;
        assert_eq!(stats.active_subscriptions, 1);

        bus.publish(Event::new("test.event", serde_json::json!({}))).await.unwrap();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.events_delivered, 1);
    }
}

//! Topic subscription registry
//!
//! Maps topics to handlers and tracks which of them are bound to the live
//! transport. Entries survive disconnects so they can be replayed on the
//! next session.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::domain::{FrameSink, SubscriptionHandle, Topic};

/// Callback receiving decoded push messages for one topic
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Result of registering a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// Stored until the transport connects
    Buffered,
    /// Bound to the live transport
    Bound,
}

/// Result of routing one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// No handler registered for the message
    Unroutable,
    /// Body was not valid JSON; handler not invoked
    Malformed,
    /// Handler panicked; the panic was contained
    HandlerFailed,
}

struct Entry {
    handler: MessageHandler,
    handle: Option<SubscriptionHandle>,
    /// Counted in `active` since its first successful bind
    counted: bool,
}

struct RegistryState {
    entries: HashMap<Topic, Entry>,
    routes: HashMap<SubscriptionHandle, Topic>,
    sink: Option<Arc<dyn FrameSink>>,
    active: usize,
    next_id: u64,
}

impl RegistryState {
    /// Bind `topic` on the current sink, releasing any stale handle first.
    /// Rebinding never counts a topic twice.
    fn bind(&mut self, topic: &Topic) -> bool {
        let Some(sink) = self.sink.clone() else {
            return false;
        };
        let Some(entry) = self.entries.get_mut(topic) else {
            return false;
        };

        if let Some(stale) = entry.handle.take() {
            self.routes.remove(&stale);
            if let Err(e) = sink.unsubscribe(&stale) {
                tracing::debug!(topic = %topic, error = %e, "failed to release stale handle");
            }
        }

        self.next_id += 1;
        let handle = SubscriptionHandle::new(self.next_id);

        match sink.subscribe(&handle, topic) {
            Ok(()) => {
                if !entry.counted {
                    entry.counted = true;
                    self.active += 1;
                }
                tracing::debug!(topic = %topic, handle = %handle, "topic bound");
                self.routes.insert(handle.clone(), topic.clone());
                entry.handle = Some(handle);
                true
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "failed to bind topic, keeping it buffered");
                false
            }
        }
    }
}

/// Registry of topic handlers shared by every view using a push channel
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        SubscriptionRegistry {
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                routes: HashMap::new(),
                sink: None,
                active: 0,
                next_id: 0,
            }),
        }
    }

    /// Register `handler` for `topic`, replacing any previous handler.
    ///
    /// Without a live transport the entry is buffered and bound on the
    /// next `attach`.
    pub fn subscribe(&self, topic: Topic, handler: MessageHandler) -> SubscribeOutcome {
        let mut state = self.state.lock();

        match state.entries.get_mut(&topic) {
            Some(entry) => entry.handler = handler,
            None => {
                state.entries.insert(
                    topic.clone(),
                    Entry {
                        handler,
                        handle: None,
                        counted: false,
                    },
                );
            }
        }

        if state.sink.is_none() {
            tracing::debug!(topic = %topic, "transport offline, subscription buffered");
            return SubscribeOutcome::Buffered;
        }

        if state.bind(&topic) {
            SubscribeOutcome::Bound
        } else {
            SubscribeOutcome::Buffered
        }
    }

    /// Typed variant of [`subscribe`](Self::subscribe).
    pub fn subscribe_typed<T, F>(&self, topic: Topic, on_message: F) -> SubscribeOutcome
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = typed_handler(topic.clone(), on_message);
        self.subscribe(topic, handler)
    }

    /// Forget `topic`, releasing its transport handle. Idempotent.
    pub fn unsubscribe(&self, topic: &Topic) -> bool {
        let mut state = self.state.lock();

        let Some(entry) = state.entries.remove(topic) else {
            return false;
        };

        if let Some(handle) = entry.handle {
            state.routes.remove(&handle);
            if let Some(sink) = state.sink.as_ref()
                && let Err(e) = sink.unsubscribe(&handle)
            {
                tracing::debug!(topic = %topic, error = %e, "failed to release handle");
            }
        }

        if entry.counted {
            state.active = state.active.saturating_sub(1);
        }

        tracing::debug!(topic = %topic, active = state.active, "topic unsubscribed");
        true
    }

    /// Install a live transport and replay every known topic on it.
    /// Returns the number of topics bound.
    pub fn attach(&self, sink: Arc<dyn FrameSink>) -> usize {
        let mut state = self.state.lock();
        state.sink = Some(sink);
        state.routes.clear();

        let topics: Vec<Topic> = state.entries.keys().cloned().collect();
        let mut bound = 0;
        for topic in &topics {
            // Handles from the previous session mean nothing to the new one
            if let Some(entry) = state.entries.get_mut(topic) {
                entry.handle = None;
            }
            if state.bind(topic) {
                bound += 1;
            }
        }
        bound
    }

    /// Drop the transport. Entries stay registered for the next `attach`.
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.sink = None;
        state.routes.clear();
        for entry in state.entries.values_mut() {
            entry.handle = None;
        }
    }

    /// Route one inbound message to its handler.
    ///
    /// Lookup is by subscription handle, falling back to the destination.
    /// The handler runs outside the registry lock and may subscribe or
    /// unsubscribe re-entrantly.
    pub fn dispatch(&self, subscription: Option<&str>, destination: &str, body: &str) -> DispatchOutcome {
        let handler = {
            let state = self.state.lock();
            let topic = subscription
                .and_then(|id| state.routes.get(id))
                .map(|topic| topic.as_str())
                .unwrap_or(destination);
            match state.entries.get(topic) {
                Some(entry) => Arc::clone(&entry.handler),
                None => {
                    tracing::debug!(destination, "no handler for push message");
                    return DispatchOutcome::Unroutable;
                }
            }
        };

        let value = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(destination, error = %e, body, "dropping malformed push message");
                return DispatchOutcome::Malformed;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler(value))) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(_) => {
                tracing::error!(destination, "push handler panicked");
                DispatchOutcome::HandlerFailed
            }
        }
    }

    /// Topics bound to a live transport at least once and not yet unsubscribed
    pub fn active_count(&self) -> usize {
        self.state.lock().active
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.state.lock().entries.contains_key(topic)
    }

    pub fn is_bound(&self, topic: &Topic) -> bool {
        self.state
            .lock()
            .entries
            .get(topic)
            .is_some_and(|entry| entry.handle.is_some())
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.state.lock().entries.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a typed callback into a [`MessageHandler`]. Payloads that do not
/// match `T` are logged and dropped.
pub fn typed_handler<T, F>(topic: Topic, on_message: F) -> MessageHandler
where
    T: DeserializeOwned + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |value: Value| match serde_json::from_value::<T>(value) {
        Ok(message) => on_message(message),
        Err(e) => {
            tracing::warn!(topic = %topic, error = %e, "dropping push message with unexpected shape");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChannelError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        subscribed: Mutex<Vec<(String, String)>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    impl FrameSink for RecordingSink {
        fn subscribe(&self, handle: &SubscriptionHandle, topic: &Topic) -> Result<(), ChannelError> {
            self.subscribed
                .lock()
                .push((handle.to_string(), topic.to_string()));
            Ok(())
        }

        fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), ChannelError> {
            self.unsubscribed.lock().push(handle.to_string());
            Ok(())
        }

        fn disconnect(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct ClosedSink;

    impl FrameSink for ClosedSink {
        fn subscribe(&self, _: &SubscriptionHandle, _: &Topic) -> Result<(), ChannelError> {
            Err(ChannelError::Closed)
        }

        fn unsubscribe(&self, _: &SubscriptionHandle) -> Result<(), ChannelError> {
            Err(ChannelError::Closed)
        }

        fn disconnect(&self) -> Result<(), ChannelError> {
            Err(ChannelError::Closed)
        }
    }

    fn counting_handler() -> (MessageHandler, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: MessageHandler = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handler, calls)
    }

    fn topic(name: &str) -> Topic {
        Topic::new(name)
    }

    #[test]
    fn test_subscribe_while_offline_is_buffered() {
        let registry = SubscriptionRegistry::new();
        let (handler, _) = counting_handler();

        let outcome = registry.subscribe(topic("/topic/a"), handler);
        assert_eq!(outcome, SubscribeOutcome::Buffered);
        assert!(registry.contains(&topic("/topic/a")));
        assert!(!registry.is_bound(&topic("/topic/a")));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_attach_binds_each_buffered_topic_once() {
        let registry = SubscriptionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        registry.subscribe(topic("/topic/a"), counting_handler().0);
        registry.subscribe(topic("/topic/b"), counting_handler().0);

        assert_eq!(registry.attach(sink.clone()), 2);
        assert_eq!(sink.subscribed.lock().len(), 2);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_replay_after_reconnect_does_not_recount() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(topic("/topic/a"), counting_handler().0);

        for _ in 0..3 {
            let sink = Arc::new(RecordingSink::default());
            registry.attach(sink.clone());
            assert_eq!(sink.subscribed.lock().len(), 1);
            // Handles of a dead session are not released on the new one
            assert!(sink.unsubscribed.lock().is_empty());
            registry.detach();
        }

        assert_eq!(registry.active_count(), 1);
        assert!(!registry.is_bound(&topic("/topic/a")));
    }

    #[test]
    fn test_resubscribe_on_live_transport_replaces_handler() {
        let registry = SubscriptionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        registry.attach(sink.clone());

        let (first, first_calls) = counting_handler();
        let (second, second_calls) = counting_handler();
        assert_eq!(registry.subscribe(topic("/topic/a"), first), SubscribeOutcome::Bound);
        assert_eq!(registry.subscribe(topic("/topic/a"), second), SubscribeOutcome::Bound);

        assert_eq!(registry.active_count(), 1);
        assert_eq!(sink.unsubscribed.lock().as_slice(), ["sub-1"]);

        registry.dispatch(Some("sub-2"), "/topic/a", "{}");
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let registry = SubscriptionRegistry::new();
        let sink = Arc::new(RecordingSink::default());
        registry.attach(sink.clone());
        registry.subscribe(topic("/topic/a"), counting_handler().0);
        registry.subscribe(topic("/topic/b"), counting_handler().0);
        assert_eq!(registry.active_count(), 2);

        assert!(registry.unsubscribe(&topic("/topic/a")));
        assert!(!registry.unsubscribe(&topic("/topic/a")));

        assert_eq!(registry.active_count(), 1);
        assert_eq!(sink.unsubscribed.lock().len(), 1);
    }

    #[test]
    fn test_unsubscribe_buffered_topic_keeps_counter() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(topic("/topic/a"), counting_handler().0);

        assert!(registry.unsubscribe(&topic("/topic/a")));
        assert_eq!(registry.active_count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_bind_stays_buffered() {
        let registry = SubscriptionRegistry::new();
        registry.attach(Arc::new(ClosedSink));

        let outcome = registry.subscribe(topic("/topic/a"), counting_handler().0);
        assert_eq!(outcome, SubscribeOutcome::Buffered);
        assert_eq!(registry.active_count(), 0);

        let sink = Arc::new(RecordingSink::default());
        assert_eq!(registry.attach(sink), 1);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_dispatch_routes_by_handle_then_destination() {
        let registry = SubscriptionRegistry::new();
        registry.attach(Arc::new(RecordingSink::default()));
        let (handler, calls) = counting_handler();
        registry.subscribe(topic("/topic/a"), handler);

        assert_eq!(
            registry.dispatch(Some("sub-1"), "/ignored", "{\"id\": 1}"),
            DispatchOutcome::Delivered
        );
        assert_eq!(
            registry.dispatch(None, "/topic/a", "{\"id\": 2}"),
            DispatchOutcome::Delivered
        );
        assert_eq!(
            registry.dispatch(Some("sub-9"), "/topic/other", "{}"),
            DispatchOutcome::Unroutable
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_malformed_payload_is_dropped_and_stream_continues() {
        let registry = SubscriptionRegistry::new();
        registry.attach(Arc::new(RecordingSink::default()));
        let (handler, calls) = counting_handler();
        registry.subscribe(topic("/topic/a"), handler);

        assert_eq!(
            registry.dispatch(Some("sub-1"), "/topic/a", "{not json"),
            DispatchOutcome::Malformed
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            registry.dispatch(Some("sub-1"), "/topic/a", "{\"ok\": true}"),
            DispatchOutcome::Delivered
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let registry = SubscriptionRegistry::new();
        registry.attach(Arc::new(RecordingSink::default()));
        registry.subscribe(topic("/topic/a"), Arc::new(|_| panic!("boom")));

        assert_eq!(
            registry.dispatch(Some("sub-1"), "/topic/a", "{}"),
            DispatchOutcome::HandlerFailed
        );
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_typed_handler_skips_wrong_shape() {
        #[derive(serde::Deserialize)]
        struct Reading {
            value: i64,
        }

        let registry = SubscriptionRegistry::new();
        registry.attach(Arc::new(RecordingSink::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.subscribe_typed(topic("/topic/a"), move |r: Reading| sink.lock().push(r.value));

        registry.dispatch(Some("sub-1"), "/topic/a", "{\"other\": 1}");
        registry.dispatch(Some("sub-1"), "/topic/a", "{\"value\": 7}");
        assert_eq!(seen.lock().as_slice(), [7]);
    }

    #[test]
    fn test_handler_may_unsubscribe_reentrantly() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.attach(Arc::new(RecordingSink::default()));

        let inner = Arc::clone(&registry);
        registry.subscribe(
            topic("/topic/a"),
            Arc::new(move |_| {
                inner.unsubscribe(&Topic::new("/topic/a"));
            }),
        );

        assert_eq!(
            registry.dispatch(Some("sub-1"), "/topic/a", "{}"),
            DispatchOutcome::Delivered
        );
        assert!(registry.is_empty());
    }
}

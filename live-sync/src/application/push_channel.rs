//! Push channel client
//!
//! Keeps one logical session to the broker alive. A supervisor task opens
//! the session, replays the registry once the broker accepts it, routes
//! messages until a disconnect signal and retries after a flat delay.
//! A supervisor started after a disconnect waits for the previous one to
//! finish its teardown before opening a session.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::registry::{MessageHandler, SubscribeOutcome, SubscriptionRegistry};
use crate::domain::{Connector, Credential, FrameSink, Session, SessionEvent, Topic};

struct Supervisor {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Supervisor {
    fn is_live(&self) -> bool {
        !*self.shutdown.borrow() && !self.task.is_finished()
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Client side of the broker connection shared by every mounted view
pub struct PushChannel {
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriptionRegistry>,
    reconnect_delay: Duration,
    connected: Arc<watch::Sender<bool>>,
    supervisor: Mutex<Option<Supervisor>>,
}

impl PushChannel {
    pub fn new(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> Self {
        Self::with_registry(connector, Arc::new(SubscriptionRegistry::new()), reconnect_delay)
    }

    pub fn with_registry(
        connector: Arc<dyn Connector>,
        registry: Arc<SubscriptionRegistry>,
        reconnect_delay: Duration,
    ) -> Self {
        let (connected, _) = watch::channel(false);
        PushChannel {
            connector,
            registry,
            reconnect_delay,
            connected: Arc::new(connected),
            supervisor: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Connection state observable
    pub fn watch_connection(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    /// Start the supervisor. Returns false when one is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, credential: Credential) -> bool {
        let mut supervisor = self.supervisor.lock();
        if let Some(running) = supervisor.as_ref()
            && running.is_live()
        {
            tracing::debug!("push channel already running, connect ignored");
            return false;
        }

        // A retiring supervisor still owes its detach; the new one runs after it
        let previous = supervisor
            .take()
            .map(|retired| retired.task)
            .filter(|task| !task.is_finished());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(supervise(
            previous,
            Arc::clone(&self.connector),
            Arc::clone(&self.registry),
            Arc::clone(&self.connected),
            credential,
            self.reconnect_delay,
            shutdown_rx,
        ));

        *supervisor = Some(Supervisor {
            shutdown: shutdown_tx,
            task,
        });
        true
    }

    pub fn subscribe(&self, topic: Topic, handler: MessageHandler) -> SubscribeOutcome {
        self.registry.subscribe(topic, handler)
    }

    pub fn subscribe_typed<T, F>(&self, topic: Topic, on_message: F) -> SubscribeOutcome
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.registry.subscribe_typed(topic, on_message)
    }

    pub fn unsubscribe(&self, topic: &Topic) -> bool {
        self.registry.unsubscribe(topic)
    }

    /// Tear the session down. Deferred (returns false) while any topic is
    /// still subscribed.
    pub fn disconnect(&self) -> bool {
        let active = self.registry.active_count();
        if active > 0 {
            tracing::debug!(active, "disconnect deferred, topics still subscribed");
            return false;
        }

        if let Some(supervisor) = self.supervisor.lock().as_ref()
            && !supervisor.shutdown.send_replace(true)
        {
            tracing::info!("push channel disconnect requested");
        }
        true
    }

    /// Resolve once the channel reports disconnected
    pub async fn closed(&self) {
        let mut state = self.watch_connection();
        // Sender lives in self, so the wait cannot fail
        let _ = state.wait_for(|connected| !*connected).await;
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.get_mut().take() {
            supervisor.shutdown.send_replace(true);
        }
    }
}

async fn supervise(
    previous: Option<JoinHandle<()>>,
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriptionRegistry>,
    connected: Arc<watch::Sender<bool>>,
    credential: Credential,
    reconnect_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Some(previous) = previous
        && let Err(e) = previous.await
    {
        tracing::warn!(error = %e, "previous push supervisor failed");
    }

    loop {
        if *shutdown.borrow() {
            break;
        }

        let opened = tokio::select! {
            opened = connector.open(&credential) => opened,
            _ = shutdown.changed() => break,
        };

        let end = match opened {
            Ok(session) => run_session(session, &registry, &connected, &mut shutdown).await,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open push session");
                SessionEnd::Dropped
            }
        };

        registry.detach();
        if connected.send_replace(false) {
            tracing::info!("push channel disconnected");
        }

        if end == SessionEnd::Shutdown {
            break;
        }

        tracing::debug!(delay_ms = reconnect_delay.as_millis() as u64, "reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    registry.detach();
    connected.send_replace(false);
}

async fn run_session(
    session: Session,
    registry: &SubscriptionRegistry,
    connected: &watch::Sender<bool>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let Session { sink, mut events } = session;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.changed() => {
                close_sink(sink.as_ref());
                return SessionEnd::Shutdown;
            }
        };

        let Some(event) = event else {
            tracing::warn!("push session event stream ended");
            return SessionEnd::Dropped;
        };

        match event {
            SessionEvent::Connected { server } => {
                let replayed = registry.attach(Arc::clone(&sink));
                connected.send_replace(true);
                tracing::info!(server = server.as_deref().unwrap_or("unknown"), replayed, "push channel connected");
            }
            SessionEvent::Message {
                subscription,
                destination,
                body,
            } => {
                registry.dispatch(subscription.as_deref(), &destination, &body);
            }
            SessionEvent::ProtocolError(msg) => {
                tracing::warn!(error = %msg, "broker reported a protocol error");
                return SessionEnd::Dropped;
            }
            SessionEvent::Closed => {
                tracing::warn!("push session closed");
                return SessionEnd::Dropped;
            }
            SessionEvent::TransportError(msg) => {
                tracing::warn!(error = %msg, "push transport error");
                return SessionEnd::Dropped;
            }
        }
    }
}

fn close_sink(sink: &dyn FrameSink) {
    if let Err(e) = sink.disconnect() {
        tracing::debug!(error = %e, "failed to send disconnect");
    }
}

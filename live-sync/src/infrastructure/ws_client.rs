use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::stomp::{Command, Frame, FrameError};
use crate::domain::{
    ChannelError, Connector, Credential, FrameSink, Session, SessionEvent, SubscriptionHandle,
    Topic,
};

#[derive(Error, Debug)]
pub enum StompError {
    #[error("Connection error: {0}")]
    Connection(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Channel closed")]
    ChannelClosed,
}

impl From<StompError> for ChannelError {
    fn from(err: StompError) -> Self {
        match err {
            StompError::Connection(e) => ChannelError::Connection(e.to_string()),
            StompError::Frame(e) => ChannelError::Frame(e.to_string()),
            StompError::ChannelClosed => ChannelError::Closed,
        }
    }
}

/// Opens STOMP sessions over WebSocket
/// Infrastructure component - the domain only sees `Connector`
pub struct StompConnector {
    url: String,
    host: String,
    heartbeat: Duration,
}

impl StompConnector {
    pub fn new(url: impl Into<String>, host: impl Into<String>, heartbeat: Duration) -> Self {
        StompConnector {
            url: url.into(),
            host: host.into(),
            heartbeat,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open_session(&self, credential: &Credential) -> Result<Session, StompError> {
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let connect = Frame::connect(
            &self.host,
            &credential.authorization(),
            self.heartbeat.as_millis() as u64,
        );
        write.send(Message::Text(connect.encode().into())).await?;

        // Outgoing frames, queued by the sink
        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Frame>();

        // Session events for the push channel
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(1024);

        let heartbeat = self.heartbeat;
        let writer_events = event_tx.clone();
        tokio::spawn(async move {
            let mut ticker = (!heartbeat.is_zero()).then(|| tokio::time::interval(heartbeat));

            loop {
                let outgoing = tokio::select! {
                    frame = frame_rx.recv() => match frame {
                        Some(frame) => Message::Text(frame.encode().into()),
                        None => break,
                    },
                    _ = tick(&mut ticker) => Message::Text("\n".into()),
                };

                let closing = matches!(&outgoing, Message::Text(text) if text.starts_with("DISCONNECT"));

                if let Err(e) = write.send(outgoing).await {
                    let _ = writer_events
                        .send(SessionEvent::TransportError(e.to_string()))
                        .await;
                    break;
                }

                if closing {
                    let _ = write.close().await;
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let events = match msg {
                    Ok(Message::Text(text)) => session_events(&text),
                    Ok(Message::Close(_)) => {
                        let _ = event_tx.send(SessionEvent::Closed).await;
                        return;
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::trace!("Received ping: {:?}", data);
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(SessionEvent::TransportError(e.to_string())).await;
                        return;
                    }
                };

                for event in events {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            let _ = event_tx.send(SessionEvent::Closed).await;
        });

        Ok(Session {
            sink: Arc::new(StompSender { tx: frame_tx }),
            events: event_rx,
        })
    }
}

#[async_trait]
impl Connector for StompConnector {
    async fn open(&self, credential: &Credential) -> Result<Session, ChannelError> {
        tracing::debug!(url = %self.url, "opening STOMP session");
        Ok(self.open_session(credential).await?)
    }
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Translate one transport message into session events. Undecodable frames
/// are logged and skipped.
fn session_events(text: &str) -> Vec<SessionEvent> {
    Frame::decode_all(text)
        .into_iter()
        .filter_map(|decoded| match decoded {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable STOMP frame");
                None
            }
        })
        .filter_map(|frame| match frame.command {
            Command::Connected => Some(SessionEvent::Connected {
                server: frame.get("server").map(str::to_string),
            }),
            Command::Message => match frame.require("destination") {
                Ok(destination) => Some(SessionEvent::Message {
                    subscription: frame.get("subscription").map(str::to_string),
                    destination: destination.to_string(),
                    body: frame.body.clone(),
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping MESSAGE frame");
                    None
                }
            },
            Command::Error => {
                let message = frame
                    .get("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.clone());
                Some(SessionEvent::ProtocolError(message))
            }
            other => {
                tracing::debug!(command = %other, "ignoring STOMP frame");
                None
            }
        })
        .collect()
}

/// Outbound half of a STOMP session
pub struct StompSender {
    tx: mpsc::UnboundedSender<Frame>,
}

impl StompSender {
    fn send(&self, frame: Frame) -> Result<(), StompError> {
        self.tx.send(frame).map_err(|_| StompError::ChannelClosed)
    }
}

impl FrameSink for StompSender {
    fn subscribe(&self, handle: &SubscriptionHandle, topic: &Topic) -> Result<(), ChannelError> {
        Ok(self.send(Frame::subscribe(handle.as_str(), topic.as_str()))?)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<(), ChannelError> {
        Ok(self.send(Frame::unsubscribe(handle.as_str()))?)
    }

    fn disconnect(&self) -> Result<(), ChannelError> {
        Ok(self.send(Frame::disconnect())?)
    }
}

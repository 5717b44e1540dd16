//! Fake STOMP broker for integration tests
//!
//! Serves one WebSocket connection at a time, answers CONNECT with
//! CONNECTED, reports every client frame to the test and pushes MESSAGE
//! frames on request.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use live_sync::infrastructure::{Command, Frame};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub enum BrokerCommand {
    /// Push a MESSAGE frame with a raw body to a destination
    Publish { destination: String, body: String },
    /// Close the current connection
    Drop,
}

pub struct FakeBroker {
    pub addr: SocketAddr,
    frames: mpsc::UnboundedReceiver<Frame>,
    control: mpsc::UnboundedSender<BrokerCommand>,
}

impl FakeBroker {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (frame_tx, frames) = mpsc::unbounded_channel();
        let (control, mut control_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                serve(ws, &frame_tx, &mut control_rx).await;
            }
        });

        FakeBroker {
            addr,
            frames,
            control,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/notifier", self.addr)
    }

    pub fn publish(&self, destination: &str, body: &str) {
        let _ = self.control.send(BrokerCommand::Publish {
            destination: destination.to_string(),
            body: body.to_string(),
        });
    }

    pub fn drop_connection(&self) {
        let _ = self.control.send(BrokerCommand::Drop);
    }

    /// Next client frame with `command`, skipping others
    pub async fn expect(&mut self, command: Command) -> Frame {
        timeout(Duration::from_secs(3), async {
            loop {
                let frame = self.frames.recv().await.expect("broker stopped");
                if frame.command == command {
                    return frame;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", command))
    }

    /// Client frames received within `window`
    pub async fn drain(&mut self, window: Duration) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = timeout(window, self.frames.recv()).await {
            frames.push(frame);
        }
        frames
    }
}

async fn serve(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    frames: &mpsc::UnboundedSender<Frame>,
    control: &mut mpsc::UnboundedReceiver<BrokerCommand>,
) {
    let (mut write, mut read) = ws.split();
    // destination -> subscription id
    let mut subscriptions: HashMap<String, String> = HashMap::new();
    let mut message_id = 0u64;

    loop {
        tokio::select! {
            msg = read.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => continue,
                };
                for frame in Frame::decode_all(&text).into_iter().flatten() {
                    match frame.command {
                        Command::Connect | Command::Stomp => {
                            let connected = Frame::new(Command::Connected)
                                .header("version", "1.2")
                                .header("server", "fake-broker/1.0")
                                .header("heart-beat", "0,0");
                            if write.send(Message::Text(connected.encode().into())).await.is_err() {
                                return;
                            }
                        }
                        Command::Subscribe => {
                            if let (Some(id), Some(dest)) = (frame.get("id"), frame.get("destination")) {
                                subscriptions.insert(dest.to_string(), id.to_string());
                            }
                        }
                        Command::Unsubscribe => {
                            if let Some(id) = frame.get("id") {
                                subscriptions.retain(|_, sub| sub != id);
                            }
                        }
                        _ => {}
                    }
                    let _ = frames.send(frame);
                }
            }
            command = control.recv() => {
                match command {
                    Some(BrokerCommand::Publish { destination, body }) => {
                        message_id += 1;
                        let mut frame = Frame::new(Command::Message)
                            .header("destination", destination.as_str())
                            .header("message-id", message_id.to_string())
                            .header("content-type", "application/json");
                        if let Some(id) = subscriptions.get(&destination) {
                            frame = frame.header("subscription", id.as_str());
                        }
                        let frame = frame.with_body(body);
                        if write.send(Message::Text(frame.encode().into())).await.is_err() {
                            return;
                        }
                    }
                    Some(BrokerCommand::Drop) => {
                        let _ = write.close().await;
                        return;
                    }
                    None => return,
                }
            }
        }
    }
}

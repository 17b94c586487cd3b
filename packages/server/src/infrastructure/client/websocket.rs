//! WebSocket-backed client.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};

use crate::{
    domain::{Client, ClientError, ClientId, Payload},
    infrastructure::dto::websocket::{decode_packet, encode_packet},
    usecase::Hub,
};

use super::session::{Session, raised, take_once};

/// Client whose transport is an upgraded WebSocket connection
pub struct WebSocketClient {
    session: Session,
    sink: Mutex<Option<SplitSink<WebSocket, Message>>>,
    stream: Mutex<Option<SplitStream<WebSocket>>>,
}

impl WebSocketClient {
    /// Wrap an upgraded socket
    pub fn new(hub: Arc<Hub>, socket: WebSocket) -> Arc<Self> {
        let (sink, stream) = socket.split();
        Arc::new(Self {
            session: Session::new(hub),
            sink: Mutex::new(Some(sink)),
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Factory for [`Hub::serve`] that refuses connections once the hub
    /// holds `capacity` clients
    pub fn factory(
        capacity: usize,
    ) -> impl FnOnce(Arc<Hub>, WebSocket) -> Result<Arc<dyn Client>, ClientError> {
        move |hub, socket| {
            let current = hub.client_count();
            if current >= capacity {
                return Err(ClientError::CapacityExceeded { capacity, current });
            }
            let client: Arc<dyn Client> = Self::new(hub, socket);
            Ok(client)
        }
    }

    fn handle_frame(&self, message: Message) {
        let decoded = match message {
            Message::Binary(data) => decode_packet(&data),
            Message::Text(text) => decode_packet(text.as_str().as_bytes()),
            // Ping/pong is handled by the WebSocket protocol, close by the caller
            _ => return,
        };

        match decoded {
            Ok(packet) => {
                if let Some(payload) = self.session.accept_inbound(packet.payload) {
                    self.process_message(self.id(), payload);
                }
            }
            Err(e) => tracing::warn!("Dropping frame from client {}: {}", self.id(), e),
        }
    }
}

#[async_trait]
impl Client for WebSocketClient {
    fn id(&self) -> ClientId {
        self.session.id()
    }

    fn initialize(&self, id: ClientId) {
        self.session.initialize(id);
    }

    fn process_message(&self, sender_id: ClientId, payload: Payload) {
        self.session.process_message(sender_id, payload);
    }

    fn socket_send(&self, payload: Payload) {
        self.session.socket_send(payload);
    }

    fn socket_send_as(&self, payload: Payload, sender_id: ClientId) {
        self.session.socket_send_as(payload, sender_id);
    }

    fn pass_to_peer(&self, payload: Payload, peer_id: ClientId) {
        self.session.pass_to_peer(payload, peer_id);
    }

    fn broadcast(&self, payload: Payload) {
        self.session.broadcast(payload);
    }

    async fn read_pump(&self) {
        let Some(mut stream) = take_once(&self.stream) else {
            tracing::warn!("Read pump for client {} already started", self.id());
            return;
        };
        let mut shutdown = self.session.shutdown_signal();

        // Frames stay buffered in the socket until the hub assigns an id.
        if !self.session.wait_initialized(&mut shutdown).await {
            self.close("closed before registration");
            return;
        }

        loop {
            let frame = tokio::select! {
                _ = raised(&mut shutdown) => break,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("Client {} requested close", self.id());
                    break;
                }
                Some(Ok(message)) => self.handle_frame(message),
                Some(Err(e)) => {
                    tracing::debug!("Error reading from client {}: {}", self.id(), e);
                    break;
                }
                None => break,
            }
        }

        self.close("read pump closed");
    }

    async fn write_pump(&self) {
        let Some(mut sink) = take_once(&self.sink) else {
            tracing::warn!("Write pump for client {} already started", self.id());
            return;
        };
        let Some(mut outbound) = self.session.take_outbound() else {
            tracing::warn!("Outbound queue for client {} already taken", self.id());
            return;
        };
        let mut shutdown = self.session.shutdown_signal();

        loop {
            let packet = tokio::select! {
                _ = raised(&mut shutdown) => break,
                packet = outbound.recv() => packet,
            };
            let Some(packet) = packet else { break };

            let bytes = match encode_packet(packet) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Dropping packet for client {}: {}", self.id(), e);
                    continue;
                }
            };

            let sent = tokio::select! {
                _ = raised(&mut shutdown) => break,
                sent = sink.send(Message::Binary(bytes.into())) => sent,
            };
            if let Err(e) = sent {
                tracing::debug!("Error writing to client {}: {}", self.id(), e);
                break;
            }
        }

        // Sends the close frame; the read side then sees the end of stream.
        if let Err(e) = sink.close().await {
            tracing::debug!("Error closing connection of client {}: {}", self.id(), e);
        }
        self.close("write pump closed");
    }

    fn close(&self, reason: &str) {
        self.session.close(reason);
    }
}

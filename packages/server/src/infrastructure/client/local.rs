//! In-process client.
//!
//! The transport is a pair of channels instead of a socket, which lets a
//! program (or a test) take part in routing without any networking. The
//! "remote" end is a [`LocalPeer`] that sends payloads in and receives the
//! packets the client writes out.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    domain::{Client, ClientError, ClientId, Packet, Payload},
    usecase::Hub,
};

use super::session::{Session, raised, take_once};

/// Client side of an in-process transport
pub struct LocalConnection {
    inbound_rx: UnboundedReceiver<Payload>,
    outbound_tx: UnboundedSender<Packet>,
}

/// Remote side of an in-process transport
pub struct LocalPeer {
    inbound_tx: UnboundedSender<Payload>,
    outbound_rx: UnboundedReceiver<Packet>,
}

impl LocalConnection {
    /// Create a connected transport pair
    pub fn pair() -> (LocalConnection, LocalPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            LocalConnection {
                inbound_rx,
                outbound_tx,
            },
            LocalPeer {
                inbound_tx,
                outbound_rx,
            },
        )
    }
}

impl LocalPeer {
    /// Send a payload to the client as if it came off the wire.
    ///
    /// Returns `false` once the client has stopped reading.
    pub fn send(&self, payload: Payload) -> bool {
        self.inbound_tx.send(payload).is_ok()
    }

    /// Next packet written by the client; `None` once its transport is released
    pub async fn recv(&mut self) -> Option<Packet> {
        self.outbound_rx.recv().await
    }

    /// Next packet if one is already waiting
    pub fn try_recv(&mut self) -> Option<Packet> {
        self.outbound_rx.try_recv().ok()
    }
}

/// Client whose transport is a [`LocalConnection`]
pub struct LocalClient {
    session: Session,
    inbound: Mutex<Option<UnboundedReceiver<Payload>>>,
    outbound: Mutex<Option<UnboundedSender<Packet>>>,
}

impl LocalClient {
    /// Wrap an in-process connection
    pub fn new(hub: Arc<Hub>, connection: LocalConnection) -> Arc<Self> {
        Arc::new(Self {
            session: Session::new(hub),
            inbound: Mutex::new(Some(connection.inbound_rx)),
            outbound: Mutex::new(Some(connection.outbound_tx)),
        })
    }

    /// Factory for [`Hub::serve`]
    pub fn factory(
        hub: Arc<Hub>,
        connection: LocalConnection,
    ) -> Result<Arc<dyn Client>, ClientError> {
        let client: Arc<dyn Client> = Self::new(hub, connection);
        Ok(client)
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

#[async_trait]
impl Client for LocalClient {
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
        let Some(mut inbound) = take_once(&self.inbound) else {
            tracing::warn!("Read pump for client {} already started", self.id());
            return;
        };
        let mut shutdown = self.session.shutdown_signal();

        if !self.session.wait_initialized(&mut shutdown).await {
            self.close("closed before registration");
            return;
        }

        loop {
            let payload = tokio::select! {
                _ = raised(&mut shutdown) => break,
                payload = inbound.recv() => payload,
            };
            match payload {
                Some(payload) => {
                    if let Some(payload) = self.session.accept_inbound(payload) {
                        self.process_message(self.id(), payload);
                    }
                }
                None => break,
            }
        }

        self.close("read pump closed");
    }

    async fn write_pump(&self) {
        let Some(transport) = take_once(&self.outbound) else {
            tracing::warn!("Write pump for client {} already started", self.id());
            return;
        };
        let Some(mut queue) = self.session.take_outbound() else {
            tracing::warn!("Outbound queue for client {} already taken", self.id());
            return;
        };
        let mut shutdown = self.session.shutdown_signal();

        loop {
            let packet = tokio::select! {
                _ = raised(&mut shutdown) => break,
                packet = queue.recv() => packet,
            };
            let Some(packet) = packet else { break };

            if transport.send(packet).is_err() {
                tracing::debug!("Peer of client {} went away", self.id());
                break;
            }
        }

        // Dropping the sender is what releases the transport for the peer.
        drop(transport);
        self.close("write pump closed");
    }

    fn close(&self, reason: &str) {
        self.session.close(reason);
    }
}

//! State shared by every client implementation.
//!
//! Holds the identity, the outbound queue, the shutdown flag and the hub
//! handle, and implements the transport-independent half of the client
//! contract. Transports only add their two pumps on top.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use tokio::sync::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    watch,
};

use crate::{
    domain::{ClientId, Packet, Payload},
    usecase::Hub,
};

/// Take the value out of a one-shot slot
pub(crate) fn take_once<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Resolve once `flag` has been raised
pub(crate) async fn raised(flag: &mut watch::Receiver<bool>) {
    // The borrowed value is a lock guard; drop it before returning.
    let _ = flag.wait_for(|raised| *raised).await;
}

pub(crate) struct Session {
    hub: Arc<Hub>,
    id: AtomicU64,
    closed: AtomicBool,
    outbound_tx: UnboundedSender<Packet>,
    outbound_rx: Mutex<Option<UnboundedReceiver<Packet>>>,
    initialized_tx: watch::Sender<bool>,
    shutdown_tx: watch::Sender<bool>,
}

impl Session {
    pub(crate) fn new(hub: Arc<Hub>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (initialized_tx, _) = watch::channel(false);
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            hub,
            id: AtomicU64::new(ClientId::SYSTEM.value()),
            closed: AtomicBool::new(false),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            initialized_tx,
            shutdown_tx,
        }
    }

    pub(crate) fn id(&self) -> ClientId {
        ClientId::new(self.id.load(Ordering::SeqCst))
    }

    pub(crate) fn initialize(&self, id: ClientId) {
        self.id.store(id.value(), Ordering::SeqCst);

        // Closed while still waiting for registration: `close` could not
        // unregister without an identity, so leave the hub from here.
        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!("Client {} closed before registration completed", id);
            self.hub.unregister(id);
            return;
        }

        self.socket_send(Payload::Id { id });
        self.initialized_tx.send_replace(true);
    }

    /// Wait until the hub has initialized this session.
    ///
    /// Returns `false` if the session was closed first. Read pumps call this
    /// before reading so that nothing is routed under `ClientId::SYSTEM`.
    pub(crate) async fn wait_initialized(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut initialized = self.initialized_tx.subscribe();
        tokio::select! {
            _ = raised(shutdown) => false,
            _ = raised(&mut initialized) => true,
        }
    }

    /// Filter a payload that arrived from the transport.
    ///
    /// Identity announcements are issued by the hub only, so one coming in
    /// from a client is dropped.
    pub(crate) fn accept_inbound(&self, payload: Payload) -> Option<Payload> {
        if payload.is_server_issued() {
            tracing::debug!(
                "Dropping {} payload sent by client {}",
                payload.kind(),
                self.id()
            );
            return None;
        }
        Some(payload)
    }

    /// Default routing: own messages go to everyone else, messages from
    /// others go out on this connection.
    pub(crate) fn process_message(&self, sender_id: ClientId, payload: Payload) {
        if sender_id == self.id() {
            self.broadcast(payload);
        } else {
            self.socket_send_as(payload, sender_id);
        }
    }

    pub(crate) fn socket_send(&self, payload: Payload) {
        self.socket_send_as(payload, self.id());
    }

    pub(crate) fn socket_send_as(&self, payload: Payload, sender_id: ClientId) {
        if self
            .outbound_tx
            .send(Packet::new(sender_id, payload))
            .is_err()
        {
            tracing::debug!("Client {} write pump has stopped; packet dropped", self.id());
        }
    }

    pub(crate) fn pass_to_peer(&self, payload: Payload, peer_id: ClientId) {
        if self.id().is_system() {
            tracing::debug!("Uninitialized client cannot reach peer {}; dropped", peer_id);
            return;
        }
        if !self.hub.deliver_to(peer_id, self.id(), payload) {
            tracing::debug!("Peer {} not found; message from {} dropped", peer_id, self.id());
        }
    }

    pub(crate) fn broadcast(&self, payload: Payload) {
        // Identity 0 is reserved for the system.
        if self.id().is_system() {
            tracing::debug!("Uninitialized client cannot broadcast; dropped");
            return;
        }
        self.hub.broadcast(Packet::new(self.id(), payload));
    }

    /// Mark the session closed, leave the hub and stop both pumps.
    ///
    /// Returns `false` if the session was already closed.
    pub(crate) fn close(&self, reason: &str) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let id = self.id();
        tracing::info!("Client {} closing: {}", id, reason);

        // Not registered yet: `initialize` unregisters once the id exists.
        if !id.is_system() {
            self.hub.unregister(id);
        }
        self.shutdown_tx.send_replace(true);
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn take_outbound(&self) -> Option<UnboundedReceiver<Packet>> {
        take_once(&self.outbound_rx)
    }

    /// Receiver to pass to [`raised`]
    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

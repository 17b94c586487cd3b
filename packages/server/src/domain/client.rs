//! Capability contract of a connected client.
//!
//! The hub only ever talks to connections through this trait, so any
//! transport (WebSocket, in-process channels, test doubles) can take part in
//! routing by implementing it.

use async_trait::async_trait;

use super::{entity::Payload, value_object::ClientId};

/// Operations every participant routed by the hub must support.
///
/// Implementations are shared as `Arc<dyn Client>` between the hub's control
/// loop and the client's own pump tasks, so every method takes `&self`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Client: Send + Sync {
    /// Identity assigned by the hub, or `ClientId::SYSTEM` before `initialize`.
    fn id(&self) -> ClientId;

    /// Assign the identity and run per-connection setup.
    ///
    /// Called exactly once, from the hub's control loop, before any routed
    /// message reaches this client.
    fn initialize(&self, id: ClientId);

    /// Handle one message routed to this client.
    ///
    /// Runs synchronously on the caller's task (the hub's loop for broadcasts,
    /// the sending client's task for peer delivery) and must not block.
    fn process_message(&self, sender_id: ClientId, payload: Payload);

    /// Queue a payload on this client's own connection, sent as itself.
    fn socket_send(&self, payload: Payload);

    /// Queue a payload on this client's own connection, sent as `sender_id`.
    fn socket_send_as(&self, payload: Payload, sender_id: ClientId);

    /// Hand a payload to exactly one other client for processing.
    fn pass_to_peer(&self, payload: Payload, peer_id: ClientId);

    /// Ask the hub to deliver a payload to every other client.
    fn broadcast(&self, payload: Payload);

    /// Receive from the transport until the connection ends.
    async fn read_pump(&self);

    /// Drain the outbound queue into the transport until the connection ends.
    async fn write_pump(&self);

    /// Release the transport and leave the hub. Idempotent.
    fn close(&self, reason: &str);
}

//! Core domain models routed by the hub.

use super::value_object::ClientId;

/// Application message carried inside a [`Packet`].
///
/// The hub never looks inside a payload; it only routes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A line of chat text
    Chat { msg: String },
    /// Tells a freshly registered client which identity it was given
    Id { id: ClientId },
}

impl Payload {
    /// Create a chat payload
    pub fn chat(msg: impl Into<String>) -> Self {
        Self::Chat { msg: msg.into() }
    }

    /// Short name of the payload variant, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Id { .. } => "id",
        }
    }

    /// Whether only the hub may originate this payload
    pub fn is_server_issued(&self) -> bool {
        matches!(self, Self::Id { .. })
    }
}

/// Routed envelope: who sent it and what it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sender identity (`ClientId::SYSTEM` for hub-originated packets)
    pub sender_id: ClientId,
    /// Opaque application payload
    pub payload: Payload,
}

impl Packet {
    /// Create a new packet
    pub fn new(sender_id: ClientId, payload: Payload) -> Self {
        Self { sender_id, payload }
    }
}

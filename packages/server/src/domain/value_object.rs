//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Client identifier value object.
///
/// Assigned by the hub when a client registers. `ClientId::SYSTEM` (0) is
/// reserved for messages that do not originate from any client and is never
/// handed out to a connection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClientId(u64);

impl ClientId {
    /// Sender identity of system-originated messages.
    pub const SYSTEM: ClientId = ClientId(0);

    /// Create a new ClientId.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the inner u64 value.
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved system identity.
    pub const fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM.0
    }
}

impl From<u64> for ClientId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ClientId> for u64 {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

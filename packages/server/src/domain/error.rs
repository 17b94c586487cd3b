//! Domain layer error definitions.

use thiserror::Error;

/// Errors raised while wrapping a connection into a client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The hub already holds as many clients as it accepts
    #[error("Client capacity exceeded: maximum {capacity} clients allowed (current: {current})")]
    CapacityExceeded { capacity: usize, current: usize },
}

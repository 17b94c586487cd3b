//! UseCase layer error definitions.

use thiserror::Error;

/// Errors raised by the hub
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// `run` was called on a hub whose control loop has already been started
    #[error("Hub control loop is already running")]
    AlreadyRunning,
}

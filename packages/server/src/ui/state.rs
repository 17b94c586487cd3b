//! Server state shared by the handlers.

use std::sync::Arc;

use crate::usecase::Hub;

/// Shared application state
pub struct AppState {
    /// The process-wide hub
    pub hub: Arc<Hub>,
    /// Connections beyond this many clients are refused
    pub max_clients: usize,
}

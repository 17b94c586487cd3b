//! WebSocket hub server implementation.

mod error;
mod handler;
mod runner;
mod signal;
pub mod state;

pub use error::ServerError;
pub use runner::{ServerConfig, create_router, run};

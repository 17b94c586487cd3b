//! WebSocket hub server library.
//!
//! This library provides the connection hub of a real-time multi-client
//! server: a coordinator that registers clients, assigns their identities and
//! routes messages between them, plus WebSocket and in-process transports.

pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use ui::{ServerConfig, run};
pub use usecase::Hub;

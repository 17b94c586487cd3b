//! Client implementations, one per transport.

mod session;

pub mod local;
pub mod websocket;

pub use local::{LocalClient, LocalConnection, LocalPeer};
pub use websocket::WebSocketClient;

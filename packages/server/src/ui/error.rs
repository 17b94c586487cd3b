//! UI layer error definitions.

use thiserror::Error;

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

//! Server startup and routing.

use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    ui::{
        error::ServerError,
        handler::{health_check, list_clients, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
    usecase::Hub,
};

/// Default port, as in `--port`
pub const DEFAULT_PORT: u16 = 8080;

/// Default limit on concurrently connected clients
pub const DEFAULT_MAX_CLIENTS: usize = 1024;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Connections beyond this many clients are refused
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the router for the given state
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/clients", get(list_clients))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the hub and serve until a shutdown signal arrives
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let hub = Arc::new(Hub::new());
    let runner = Arc::clone(&hub);
    tokio::spawn(async move {
        if let Err(e) = runner.run().await {
            tracing::error!("Hub stopped: {}", e);
        }
    });

    let state = Arc::new(AppState {
        hub,
        max_clients: config.max_clients,
    });
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    tracing::info!("Starting server on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(ServerError::Serve)?;

    tracing::info!("Server stopped");
    Ok(())
}

//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, State, ws::WebSocketUpgrade},
    response::IntoResponse,
};

use crate::{infrastructure::client::WebSocketClient, ui::state::AppState};

/// Upgrade the request and admit the connection through the hub
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    tracing::info!("New client connected from {}", remote_addr);

    ws.on_upgrade(move |socket| async move {
        state
            .hub
            .serve(WebSocketClient::factory(state.max_clients), socket);
    })
}

//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    infrastructure::dto::http::{ClientListDto, HealthDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// List the identities of connected clients
pub async fn list_clients(State(state): State<Arc<AppState>>) -> Json<ClientListDto> {
    let client_ids: Vec<u64> = state
        .hub
        .client_ids()
        .into_iter()
        .map(|id| id.value())
        .collect();

    Json(ClientListDto {
        count: client_ids.len(),
        client_ids,
    })
}

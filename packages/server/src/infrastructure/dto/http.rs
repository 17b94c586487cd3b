//! HTTP API response DTOs for the hub.

use serde::{Deserialize, Serialize};

/// Connected clients for the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientListDto {
    pub count: usize,
    pub client_ids: Vec<u64>, // ascending
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

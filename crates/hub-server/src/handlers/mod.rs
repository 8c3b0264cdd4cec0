//! HTTP handlers

pub mod comments;
pub mod stations;

use crate::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use hub_types::{HealthResponse, ServiceInfo};

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Global Music Hub API".to_string(),
        status: "running".to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        store: state.gateway.mode().as_str().to_string(),
    })
}

//! HTTP request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TargetType;

/// Default page size for station listings
pub const DEFAULT_STATION_LIMIT: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_STATION_LIMIT)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_STATION_LIMIT)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentListQuery {
    pub target_type: TargetType,
}

/// Plain `{message}` body used for confirmations and errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `connected` or `degraded`
    pub store: String,
}

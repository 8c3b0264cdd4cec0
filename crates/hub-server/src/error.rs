//! HTTP-facing errors

use crate::services::comments::CommentError;
use crate::services::directory::UpstreamError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hub_types::MessageResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn upstream(context: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| ApiError::Upstream { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl From<CommentError> for ApiError {
    fn from(e: CommentError) -> Self {
        match e {
            CommentError::NotFound => ApiError::NotFound(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

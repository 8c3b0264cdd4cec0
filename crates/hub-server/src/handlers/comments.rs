//! Comment handlers
//!
//! Write responses carry an `x-persistence` header with the durability of the
//! write. The body is the same whether or not the write reached the store.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use hub_types::{Comment, CommentListQuery, MessageResponse, NewComment};

pub const PERSISTENCE_HEADER: &str = "x-persistence";

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<NewComment>,
) -> ([(&'static str, &'static str); 1], Json<Comment>) {
    let persisted = state.comments.create(req).await;
    (
        [(PERSISTENCE_HEADER, persisted.durability.as_str())],
        Json(persisted.value),
    )
}

pub async fn list(
    State(state): State<AppState>,
    Path(target_id): Path<String>,
    Query(query): Query<CommentListQuery>,
) -> Json<Vec<Comment>> {
    Json(state.comments.list(&target_id, query.target_type).await)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<([(&'static str, &'static str); 1], Json<MessageResponse>), ApiError> {
    let durability = state.comments.delete(&id).await?;
    Ok((
        [(PERSISTENCE_HEADER, durability.as_str())],
        Json(MessageResponse::new("Comment deleted")),
    ))
}

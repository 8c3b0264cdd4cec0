//! Comment store
//!
//! Writes are fail-open: if the store rejects a write the caller still gets the
//! record, and the returned [`Durability`] says what actually happened.

use crate::storage::{Collection, Document, Durability, Filter, Persisted, PersistenceGateway};
use chrono::Utc;
use hub_types::{Comment, NewComment, TargetType};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommentError {
    #[error("Comment not found")]
    NotFound,
}

pub struct CommentStore {
    gateway: Arc<PersistenceGateway>,
}

impl CommentStore {
    pub fn new(gateway: Arc<PersistenceGateway>) -> Self {
        Self { gateway }
    }

    pub async fn create(&self, new: NewComment) -> Persisted<Comment> {
        let comment = Comment::new(new, Utc::now());
        info!(
            "Creating comment: id={}, target={}:{}",
            comment.id, comment.target_type, comment.target_id
        );

        let durability = match to_document(&comment) {
            Some(doc) => match self.gateway.insert(Collection::Comments, doc).await {
                Ok(()) => self.gateway.applied(),
                Err(e) => {
                    error!("Failed to persist comment {}: {}", comment.id, e);
                    Durability::NotDurable
                }
            },
            None => Durability::NotDurable,
        };

        Persisted {
            value: comment,
            durability,
        }
    }

    /// Comments for a target, newest first. Store errors yield an empty list.
    pub async fn list(&self, target_id: &str, target_type: TargetType) -> Vec<Comment> {
        let filter = Filter::new()
            .eq("target_id", target_id)
            .eq("target_type", target_type.as_str());

        let docs = match self.gateway.find(Collection::Comments, &filter).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Failed to list comments for {}:{}: {}", target_type, target_id, e);
                return Vec::new();
            }
        };

        let mut comments: Vec<Comment> = docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(Value::Object(doc)) {
                Ok(comment) => Some(comment),
                Err(e) => {
                    warn!("Skipping unreadable comment record: {}", e);
                    None
                }
            })
            .collect();
        // Stores return insertion order; reversing first keeps later inserts
        // ahead of earlier ones that share a timestamp.
        comments.reverse();
        comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        comments
    }

    /// Delete a comment by id.
    ///
    /// The id is looked up first; no match, or a lookup the store cannot
    /// answer, is [`CommentError::NotFound`]. Once a match is confirmed, a store
    /// error during the delete itself is logged and reported as
    /// [`Durability::NotDurable`] rather than failing the call.
    pub async fn delete(&self, id: &str) -> Result<Durability, CommentError> {
        let filter = Filter::new().eq("id", id);

        match self.gateway.find(Collection::Comments, &filter).await {
            Ok(docs) if !docs.is_empty() => {}
            Ok(_) => return Err(CommentError::NotFound),
            Err(e) => {
                warn!("Failed to look up comment {}: {}", id, e);
                return Err(CommentError::NotFound);
            }
        }

        match self.gateway.delete(Collection::Comments, &filter).await {
            Ok(0) => Err(CommentError::NotFound),
            Ok(_) => {
                info!("Deleted comment {}", id);
                Ok(self.gateway.applied())
            }
            Err(e) => {
                error!("Failed to delete comment {}, reporting success anyway: {}", id, e);
                Ok(Durability::NotDurable)
            }
        }
    }
}

fn to_document(comment: &Comment) -> Option<Document> {
    match serde_json::to_value(comment) {
        Ok(Value::Object(doc)) => Some(doc),
        Ok(_) => None,
        Err(e) => {
            error!("Failed to encode comment {}: {}", comment.id, e);
            None
        }
    }
}

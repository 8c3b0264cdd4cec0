//! Comment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a comment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Station,
    Track,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Station => "station",
            TargetType::Track => "track",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "station" => Ok(TargetType::Station),
            "track" => Ok(TargetType::Track),
            other => Err(format!("unknown target type: {}", other)),
        }
    }
}

/// Comment payload as submitted by a client.
///
/// `id` and `timestamp` are never taken from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub content: String,
    pub author: String,
    /// Station or track ID. Not checked against stored stations.
    pub target_id: String,
    pub target_type: TargetType,
}

/// A stored comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub target_id: String,
    pub target_type: TargetType,
    pub timestamp: DateTime<Utc>,
}

impl Comment {
    /// Build a comment with a fresh UUID and the given creation time
    pub fn new(new: NewComment, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: new.content,
            author: new.author,
            target_id: new.target_id,
            target_type: new.target_type,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewComment {
        NewComment {
            content: "hello".to_string(),
            author: "alice".to_string(),
            target_id: "S1".to_string(),
            target_type: TargetType::Station,
        }
    }

    #[test]
    fn test_target_type_wire_format() {
        assert_eq!(
            serde_json::to_value(TargetType::Track).unwrap(),
            serde_json::json!("track")
        );
        assert_eq!("station".parse::<TargetType>(), Ok(TargetType::Station));
        assert!("album".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_new_comment_rejects_unknown_target_type() {
        let body = r#"{"content":"c","author":"a","target_id":"t","target_type":"album"}"#;
        assert!(serde_json::from_str::<NewComment>(body).is_err());
    }

    #[test]
    fn test_new_comment_requires_all_fields() {
        let body = r#"{"content":"c","target_id":"t","target_type":"station"}"#;
        assert!(serde_json::from_str::<NewComment>(body).is_err());
    }

    #[test]
    fn test_comment_ids_are_unique() {
        let now = Utc::now();
        let a = Comment::new(sample(), now);
        let b = Comment::new(sample(), now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.content, "hello");
        assert_eq!(a.target_type, TargetType::Station);
    }

    #[test]
    fn test_comment_json_shape() {
        let comment = Comment::new(sample(), Utc::now());
        let value = serde_json::to_value(&comment).unwrap();
        for field in ["id", "content", "author", "target_id", "target_type", "timestamp"] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(value["target_type"], "station");
    }
}

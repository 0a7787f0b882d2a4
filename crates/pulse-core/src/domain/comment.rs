use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

/// Comment entity - a reply attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(author_id: Uuid, post_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: author_id,
            post_id,
            content,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// A comment with its author's public details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserSummary,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

use super::user::UserSummary;

/// Upper bound on post and comment bodies, in characters.
pub const MAX_CONTENT_LEN: usize = 1000;

/// Post entity.
///
/// Publication and deletion are tracked by separate flags: a scheduled post
/// starts unpublished and is flipped by the publication sweep, while deletion
/// is a terminal soft-delete that the sweep never reverses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub comments_enabled: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub is_published: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a post at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostState {
    Pending,
    Published,
    Deleted,
}

impl Post {
    /// Create a post for `author_id`. Unscheduled posts and posts whose
    /// schedule already matured are published immediately.
    pub fn new(author_id: Uuid, draft: NewPost, now: DateTime<Utc>) -> Self {
        let is_published = draft.scheduled_at.is_none_or(|at| at <= now);
        Self {
            id: Uuid::new_v4(),
            user_id: author_id,
            content: draft.content,
            media_url: draft.media_url,
            comments_enabled: draft.comments_enabled,
            scheduled_at: draft.scheduled_at,
            is_published,
            is_deleted: false,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted && self.is_published && self.schedule_matured(now)
    }

    /// Whether the publication sweep should publish this post.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted
            && !self.is_published
            && self.scheduled_at.is_some_and(|at| at <= now)
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> PostState {
        if self.is_deleted {
            PostState::Deleted
        } else if self.is_visible_at(now) {
            PostState::Published
        } else {
            PostState::Pending
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Apply the supplied fields of `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: &PostUpdate, now: DateTime<Utc>) {
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(media_url) = &update.media_url {
            self.media_url = media_url.clone();
        }
        if let Some(enabled) = update.comments_enabled {
            self.comments_enabled = enabled;
        }
        self.updated_at = Some(now);
    }

    fn schedule_matured(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|at| at <= now)
    }
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub media_url: Option<String>,
    pub comments_enabled: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            media_url: None,
            comments_enabled: true,
            scheduled_at: None,
        }
    }

    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }

    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn without_comments(mut self) -> Self {
        self.comments_enabled = false;
        self
    }
}

/// Sparse set of post fields an author may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    pub content: Option<String>,
    /// `Some(None)` removes the media attachment.
    pub media_url: Option<Option<String>>,
    pub comments_enabled: Option<bool>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.media_url.is_none() && self.comments_enabled.is_none()
    }
}

/// Which of an author's posts a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorPosts {
    /// Every non-deleted post, pending ones included. Used for the author's own view.
    Own,
    /// Only posts visible at the listing instant.
    Visible,
}

/// A post with its author's public details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredPost {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
}

/// A feed entry: a visible post with author details and engagement counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub username: String,
    pub full_name: String,
    pub like_count: i64,
    pub comment_count: i64,
}

/// Check a post or comment body: non-blank and within [`MAX_CONTENT_LEN`].
pub fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::Validation("content must not be empty".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(DomainError::Validation(format!(
            "content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AuthoredComment, Comment, Page, Post, validate_content};
use crate::error::{DomainError, DomainResult};
use crate::ports::{CommentRepository, LikeRepository, PostRepository};

/// Likes and comments on posts.
#[derive(Clone)]
pub struct EngagementService {
    posts: Arc<dyn PostRepository>,
    likes: Arc<dyn LikeRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl EngagementService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        likes: Arc<dyn LikeRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            posts,
            likes,
            comments,
        }
    }

    /// Like a post. Idempotent; returns the like count afterwards.
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> DomainResult<u64> {
        self.live_post(post_id).await?;
        self.likes.insert(user_id, post_id).await?;
        Ok(self.likes.count_for_post(post_id).await?)
    }

    /// Remove a like. Idempotent; returns the like count afterwards.
    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> DomainResult<u64> {
        self.live_post(post_id).await?;
        self.likes.delete(user_id, post_id).await?;
        Ok(self.likes.count_for_post(post_id).await?)
    }

    pub async fn like_count(&self, post_id: Uuid) -> DomainResult<u64> {
        Ok(self.likes.count_for_post(post_id).await?)
    }

    pub async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> DomainResult<bool> {
        Ok(self.likes.exists(user_id, post_id).await?)
    }

    pub async fn liked_posts(&self, user_id: Uuid) -> DomainResult<Vec<Uuid>> {
        Ok(self.likes.posts_liked_by(user_id).await?)
    }

    pub async fn create_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        content: String,
    ) -> DomainResult<Comment> {
        validate_content(&content)?;
        let post = self.live_post(post_id).await?;
        if !post.comments_enabled {
            return Err(DomainError::InvalidOperation(
                "Comments are disabled for this post".to_string(),
            ));
        }

        let comment = Comment::new(author_id, post_id, content);
        Ok(self.comments.create(comment).await?)
    }

    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        content: &str,
    ) -> DomainResult<Comment> {
        validate_content(content)?;
        self.comments
            .update_owned(comment_id, author_id, content, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found_or_forbidden("Comment"))
    }

    pub async fn delete_comment(&self, comment_id: Uuid, author_id: Uuid) -> DomainResult<()> {
        if self.comments.delete_owned(comment_id, author_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found_or_forbidden("Comment"))
        }
    }

    /// Comments on a post in conversational (oldest first) order.
    pub async fn comments_for_post(
        &self,
        post_id: Uuid,
        page: Page,
    ) -> DomainResult<Vec<AuthoredComment>> {
        Ok(self.comments.list_for_post(post_id, page).await?)
    }

    async fn live_post(&self, post_id: Uuid) -> DomainResult<Post> {
        match self.posts.find_by_id(post_id).await? {
            Some(post) if !post.is_deleted => Ok(post),
            _ => Err(DomainError::not_found("Post", post_id)),
        }
    }
}

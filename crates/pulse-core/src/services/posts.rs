use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AuthorPosts, AuthoredPost, NewPost, Page, Post, PostUpdate, validate_content};
use crate::error::{DomainError, DomainResult};
use crate::ports::PostRepository;

/// Post lifecycle: creation, partial update, soft deletion and publication.
#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Create a post. It is pending when scheduled in the future and
    /// published otherwise.
    pub async fn create_post(&self, author_id: Uuid, draft: NewPost) -> DomainResult<Post> {
        validate_content(&draft.content)?;
        let post = Post::new(author_id, draft, Utc::now());
        Ok(self.posts.create(post).await?)
    }

    /// Fetch a post and its author in any state; deleted posts still resolve.
    pub async fn get_post(&self, id: Uuid) -> DomainResult<AuthoredPost> {
        self.posts
            .find_authored(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))
    }

    pub async fn posts_by_author(
        &self,
        author_id: Uuid,
        scope: AuthorPosts,
        page: Page,
    ) -> DomainResult<Vec<AuthoredPost>> {
        Ok(self
            .posts
            .find_by_author(author_id, scope, page, Utc::now())
            .await?)
    }

    /// Apply the supplied fields. Missing, deleted and foreign posts are
    /// indistinguishable to the caller.
    pub async fn update_post(
        &self,
        id: Uuid,
        author_id: Uuid,
        update: PostUpdate,
    ) -> DomainResult<Post> {
        if update.is_empty() {
            return Err(DomainError::Validation(
                "at least one field must be supplied".to_string(),
            ));
        }
        if let Some(content) = &update.content {
            validate_content(content)?;
        }

        self.posts
            .update_owned(id, author_id, &update, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found_or_forbidden("Post"))
    }

    pub async fn delete_post(&self, id: Uuid, author_id: Uuid) -> DomainResult<()> {
        if self.posts.soft_delete_owned(id, author_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found_or_forbidden("Post"))
        }
    }

    pub async fn search_posts(
        &self,
        query: &str,
        page: Page,
    ) -> DomainResult<Vec<AuthoredPost>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::Validation("search query is required".to_string()));
        }
        Ok(self.posts.search(query, page, Utc::now()).await?)
    }

    /// Publish every scheduled post whose time has come. Safe to run
    /// repeatedly and from several processes: the flip is a single
    /// conditional update.
    pub async fn publish_due(&self) -> DomainResult<Vec<Uuid>> {
        Ok(self.posts.publish_due(Utc::now()).await?)
    }
}

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{FollowCounts, UserSummary};
use crate::error::{DomainError, DomainResult};
use crate::ports::FollowRepository;

/// Directed follow graph.
#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowRepository>) -> Self {
        Self { follows }
    }

    /// Create the edge `follower -> followee`. Idempotent; returns whether
    /// the edge is new.
    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> DomainResult<bool> {
        if follower_id == followee_id {
            return Err(DomainError::InvalidOperation(
                "You cannot follow yourself".to_string(),
            ));
        }
        Ok(self.follows.insert(follower_id, followee_id).await?)
    }

    /// Remove the edge if present; absent edges are not an error.
    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> DomainResult<bool> {
        Ok(self.follows.delete(follower_id, followee_id).await?)
    }

    pub async fn is_following(&self, follower_id: Uuid, followee_id: Uuid) -> DomainResult<bool> {
        Ok(self.follows.exists(follower_id, followee_id).await?)
    }

    pub async fn following(&self, user_id: Uuid) -> DomainResult<Vec<UserSummary>> {
        Ok(self.follows.following(user_id).await?)
    }

    pub async fn followers(&self, user_id: Uuid) -> DomainResult<Vec<UserSummary>> {
        Ok(self.follows.followers(user_id).await?)
    }

    pub async fn counts(&self, user_id: Uuid) -> DomainResult<FollowCounts> {
        Ok(FollowCounts {
            following_count: self.follows.count_following(user_id).await?,
            followers_count: self.follows.count_followers(user_id).await?,
        })
    }
}

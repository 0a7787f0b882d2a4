use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{FeedItem, Page};
use crate::error::DomainResult;
use crate::ports::FeedRepository;

/// Home feed composition.
///
/// The feed is joined at read time against the live follow graph, so a
/// follow or unfollow is reflected by the very next read.
#[derive(Clone)]
pub struct FeedService {
    feed: Arc<dyn FeedRepository>,
}

impl FeedService {
    pub fn new(feed: Arc<dyn FeedRepository>) -> Self {
        Self { feed }
    }

    pub async fn feed(&self, viewer: Uuid, page: Page) -> DomainResult<Vec<FeedItem>> {
        Ok(self.feed.feed(viewer, page, Utc::now()).await?)
    }
}

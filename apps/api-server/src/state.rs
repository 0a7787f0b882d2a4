//! Application state - shared across all handlers.

use std::sync::Arc;

use pulse_core::ports::{
    CommentRepository, FeedRepository, FollowRepository, LikeRepository, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use pulse_core::services::{
    AccountService, EngagementService, FeedService, FollowService, PostService,
};
use pulse_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService};

#[cfg(feature = "postgres")]
use pulse_infra::database::{
    PostgresCommentRepository, PostgresFollowRepository, PostgresLikeRepository,
    PostgresPostRepository, PostgresUserRepository, connect,
};

use crate::config::AppConfig;

/// One implementation of every repository port.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub feed: Arc<dyn FeedRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub comments: Arc<dyn CommentRepository>,
    /// Name of the backing store, reported by the health check.
    pub backend: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            feed: store.clone(),
            follows: store.clone(),
            likes: store.clone(),
            comments: store,
            backend: "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub posts: PostService,
    pub feed: FeedService,
    pub follows: FollowService,
    pub engagement: EngagementService,
    pub backend: &'static str,
}

impl AppState {
    /// Wire services over the given repositories and credential services.
    pub fn from_parts(
        repos: Repositories,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            accounts: AccountService::new(repos.users, passwords, tokens),
            posts: PostService::new(repos.posts.clone()),
            feed: FeedService::new(repos.feed),
            follows: FollowService::new(repos.follows),
            engagement: EngagementService::new(repos.posts, repos.likes, repos.comments),
            backend: repos.backend,
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = Self::repositories(config).await;
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));

        tracing::info!(store = repos.backend, "Application state initialized");
        Self::from_parts(repos, passwords, tokens)
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Repositories::in_memory();
        };

        match connect(db_config).await {
            Ok(db) => {
                let db = Arc::new(db);
                let posts = Arc::new(PostgresPostRepository::shared(db.clone()));
                Repositories {
                    users: Arc::new(PostgresUserRepository::shared(db.clone())),
                    posts: posts.clone(),
                    feed: posts,
                    follows: Arc::new(PostgresFollowRepository::shared(db.clone())),
                    likes: Arc::new(PostgresLikeRepository::shared(db.clone())),
                    comments: Arc::new(PostgresCommentRepository::shared(db)),
                    backend: "postgres",
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to connect to database. Using in-memory fallback."
                );
                Repositories::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory store");
        Repositories::in_memory()
    }
}

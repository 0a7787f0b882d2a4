//! Domain services - the operations exposed to the HTTP layer.
//!
//! Each service owns one concern and talks to the store only through ports.

mod accounts;
mod engagement;
mod feed;
mod follows;
mod posts;

pub use accounts::{AccountService, AuthSession, Registration};
pub use engagement::EngagementService;
pub use feed::FeedService;
pub use follows::FollowService;
pub use posts::PostService;

//! Domain entities - the core business objects.

mod comment;
mod follow;
mod page;
mod post;
mod user;

pub use comment::{AuthoredComment, Comment};
pub use follow::FollowCounts;
pub use page::{DEFAULT_PAGE_SIZE, MAX_OFFSET, MAX_PAGE_SIZE, Page};
pub use post::{
    AuthorPosts, AuthoredPost, FeedItem, MAX_CONTENT_LEN, NewPost, Post, PostState, PostUpdate,
    validate_content,
};
pub use user::{User, UserSummary};

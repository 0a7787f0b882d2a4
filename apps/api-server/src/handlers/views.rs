//! Domain -> wire conversions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pulse_core::domain::{
    AuthoredComment, AuthoredPost, Comment, FeedItem, Post, PostState, User, UserSummary,
};
use pulse_core::services::AuthSession;
use pulse_shared::dto::{
    AuthResponse, CommentResponse, FeedItemResponse, PostResponse, UserResponse,
    UserSummaryResponse,
};

pub fn user(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        full_name: user.full_name.clone(),
        created_at: user.created_at,
    }
}

pub fn summary(user: UserSummary) -> UserSummaryResponse {
    UserSummaryResponse {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
    }
}

pub fn session(session: AuthSession) -> AuthResponse {
    AuthResponse {
        user: user(&session.user),
        access_token: session.access_token,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in,
    }
}

fn state_name(state: PostState) -> String {
    match state {
        PostState::Pending => "pending",
        PostState::Published => "published",
        PostState::Deleted => "deleted",
    }
    .to_string()
}

/// Render a post with its author's display fields.
pub fn post(post: Post, author: UserSummary, now: DateTime<Utc>) -> PostResponse {
    PostResponse {
        state: state_name(post.state_at(now)),
        id: post.id,
        user_id: post.user_id,
        username: author.username,
        full_name: author.full_name,
        content: post.content,
        media_url: post.media_url,
        comments_enabled: post.comments_enabled,
        scheduled_at: post.scheduled_at,
        is_deleted: post.is_deleted,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub fn authored_post(authored: AuthoredPost, now: DateTime<Utc>) -> PostResponse {
    post(authored.post, authored.author, now)
}

pub fn authored_posts(posts: Vec<AuthoredPost>) -> Vec<PostResponse> {
    let now = Utc::now();
    posts.into_iter().map(|p| authored_post(p, now)).collect()
}

pub fn feed_item(item: FeedItem, now: DateTime<Utc>) -> FeedItemResponse {
    let author = UserSummary {
        id: item.post.user_id,
        username: item.username,
        full_name: item.full_name,
    };
    FeedItemResponse {
        post: post(item.post, author, now),
        like_count: item.like_count,
        comment_count: item.comment_count,
    }
}

pub fn comment(comment: Comment, author: UserSummary) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        username: author.username,
        full_name: author.full_name,
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

pub fn authored_comment(authored: AuthoredComment) -> CommentResponse {
    comment(authored.comment, authored.author)
}

/// `{"message": ...}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

//! Follow graph, user search and profiles.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use pulse_core::domain::{AuthorPosts, Page};
use pulse_shared::ApiResponse;
use pulse_shared::dto::{FollowResponse, FollowStatsResponse, ProfileResponse, UserSearchQuery};

use super::views;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Number of recent posts embedded in a profile.
const PROFILE_RECENT_POSTS: u64 = 10;

/// POST /api/users/follow/{id}
pub async fn follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let target = path.into_inner();
    if target != identity.id() {
        state.accounts.find_user(target).await?;
    }

    if !state.follows.follow(identity.id(), target).await? {
        return Err(AppError::Conflict("Already following this user".to_string()));
    }
    tracing::info!(follower = %identity.id(), followee = %target, "Follow created");

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        FollowResponse {
            user_id: target,
            following: true,
        },
        "Successfully followed user",
    )))
}

/// DELETE /api/users/unfollow/{id}
pub async fn unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let target = path.into_inner();
    if !state.follows.unfollow(identity.id(), target).await? {
        return Err(AppError::Conflict("You are not following this user".to_string()));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        FollowResponse {
            user_id: target,
            following: false,
        },
        "Successfully unfollowed user",
    )))
}

/// GET /api/users/follow/following
pub async fn following(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let users = state.follows.following(identity.id()).await?;
    let users: Vec<_> = users.into_iter().map(views::summary).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

/// GET /api/users/follow/followers
pub async fn followers(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let users = state.follows.followers(identity.id()).await?;
    let users: Vec<_> = users.into_iter().map(views::summary).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

/// GET /api/users/follow/stats
pub async fn stats(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let counts = state.follows.counts(identity.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FollowStatsResponse {
        following_count: counts.following_count,
        followers_count: counts.followers_count,
    })))
}

/// GET /api/users/search?query=
pub async fn search(
    state: web::Data<AppState>,
    _identity: Identity,
    query: web::Query<UserSearchQuery>,
) -> AppResult<HttpResponse> {
    let users = state.accounts.search_users(&query.query).await?;
    let users: Vec<_> = users.into_iter().map(views::summary).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(users)))
}

/// GET /api/users/{id}/profile - summary, follow counts and recent visible posts.
pub async fn profile(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let user = state.accounts.find_user(path.into_inner()).await?;
    let counts = state.follows.counts(user.id).await?;
    let recent = state
        .posts
        .posts_by_author(
            user.id,
            AuthorPosts::Visible,
            Page::at_offset(PROFILE_RECENT_POSTS, 0),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ProfileResponse {
        user: views::summary(user.summary()),
        following_count: counts.following_count,
        followers_count: counts.followers_count,
        recent_posts: views::authored_posts(recent),
    })))
}

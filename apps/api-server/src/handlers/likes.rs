//! Like handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use pulse_shared::ApiResponse;
use pulse_shared::dto::{LikeCountResponse, LikeResponse, LikedPostsResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/likes/post/{post_id}/like
pub async fn like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let like_count = state.engagement.like(identity.id(), post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeResponse {
        post_id,
        liked: true,
        like_count,
    })))
}

/// DELETE /api/likes/post/{post_id}/like
pub async fn unlike(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let like_count = state.engagement.unlike(identity.id(), post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeResponse {
        post_id,
        liked: false,
        like_count,
    })))
}

/// GET /api/likes/post/{post_id}
pub async fn count(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let like_count = state.engagement.like_count(post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeCountResponse {
        post_id,
        like_count,
    })))
}

/// GET /api/likes/post/{post_id}/liked
pub async fn has_liked(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let liked = state.engagement.has_liked(identity.id(), post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({
        "post_id": post_id,
        "liked": liked,
    }))))
}

/// GET /api/likes/user/me
pub async fn liked_posts(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let post_ids = state.engagement.liked_posts(identity.id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikedPostsResponse { post_ids })))
}

//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use pulse_shared::dto::{CommentRequest, PageQuery};
use pulse_shared::{ApiResponse, Paginated};

use super::{page_of, validated, views};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{post_id}/comments
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;
    let comment = state
        .engagement
        .create_comment(identity.id(), path.into_inner(), req.content)
        .await?;

    let author = identity.user.summary();
    Ok(HttpResponse::Created().json(ApiResponse::ok(views::comment(comment, author))))
}

/// GET /api/posts/{post_id}/comments?limit=&offset=
pub async fn list(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (page_no, page) = page_of(&query);
    let comments = state
        .engagement
        .comments_for_post(path.into_inner(), page)
        .await?;

    let items = comments.into_iter().map(views::authored_comment).collect();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(Paginated::new(items, page_no, page.limit))))
}

/// PUT /api/comments/{comment_id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;
    let comment = state
        .engagement
        .update_comment(path.into_inner(), identity.id(), &req.content)
        .await?;

    let author = identity.user.summary();
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views::comment(comment, author))))
}

/// DELETE /api/comments/{comment_id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .engagement
        .delete_comment(path.into_inner(), identity.id())
        .await?;

    Ok(HttpResponse::Ok().json(views::Message {
        message: "Comment deleted successfully",
    }))
}

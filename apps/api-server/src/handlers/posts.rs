//! Post handlers: authoring, reading, feed and search.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use pulse_core::DomainError;
use pulse_core::domain::{AuthorPosts, NewPost, PostState, PostUpdate};
use pulse_shared::dto::{CreatePostRequest, PageQuery, PostSearchQuery, UpdatePostRequest};
use pulse_shared::{ApiResponse, Paginated};

use super::{page_of, validated, views};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;
    let draft = NewPost {
        content: req.content,
        media_url: req.media_url,
        comments_enabled: req.comments_enabled,
        scheduled_at: req.scheduled_at,
    };

    let post = state.posts.create_post(identity.id(), draft).await?;
    tracing::info!(post_id = %post.id, pending = !post.is_published, "Post created");

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        views::post(post, identity.user.summary(), Utc::now()),
        "Post created successfully",
    )))
}

/// GET /api/posts/my - the caller's posts, pending ones included.
pub async fn my_posts(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (page_no, page) = page_of(&query);
    let posts = state
        .posts
        .posts_by_author(identity.id(), AuthorPosts::Own, page)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Paginated::new(
        views::authored_posts(posts),
        page_no,
        page.limit,
    ))))
}

/// GET /api/posts/user/{user_id}
pub async fn user_posts(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let author_id = path.into_inner();
    let scope = if viewer.id() == Some(author_id) {
        AuthorPosts::Own
    } else {
        AuthorPosts::Visible
    };

    let (page_no, page) = page_of(&query);
    let posts = state.posts.posts_by_author(author_id, scope, page).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Paginated::new(
        views::authored_posts(posts),
        page_no,
        page.limit,
    ))))
}

/// GET /api/posts/feed - visible posts by accounts the caller follows.
pub async fn feed(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (page_no, page) = page_of(&query);
    let items = state.feed.feed(identity.id(), page).await?;

    let now = Utc::now();
    let items = items
        .into_iter()
        .map(|item| views::feed_item(item, now))
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Paginated::new(items, page_no, page.limit))))
}

/// GET /api/posts/search?q=
pub async fn search(
    state: web::Data<AppState>,
    search: web::Query<PostSearchQuery>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (page_no, page) = page_of(&query);
    let posts = state.posts.search_posts(&search.q, page).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(Paginated::new(
        views::authored_posts(posts),
        page_no,
        page.limit,
    ))))
}

/// GET /api/posts/{post_id}
///
/// Pending posts resolve only for their author. Deleted posts resolve with
/// `state: "deleted"`.
pub async fn get(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let authored = state.posts.get_post(post_id).await?;

    let now = Utc::now();
    let post = &authored.post;
    if post.state_at(now) == PostState::Pending && viewer.id() != Some(post.user_id) {
        return Err(DomainError::not_found("Post", post_id).into());
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(views::authored_post(authored, now))))
}

/// PATCH /api/posts/{post_id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;
    let media_url = match (req.remove_media, req.media_url) {
        (true, Some(_)) => {
            return Err(AppError::BadRequest(
                "media_url and remove_media cannot be combined".to_string(),
            ));
        }
        (true, None) => Some(None),
        (false, media_url) => media_url.map(Some),
    };
    let update = PostUpdate {
        content: req.content,
        media_url,
        comments_enabled: req.comments_enabled,
    };

    let post = state
        .posts
        .update_post(path.into_inner(), identity.id(), update)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        views::post(post, identity.user.summary(), Utc::now()),
        "Post updated successfully",
    )))
}

/// DELETE /api/posts/{post_id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    state.posts.delete_post(post_id, identity.id()).await?;
    tracing::info!(post_id = %post_id, "Post deleted");

    Ok(HttpResponse::Ok().json(views::Message {
        message: "Post deleted successfully",
    }))
}

//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod likes;
mod posts;
mod users;
mod views;

use std::sync::Arc;

use actix_web::{HttpRequest, error, web};
use validator::Validate;

use pulse_core::domain::{DEFAULT_PAGE_SIZE, Page};
use pulse_core::ports::RateLimiter;
use pulse_shared::dto::PageQuery;

use crate::middleware::error::{AppError, AppResult};
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Unwrap a JSON body and run its field validators.
pub(crate) fn validated<T: Validate>(body: web::Json<T>) -> AppResult<T> {
    let body = body.into_inner();
    body.validate()?;
    Ok(body)
}

/// Resolve `?page=&limit=&offset=`. An explicit offset wins over the page
/// number; the reported page number is derived from the effective offset.
pub(crate) fn page_of(query: &PageQuery) -> (u64, Page) {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = match query.offset {
        Some(offset) => Page::at_offset(limit, offset),
        None => Page::numbered(query.page.unwrap_or(1), limit),
    };
    (page.offset / page.limit + 1, page)
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn path_error(_err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::NotFound("Resource not found".to_string()).into()
}

/// Extractor configuration so malformed input yields problem details.
fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error));
}

fn auth_scope() -> actix_web::Scope {
    web::scope("/api/auth")
        .route("/register", web::post().to(auth::register))
        .route("/login", web::post().to(auth::login))
        .route("/me", web::get().to(auth::me))
}

/// Configure all application routes. When a limiter is supplied, `/api/auth`
/// is throttled per client.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Option<Arc<dyn RateLimiter>>) {
    configure_extractors(cfg);

    match limiter {
        Some(limiter) => cfg.service(auth_scope().wrap(RateLimitMiddleware::new(limiter))),
        None => cfg.service(auth_scope()),
    };

    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/posts")
                    .route("", web::post().to(posts::create))
                    .route("/my", web::get().to(posts::my_posts))
                    .route("/feed", web::get().to(posts::feed))
                    .route("/search", web::get().to(posts::search))
                    .route("/user/{user_id}", web::get().to(posts::user_posts))
                    .route("/{post_id}/comments", web::post().to(comments::create))
                    .route("/{post_id}/comments", web::get().to(comments::list))
                    .route("/{post_id}", web::get().to(posts::get))
                    .route("/{post_id}", web::patch().to(posts::update))
                    .route("/{post_id}", web::delete().to(posts::delete)),
            )
            .service(
                web::scope("/comments")
                    .route("/{comment_id}", web::put().to(comments::update))
                    .route("/{comment_id}", web::delete().to(comments::delete)),
            )
            .service(
                web::scope("/likes")
                    .route("/user/me", web::get().to(likes::liked_posts))
                    .route("/post/{post_id}/like", web::post().to(likes::like))
                    .route("/post/{post_id}/like", web::delete().to(likes::unlike))
                    .route("/post/{post_id}/liked", web::get().to(likes::has_liked))
                    .route("/post/{post_id}", web::get().to(likes::count)),
            )
            .service(
                web::scope("/users")
                    .route("/follow/following", web::get().to(users::following))
                    .route("/follow/followers", web::get().to(users::followers))
                    .route("/follow/stats", web::get().to(users::stats))
                    .route("/follow/{id}", web::post().to(users::follow))
                    .route("/unfollow/{id}", web::delete().to(users::unfollow))
                    .route("/search", web::get().to(users::search))
                    .route("/{id}/profile", web::get().to(users::profile)),
            ),
    );
}

//! Authentication handlers.

use actix_web::{HttpResponse, web};

use pulse_core::services::Registration;
use pulse_shared::ApiResponse;
use pulse_shared::dto::{LoginRequest, RegisterRequest};

use super::{validated, views};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;

    let session = state
        .accounts
        .register(Registration {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            password: req.password,
            full_name: req.full_name.trim().to_string(),
        })
        .await?;

    tracing::info!(user_id = %session.user.id, "User registered");
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        views::session(session),
        "User registered successfully",
    )))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = validated(body)?;

    let session = state
        .accounts
        .login(req.username.trim(), &req.password)
        .await?;

    tracing::debug!(user_id = %session.user.id, "User logged in");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views::session(session))))
}

/// GET /api/auth/me - Protected route
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views::user(&identity.user))))
}

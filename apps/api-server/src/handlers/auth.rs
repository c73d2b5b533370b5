//! Authentication handlers.

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use quill_core::domain::User;
use quill_core::domain::validation::{self, Validator};
use quill_core::ports::{BaseRepository, PasswordService, TokenService, UserRepository};
use quill_shared::ApiResponse;
use quill_shared::dto::{LoginRequest, RegisterUserRequest, SessionResponse, UserResponse};

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub(crate) fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        created_at: user.created_at,
    }
}

fn session(tokens: &dyn TokenService, user: &User) -> AppResult<SessionResponse> {
    let access_token = tokens.generate_token(user.id, &user.email, vec!["author".to_string()])?;

    Ok(SessionResponse {
        user: user_response(user),
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut v = Validator::new();
    validation::user_name(&mut v, &req.name);
    v.email("email", &req.email);
    v.password("password", &req.password);
    v.finish()?;

    let email = req.email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password_service.hash(&req.password)?;
    let user = state
        .users
        .insert(User::new(req.name, email, password_hash))
        .await?;
    tracing::info!(user_id = %user.id, "User registered");

    let session = session(token_service.get_ref().as_ref(), &user)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(session, "User registered")))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut v = Validator::new();
    v.email("email", &req.email);
    v.password("password", &req.password);
    v.finish()?;

    let user = state
        .users
        .find_by_email(&req.email.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound("No account is registered with that email".to_string()))?;

    if !password_service.verify(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let session = session(token_service.get_ref().as_ref(), &user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(session, "Logged in")))
}

/// GET /api/auth/me
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    // A valid token for a user that no longer exists is as good as none.
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(&user))))
}

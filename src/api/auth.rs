//! Authentication API endpoints
//!
//! Public:
//! - POST /auth/register
//! - GET /auth/verify/{userId}/{token}
//! - POST /auth/resend-verification
//! - POST /auth/login
//! - POST /auth/login-link, POST /auth/login-link/verify
//! - POST /auth/refresh-token
//! - DELETE /auth/logout
//! - POST /auth/forgot-password, POST /auth/reset-password
//!
//! Signed in: GET /auth/me, PUT /auth/password
//!
//! Admin only: GET /auth/admin/users, PUT /auth/admin/users/{id}/role

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{MessageResponse, PageQuery};
use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::models::{
    ChangePasswordInput, LoginInput, PagedResult, RegisterInput, ResetPasswordInput, User,
    UserRole,
};
use crate::services::TokenPair;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

/// User plus a fresh token pair
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify/{user_id}/{token}", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/login", post(login))
        .route("/login-link", post(request_login_link))
        .route("/login-link/verify", post(login_with_link))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", delete(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Build routes for any signed-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/password", put(change_password))
}

/// Build user administration routes (admin only)
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(update_role))
}

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /auth/verify/{userId}/{token}
async fn verify_email(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(String, String)>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.verify_email(&user_id, &token).await?;
    Ok(Json(user))
}

/// POST /auth/resend-verification
async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.resend_verification(&body.email).await?;
    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, tokens) = state.user_service.login(body).await?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// POST /auth/login-link
async fn request_login_link(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.request_login_link(&body.email).await?;
    Ok(Json(MessageResponse::new("Login link sent")))
}

/// POST /auth/login-link/verify
async fn login_with_link(
    State(state): State<AppState>,
    Json(body): Json<LinkRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (user, tokens) = state
        .user_service
        .login_with_link(&body.user_id, &body.token)
        .await?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// POST /auth/refresh-token
async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = state.user_service.refresh(&body.refresh_token).await?;
    Ok(Json(tokens))
}

/// DELETE /auth/logout
async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    state.user_service.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.forgot_password(&body.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// POST /auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.reset_password(body).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET /auth/me
async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /auth/password
async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.user_service.change_password(&user.id, body).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET /auth/admin/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let users = state.user_service.list_users(&query.params()).await?;
    Ok(Json(users))
}

/// PUT /auth/admin/users/{id}/role
async fn update_role(
    State(state): State<AppState>,
    CurrentUser(acting): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .user_service
        .update_role(&acting.id, &id, body.role)
        .await?;
    Ok(Json(user))
}

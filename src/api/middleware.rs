//! API middleware
//!
//! Contains the shared application state, the JSON error type and the
//! middleware for:
//! - Authentication (bearer access token validation)
//! - Authorization (role allow-lists, checked against the stored user)

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::config::{Config, UploadConfig};
use crate::db::repositories::{
    ItemTable, SqlxAgricultureRepository, SqlxContactRepository, SqlxContentItemRepository,
    SqlxCooperativeRepository, SqlxFeedbackRepository, SqlxNewsRepository,
    SqlxOneTimeTokenRepository, SqlxPartnerRepository, SqlxPersonnelRepository,
    SqlxTagRepository, SqlxUserRepository, SqlxYearRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{User, UserRole};
use crate::services::{
    AccessClaims, AgricultureService, ContactService, CooperativeService, FeedbackService,
    Mailer, MediaStore, NewsService, PartnerService, PersonnelService, RecruitmentService,
    ServiceError, TagService, TokenService, UserService, YearService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub token_service: Arc<TokenService>,
    pub user_service: Arc<UserService>,
    pub news_service: Arc<NewsService>,
    pub agriculture_service: Arc<AgricultureService>,
    pub tag_service: Arc<TagService>,
    pub personnel_service: Arc<PersonnelService>,
    pub partner_service: Arc<PartnerService>,
    pub cooperative_service: Arc<CooperativeService>,
    pub feedback_service: Arc<FeedbackService>,
    pub contact_service: Arc<ContactService>,
    pub year_service: Arc<YearService>,
    pub recruitment_service: Arc<RecruitmentService>,
    pub upload_config: Arc<UploadConfig>,
}

impl AppState {
    /// Wire repositories and services on top of an open pool.
    ///
    /// `cache` holds detail payloads, `sessions` the live refresh tokens.
    pub fn new(
        pool: DynDatabasePool,
        cache: Arc<dyn CacheLayer>,
        sessions: Arc<dyn CacheLayer>,
        mailer: Arc<dyn Mailer>,
        config: &Config,
    ) -> Self {
        let media = Arc::new(MediaStore::new(config.upload.clone()));
        let users = SqlxUserRepository::boxed(pool.clone());

        let token_service = Arc::new(TokenService::new(
            users.clone(),
            sessions,
            config.auth.clone(),
        ));
        let user_service = Arc::new(UserService::new(
            users,
            SqlxOneTimeTokenRepository::boxed(pool.clone()),
            token_service.clone(),
            mailer.clone(),
            config.server.frontend_url.clone(),
        ));
        let news_service = Arc::new(NewsService::new(
            SqlxNewsRepository::boxed(pool.clone()),
            SqlxContentItemRepository::boxed(pool.clone(), ItemTable::News),
            SqlxTagRepository::boxed(pool.clone()),
            cache.clone(),
            media.clone(),
        ));
        let agriculture_service = Arc::new(AgricultureService::new(
            SqlxAgricultureRepository::boxed(pool.clone()),
            SqlxContentItemRepository::boxed(pool.clone(), ItemTable::Agriculture),
            cache.clone(),
            media.clone(),
        ));

        Self {
            token_service,
            user_service,
            news_service,
            agriculture_service,
            tag_service: Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone()), cache)),
            personnel_service: Arc::new(PersonnelService::new(
                SqlxPersonnelRepository::boxed(pool.clone()),
                media.clone(),
            )),
            partner_service: Arc::new(PartnerService::new(
                SqlxPartnerRepository::boxed(pool.clone()),
                media.clone(),
            )),
            cooperative_service: Arc::new(CooperativeService::new(
                SqlxCooperativeRepository::boxed(pool.clone()),
                media.clone(),
            )),
            feedback_service: Arc::new(FeedbackService::new(
                SqlxFeedbackRepository::boxed(pool.clone()),
                media.clone(),
            )),
            contact_service: Arc::new(ContactService::new(SqlxContactRepository::boxed(pool.clone()))),
            year_service: Arc::new(YearService::new(SqlxYearRepository::boxed(pool.clone()))),
            recruitment_service: Arc::new(RecruitmentService::new(
                mailer,
                media,
                config.mail.hr_inbox.clone(),
            )),
            upload_config: Arc::new(config.upload.clone()),
            pool,
        }
    }
}

/// User re-fetched by the role check, available to handlers behind it
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
///
/// Rendered as `{"error": {"status": 404, "message": "..."}}` with the same
/// HTTP status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                status: status.as_u16(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg),
            ServiceError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            ServiceError::Unauthorized(msg) => Self::new(StatusCode::UNAUTHORIZED, msg),
            ServiceError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            ServiceError::NotAcceptable(msg) => Self::new(StatusCode::NOT_ACCEPTABLE, msg),
            ServiceError::BadRequest(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            ServiceError::Internal(e) => {
                tracing::error!(error = ?e, "Request failed");
                Self::internal_error()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
///
/// Verifies the access token and stores its [`AccessClaims`] in the request
/// extensions.
pub async fn verify_access_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

    let claims = state
        .token_service
        .verify_access_token(token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired access token"))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Re-fetch the token's user and check it against `roles`.
///
/// Must run after [`verify_access_token`].
pub async fn authorize_roles(
    state: &AppState,
    mut request: Request,
    next: Next,
    roles: &[UserRole],
) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<AccessClaims>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = match state.user_service.get_user(&claims.user_id).await {
        Ok(user) => user,
        Err(ServiceError::NotFound(_)) => {
            return Err(ApiError::unauthorized("User no longer exists"))
        }
        Err(e) => return Err(e.into()),
    };

    if !roles.contains(&user.role) {
        tracing::debug!(user_id = %user.id, role = %user.role, "Role not allowed");
        return Err(ApiError::forbidden("Insufficient privileges"));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Any signed-in user
pub async fn require_user(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_roles(
        &state,
        request,
        next,
        &[UserRole::Admin, UserRole::Editor, UserRole::User],
    )
    .await
}

/// Content management: admins and editors
pub async fn require_staff(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_roles(&state, request, next, &[UserRole::Admin, UserRole::Editor]).await
}

/// User administration
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_roles(&state, request, next, &[UserRole::Admin]).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let request = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(extract_bearer_token(&request), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_token_rejects_other_schemes() {
        assert!(extract_bearer_token(&request_with_auth("Basic dXNlcjpwYXNz")).is_none());
        assert!(extract_bearer_token(&request_with_auth("Bearer ")).is_none());

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_bearer_token(&request).is_none());
    }

    #[test]
    fn test_service_error_status_mapping() {
        let cases = [
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("x"), StatusCode::CONFLICT),
            (ServiceError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("x".to_string()), StatusCode::FORBIDDEN),
            (ServiceError::NotAcceptable("x".to_string()), StatusCode::NOT_ACCEPTABLE),
            (ServiceError::bad_request("x"), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.error.message, "x");
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let api: ApiError = ServiceError::Internal(anyhow::anyhow!("db password leaked")).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error.message, "Internal server error");
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_value(ApiError::not_found("News not found")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": {"status": 404, "message": "News not found"}})
        );
    }
}

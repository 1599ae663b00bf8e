//! API layer - HTTP handlers and routing
//!
//! Every content type has a public router for reads and an admin router
//! mounted under `<prefix>/admin`. Admin routers sit behind
//! [`middleware::verify_access_token`] plus a role check; uploaded media is
//! served from `/uploads`.

pub mod agriculture;
pub mod auth;
pub mod common;
pub mod contact;
pub mod cooperative;
pub mod email;
pub mod feedback;
pub mod health;
pub mod middleware;
pub mod multipart;
pub mod news;
pub mod partner;
pub mod personnel;
pub mod year;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::services::media::MEDIA_PREFIX;

pub use middleware::{ApiError, AppState, CurrentUser};

/// Room for the multipart framing and text fields around the files
const FORM_OVERHEAD: usize = 1024 * 1024;

/// Build the route tree without global layers
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Content management (admin or editor)
    let staff_routes = Router::new()
        .nest("/news/admin", news::admin_router())
        .nest("/agriculture/admin", agriculture::admin_router())
        .nest("/personnel/admin", personnel::admin_router())
        .nest("/partner/admin", partner::admin_router())
        .nest("/cooperative/admin", cooperative::admin_router())
        .nest("/feedback/admin", feedback::admin_router())
        .nest("/year/admin", year::admin_router())
        .nest("/contact/admin", contact::admin_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_staff,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::verify_access_token,
        ));

    // User administration (admin only)
    let admin_routes = Router::new()
        .nest("/auth/admin", auth::admin_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::verify_access_token,
        ));

    // Any signed-in user
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_user,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::verify_access_token,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/news", news::public_router())
        .nest("/agriculture", agriculture::public_router())
        .nest("/personnel", personnel::public_router())
        .nest("/partner", partner::public_router())
        .nest("/cooperative", cooperative::public_router())
        .nest("/feedback", feedback::public_router())
        .nest("/year", year::public_router())
        .nest("/contact", contact::public_router())
        .nest("/email", email::router())
        .nest("/health", health::router())
        .merge(staff_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// CORS for the configured frontend origin; `*` (or an unusable value)
/// allows any origin.
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors_origin == "*" {
        return cors.allow_origin(Any);
    }
    match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin = cors_origin, "Invalid CORS origin, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    // Two posters plus the form fields must fit in one request
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX / 4)
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD);
    let uploads = ServeDir::new(&state.upload_config.path);

    Router::new()
        .merge(build_api_router(state.clone()))
        .nest_service(&format!("/{}", MEDIA_PREFIX), uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

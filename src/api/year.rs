//! Timeline year API endpoints (JSON bodies)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{UpdateYearInput, Year, YearInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_years))
        .route("/{id}", get(get_year))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_year))
        .route("/{id}", put(update_year).delete(delete_year))
}

async fn list_years(State(state): State<AppState>) -> Result<Json<Vec<Year>>, ApiError> {
    Ok(Json(state.year_service.list().await?))
}

async fn get_year(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Year>, ApiError> {
    Ok(Json(state.year_service.get(&id).await?))
}

async fn create_year(
    State(state): State<AppState>,
    Json(body): Json<YearInput>,
) -> Result<(StatusCode, Json<Year>), ApiError> {
    let year = state.year_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(year)))
}

async fn update_year(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateYearInput>,
) -> Result<Json<Year>, ApiError> {
    Ok(Json(state.year_service.update(&id, body).await?))
}

async fn delete_year(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.year_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Personnel API endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{Personnel, PersonnelInput, UpdatePersonnelInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_personnel))
        .route("/{id}", get(get_personnel))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_personnel))
        .route("/{id}", put(update_personnel).delete(delete_personnel))
}

async fn list_personnel(State(state): State<AppState>) -> Result<Json<Vec<Personnel>>, ApiError> {
    Ok(Json(state.personnel_service.list().await?))
}

async fn get_personnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Personnel>, ApiError> {
    Ok(Json(state.personnel_service.get(&id).await?))
}

async fn create_personnel(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Personnel>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = PersonnelInput {
        vi_name: form.text("viName"),
        jp_name: form.text("jpName"),
        vi_position: form.text("viPosition"),
        jp_position: form.text("jpPosition"),
        sort_order: form.optional_i64("sortOrder")?.unwrap_or(0),
    };
    let personnel = state
        .personnel_service
        .create(input, form.take_file("image"))
        .await?;
    Ok((StatusCode::CREATED, Json(personnel)))
}

async fn update_personnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Personnel>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdatePersonnelInput {
        vi_name: form.optional("viName"),
        jp_name: form.optional("jpName"),
        vi_position: form.optional("viPosition"),
        jp_position: form.optional("jpPosition"),
        sort_order: form.optional_i64("sortOrder")?,
    };
    let personnel = state
        .personnel_service
        .update(&id, input, form.take_file("image"))
        .await?;
    Ok(Json(personnel))
}

async fn delete_personnel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.personnel_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

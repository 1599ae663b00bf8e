//! Cooperative API endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{Cooperative, CooperativeInput, PagedResult, UpdateCooperativeInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cooperatives))
        .route("/{id}", get(get_cooperative))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cooperative))
        .route("/{id}", put(update_cooperative).delete(delete_cooperative))
}

async fn list_cooperatives(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Cooperative>>, ApiError> {
    Ok(Json(state.cooperative_service.list(&query.params()).await?))
}

async fn get_cooperative(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Cooperative>, ApiError> {
    Ok(Json(state.cooperative_service.get(&id).await?))
}

async fn create_cooperative(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Cooperative>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = CooperativeInput {
        vi_name: form.text("viName"),
        jp_name: form.text("jpName"),
        vi_address: form.text("viAddress"),
        jp_address: form.text("jpAddress"),
        vi_description: form.text("viDescription"),
        jp_description: form.text("jpDescription"),
    };
    let cooperative = state
        .cooperative_service
        .create(input, form.take_file("image"))
        .await?;
    Ok((StatusCode::CREATED, Json(cooperative)))
}

async fn update_cooperative(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Cooperative>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdateCooperativeInput {
        vi_name: form.optional("viName"),
        jp_name: form.optional("jpName"),
        vi_address: form.optional("viAddress"),
        jp_address: form.optional("jpAddress"),
        vi_description: form.optional("viDescription"),
        jp_description: form.optional("jpDescription"),
    };
    let cooperative = state
        .cooperative_service
        .update(&id, input, form.take_file("image"))
        .await?;
    Ok(Json(cooperative))
}

async fn delete_cooperative(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.cooperative_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

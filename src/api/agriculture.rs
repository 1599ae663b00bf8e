//! Agriculture API endpoints
//!
//! Same shape as news without tags: public list, get and cached full
//! detail; admin writes for entries and their items.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::PageQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{
    Agriculture, AgricultureInput, ContentItem, ItemInput, PagedResult, UpdateAgricultureInput,
    UpdateItemInput,
};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agriculture))
        .route("/detail-full/{id}", get(detail_full))
        .route("/{id}", get(get_agriculture))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_agriculture))
        .route("/{id}", put(update_agriculture).delete(delete_agriculture))
        .route("/{id}/items", post(add_item))
        .route("/items/{item_id}", put(update_item).delete(delete_item))
}

async fn list_agriculture(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Agriculture>>, ApiError> {
    Ok(Json(state.agriculture_service.list(&query.params()).await?))
}

async fn get_agriculture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agriculture>, ApiError> {
    Ok(Json(state.agriculture_service.get(&id).await?))
}

async fn detail_full(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.agriculture_service.detail_full(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload))
}

async fn create_agriculture(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Agriculture>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = AgricultureInput {
        vi_title: form.text("viTitle"),
        jp_title: form.text("jpTitle"),
        vi_description: form.text("viDescription"),
        jp_description: form.text("jpDescription"),
    };
    let entry = state
        .agriculture_service
        .create(input, form.take_file("image"))
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_agriculture(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Agriculture>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdateAgricultureInput {
        vi_title: form.optional("viTitle"),
        jp_title: form.optional("jpTitle"),
        vi_description: form.optional("viDescription"),
        jp_description: form.optional("jpDescription"),
    };
    let entry = state
        .agriculture_service
        .update(&id, input, form.take_file("image"))
        .await?;
    Ok(Json(entry))
}

async fn delete_agriculture(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.agriculture_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ContentItem>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = ItemInput {
        vi_content: form.text("viContent"),
        jp_content: form.text("jpContent"),
    };
    let item = state
        .agriculture_service
        .add_item(&id, input, form.take_file("image"))
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ContentItem>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdateItemInput {
        vi_content: form.optional("viContent"),
        jp_content: form.optional("jpContent"),
    };
    let item = state
        .agriculture_service
        .update_item(&item_id, input, form.take_file("image"))
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.agriculture_service.delete_item(&item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

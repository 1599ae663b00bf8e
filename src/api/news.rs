//! News API endpoints
//!
//! Public reads, the cached full detail document, tag reads, and the admin
//! writes for news entries, their items and tags. Writes with files are
//! multipart forms; tag writes are JSON.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_limit, default_page};
use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{
    ContentItem, ItemInput, ListParams, News, NewsInput, PagedResult, Tag, TagInput,
    UpdateItemInput, UpdateNewsInput,
};
use crate::services::NewsPosters;

/// `GET /news` query
#[derive(Debug, Deserialize)]
pub struct ListNewsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Only entries carrying this tag id
    pub tag: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news))
        .route("/detail-full/{id}", get(detail_full))
        .route("/tags", get(list_tags))
        .route("/tags/{id}", get(get_tag))
        .route("/{id}", get(get_news))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_news))
        .route("/{id}", put(update_news).delete(delete_news))
        .route("/{id}/items", post(add_item))
        .route("/items/{item_id}", put(update_item).delete(delete_item))
        .route("/tags", post(create_tag))
        .route("/tags/{id}", put(update_tag).delete(delete_tag))
}

async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<ListNewsQuery>,
) -> Result<Json<PagedResult<News>>, ApiError> {
    let params = ListParams::new(query.page, query.limit);
    let tag = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    Ok(Json(state.news_service.list(&params, tag).await?))
}

async fn get_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<News>, ApiError> {
    Ok(Json(state.news_service.get(&id).await?))
}

/// GET /news/detail-full/{id}
///
/// The cached document is returned byte for byte.
async fn detail_full(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.news_service.detail_full(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], payload))
}

async fn create_news(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<News>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = NewsInput {
        vi_title: form.text("viTitle"),
        jp_title: form.text("jpTitle"),
        vi_description: form.text("viDescription"),
        jp_description: form.text("jpDescription"),
        tags: form.list("tags").unwrap_or_default(),
    };
    let posters = NewsPosters {
        vi_poster: form.take_file("viPoster"),
        jp_poster: form.take_file("jpPoster"),
    };

    let news = state.news_service.create(input, posters).await?;
    Ok((StatusCode::CREATED, Json(news)))
}

async fn update_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<News>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdateNewsInput {
        vi_title: form.optional("viTitle"),
        jp_title: form.optional("jpTitle"),
        vi_description: form.optional("viDescription"),
        jp_description: form.optional("jpDescription"),
        tags: form.list("tags"),
    };
    let posters = NewsPosters {
        vi_poster: form.take_file("viPoster"),
        jp_poster: form.take_file("jpPoster"),
    };

    Ok(Json(state.news_service.update(&id, input, posters).await?))
}

async fn delete_news(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.news_service.delete(&id).await?;
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
        .news_service
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
        .news_service
        .update_item(&item_id, input, form.take_file("image"))
        .await?;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.news_service.delete_item(&item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.get(&id).await?))
}

async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<TagInput>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let tag = state.tag_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TagInput>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tag_service.update(&id, body).await?))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

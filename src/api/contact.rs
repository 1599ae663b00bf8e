//! Contact form API endpoints
//!
//! - POST /contact - public submission
//! - GET /contact/admin?page=&limit=&handled= - list
//! - GET /contact/admin/{id}, PUT /contact/admin/{id}/handled, DELETE /contact/admin/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_limit, default_page};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Contact, ContactInput, ListParams, PagedResult};

#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub handled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HandledRequest {
    pub handled: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(submit_contact))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts))
        .route("/{id}", get(get_contact).delete(delete_contact))
        .route("/{id}/handled", put(set_handled))
}

async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactInput>,
) -> Result<(StatusCode, Json<Contact>), ApiError> {
    let contact = state.contact_service.submit(body).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListContactsQuery>,
) -> Result<Json<PagedResult<Contact>>, ApiError> {
    let params = ListParams::new(query.page, query.limit);
    Ok(Json(state.contact_service.list(&params, query.handled).await?))
}

async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.contact_service.get(&id).await?))
}

async fn set_handled(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<HandledRequest>,
) -> Result<Json<Contact>, ApiError> {
    Ok(Json(state.contact_service.set_handled(&id, body.handled).await?))
}

async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.contact_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Partner API endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{Partner, PartnerInput, UpdatePartnerInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_partners))
        .route("/{id}", get(get_partner))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_partner))
        .route("/{id}", put(update_partner).delete(delete_partner))
}

async fn list_partners(State(state): State<AppState>) -> Result<Json<Vec<Partner>>, ApiError> {
    Ok(Json(state.partner_service.list().await?))
}

async fn get_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Partner>, ApiError> {
    Ok(Json(state.partner_service.get(&id).await?))
}

async fn create_partner(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Partner>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = PartnerInput {
        name: form.text("name"),
        website: form.optional("website"),
    };
    let partner = state
        .partner_service
        .create(input, form.take_file("logo"))
        .await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

async fn update_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Partner>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdatePartnerInput {
        name: form.optional("name"),
        website: form.optional("website"),
    };
    let partner = state
        .partner_service
        .update(&id, input, form.take_file("logo"))
        .await?;
    Ok(Json(partner))
}

async fn delete_partner(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.partner_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

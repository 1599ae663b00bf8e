//! Customer feedback API endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::{Feedback, FeedbackInput, UpdateFeedbackInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_feedback))
        .route("/{id}", get(get_feedback))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_feedback))
        .route("/{id}", put(update_feedback).delete(delete_feedback))
}

async fn list_feedback(State(state): State<AppState>) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.feedback_service.list().await?))
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Feedback>, ApiError> {
    Ok(Json(state.feedback_service.get(&id).await?))
}

async fn create_feedback(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = FeedbackInput {
        name: form.text("name"),
        vi_position: form.text("viPosition"),
        jp_position: form.text("jpPosition"),
        vi_content: form.text("viContent"),
        jp_content: form.text("jpContent"),
    };
    let feedback = state
        .feedback_service
        .create(input, form.take_file("avatar"))
        .await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn update_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Feedback>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = UpdateFeedbackInput {
        name: form.optional("name"),
        vi_position: form.optional("viPosition"),
        jp_position: form.optional("jpPosition"),
        vi_content: form.optional("viContent"),
        jp_content: form.optional("jpContent"),
    };
    let feedback = state
        .feedback_service
        .update(&id, input, form.take_file("avatar"))
        .await?;
    Ok(Json(feedback))
}

async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.feedback_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Outgoing email endpoints
//!
//! - POST /email/recruitment - job application form with an optional CV

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};

use crate::api::common::MessageResponse;
use crate::api::middleware::{ApiError, AppState};
use crate::api::multipart::FormData;
use crate::models::RecruitmentInput;

pub fn router() -> Router<AppState> {
    Router::new().route("/recruitment", post(send_recruitment))
}

async fn send_recruitment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut form = FormData::read(multipart).await?;
    let input = RecruitmentInput {
        name: form.text("name"),
        email: form.text("email"),
        phone: form.text("phone"),
        position: form.text("position"),
        message: form.optional("message"),
    };
    let cv = form.take_file("cv").or_else(|| form.take_file("file"));

    state.recruitment_service.apply(input, cv).await?;
    Ok(Json(MessageResponse::new("Application sent")))
}

//! Customer feedback (testimonial) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub name: String,
    pub vi_position: String,
    pub jp_position: String,
    pub vi_content: String,
    pub jp_content: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    pub name: String,
    pub vi_position: String,
    pub jp_position: String,
    pub vi_content: String,
    pub jp_content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackInput {
    pub name: Option<String>,
    pub vi_position: Option<String>,
    pub jp_position: Option<String>,
    pub vi_content: Option<String>,
    pub jp_content: Option<String>,
}

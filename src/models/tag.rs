//! News tag model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bilingual tag attached to news entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub vi_name: String,
    pub jp_name: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(vi_name: String, jp_name: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vi_name,
            jp_name,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    pub vi_name: String,
    pub jp_name: String,
}

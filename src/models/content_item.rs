//! Child content blocks of news and agriculture entries
//!
//! Both parents own an ordered list of items with the same shape; the
//! parent's table decides which kind an item is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bilingual block of body content, optionally illustrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub parent_id: String,
    /// Order within the parent, assigned on append and never reused
    pub position: i64,
    pub vi_content: String,
    pub jp_content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type NewsItem = ContentItem;
pub type AgricultureItem = ContentItem;

impl ContentItem {
    pub fn new(parent_id: String, vi_content: String, jp_content: String, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id,
            position: 0,
            vi_content,
            jp_content,
            image,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub vi_content: String,
    pub jp_content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemInput {
    pub vi_content: Option<String>,
    pub jp_content: Option<String>,
}

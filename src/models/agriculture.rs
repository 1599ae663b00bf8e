//! Agriculture model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentItem;

/// A bilingual agriculture showcase entry.
///
/// Like [`super::News`], `items` carries ids in list responses and full items
/// in [`AgricultureDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agriculture<I = String> {
    pub id: String,
    pub vi_title: String,
    pub jp_title: String,
    pub vi_description: String,
    pub jp_description: String,
    pub image: String,
    pub items: Vec<I>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub type AgricultureDetail = Agriculture<ContentItem>;

impl<I> Agriculture<I> {
    pub fn with_items<J>(self, items: Vec<J>) -> Agriculture<J> {
        Agriculture {
            id: self.id,
            vi_title: self.vi_title,
            jp_title: self.jp_title,
            vi_description: self.vi_description,
            jp_description: self.jp_description,
            image: self.image,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgricultureInput {
    pub vi_title: String,
    pub jp_title: String,
    pub vi_description: String,
    pub jp_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgricultureInput {
    pub vi_title: Option<String>,
    pub jp_title: Option<String>,
    pub vi_description: Option<String>,
    pub jp_description: Option<String>,
}

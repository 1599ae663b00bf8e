//! Personnel (team member) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Personnel {
    pub id: String,
    pub vi_name: String,
    pub jp_name: String,
    pub vi_position: String,
    pub jp_position: String,
    pub image: String,
    /// Display order, ascending
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelInput {
    pub vi_name: String,
    pub jp_name: String,
    pub vi_position: String,
    pub jp_position: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonnelInput {
    pub vi_name: Option<String>,
    pub jp_name: Option<String>,
    pub vi_position: Option<String>,
    pub jp_position: Option<String>,
    pub sort_order: Option<i64>,
}

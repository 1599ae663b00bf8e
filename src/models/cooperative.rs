//! Cooperative model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cooperative {
    pub id: String,
    pub vi_name: String,
    pub jp_name: String,
    pub vi_address: String,
    pub jp_address: String,
    pub vi_description: String,
    pub jp_description: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooperativeInput {
    pub vi_name: String,
    pub jp_name: String,
    pub vi_address: String,
    pub jp_address: String,
    pub vi_description: String,
    pub jp_description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCooperativeInput {
    pub vi_name: Option<String>,
    pub jp_name: Option<String>,
    pub vi_address: Option<String>,
    pub jp_address: Option<String>,
    pub vi_description: Option<String>,
    pub jp_description: Option<String>,
}

//! Company timeline entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Year {
    pub id: String,
    pub year: i64,
    pub vi_content: String,
    pub jp_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearInput {
    pub year: i64,
    pub vi_content: String,
    pub jp_content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateYearInput {
    pub year: Option<i64>,
    pub vi_content: Option<String>,
    pub jp_content: Option<String>,
}

//! Recruitment application form

use serde::Deserialize;

/// Fields of a job application; the CV arrives as a separate file part.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    #[serde(default)]
    pub message: Option<String>,
}

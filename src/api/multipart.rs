//! multipart/form-data request bodies
//!
//! Admin writes arrive as forms mixing text fields and files. [`FormData`]
//! reads the whole form once and hands out fields by name.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::api::middleware::ApiError;
use crate::services::UploadedFile;

#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Read every part of the form.
    ///
    /// File inputs left empty by the browser (no name, no bytes) are
    /// skipped. A repeated file field keeps the last file.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .map(str::to_string)
                        .unwrap_or_else(|| "application/octet-stream".to_string());
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;

                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    /// First value of a text field
    pub fn optional(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(|values| values.first().cloned())
    }

    /// A field the service validates as required; absent reads as empty.
    pub fn text(&self, name: &str) -> String {
        self.optional(name).unwrap_or_default()
    }

    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, ApiError> {
        match self.optional(name) {
            Some(value) if !value.trim().is_empty() => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("{} must be a number", name))),
            _ => Ok(None),
        }
    }

    /// Values of a list field.
    ///
    /// Accepts both repeated fields and comma-separated values; `None` when
    /// the field was not sent at all, so an empty value clears the list.
    pub fn list(&self, name: &str) -> Option<Vec<String>> {
        let values = self.fields.get(name).or_else(|| self.fields.get(&format!("{}[]", name)))?;
        Some(
            values
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

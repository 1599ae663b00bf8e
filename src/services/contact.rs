//! Contact form submissions

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::ContactRepository;
use crate::models::{Contact, ContactInput, ListParams, PagedResult};
use crate::services::error::{required, validate_email, ServiceError};

const MAX_MESSAGE_CHARS: usize = 5000;

pub struct ContactService {
    repo: Arc<dyn ContactRepository>,
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ContactService {
    pub fn new(repo: Arc<dyn ContactRepository>) -> Self {
        Self { repo }
    }

    /// Store a public contact request.
    pub async fn submit(&self, input: ContactInput) -> Result<Contact, ServiceError> {
        let name = required("name", &input.name)?;
        let email = validate_email(&input.email)?;
        let message = required("message", &input.message)?;
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ServiceError::bad_request(format!(
                "message must be at most {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            phone: optional(input.phone),
            company: optional(input.company),
            subject: optional(input.subject),
            message,
            handled: false,
            created_at: chrono::Utc::now(),
        };
        self.repo.create(&contact).await.context("Failed to store contact")?;
        tracing::info!(contact_id = %contact.id, "Contact request received");
        Ok(contact)
    }

    pub async fn list(
        &self,
        params: &ListParams,
        handled: Option<bool>,
    ) -> Result<PagedResult<Contact>, ServiceError> {
        let (contacts, total) = self
            .repo
            .list(params, handled)
            .await
            .context("Failed to list contacts")?;
        Ok(PagedResult::new(contacts, total, params))
    }

    pub async fn get(&self, id: &str) -> Result<Contact, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get contact")?
            .ok_or_else(|| ServiceError::not_found("Contact not found"))
    }

    pub async fn set_handled(&self, id: &str, handled: bool) -> Result<Contact, ServiceError> {
        if !self
            .repo
            .set_handled(id, handled)
            .await
            .context("Failed to update contact")?
        {
            return Err(ServiceError::not_found("Contact not found"));
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete contact")? {
            return Err(ServiceError::not_found("Contact not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxContactRepository;
    use crate::db::{create_test_pool, migrations};

    #[tokio::test]
    async fn test_submit_and_handle() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = ContactService::new(SqlxContactRepository::boxed(pool));

        let invalid = service
            .submit(ContactInput {
                name: "Khách".to_string(),
                email: "not-an-email".to_string(),
                phone: None,
                company: None,
                subject: None,
                message: "Xin chào".to_string(),
            })
            .await;
        assert!(matches!(invalid, Err(ServiceError::BadRequest(_))));

        let contact = service
            .submit(ContactInput {
                name: "Khách".to_string(),
                email: "Guest@Example.com".to_string(),
                phone: Some(" ".to_string()),
                company: Some("Nông trại A".to_string()),
                subject: None,
                message: "Xin chào".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(contact.email, "guest@example.com");
        assert_eq!(contact.phone, None);
        assert!(!contact.handled);

        let handled = service.set_handled(&contact.id, true).await.unwrap();
        assert!(handled.handled);
        assert_eq!(service.list(&ListParams::default(), Some(false)).await.unwrap().total, 0);

        service.delete(&contact.id).await.unwrap();
        assert!(matches!(service.delete(&contact.id).await, Err(ServiceError::NotFound(_))));
    }
}

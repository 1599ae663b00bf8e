//! Contact repository

use crate::db::DynDatabasePool;
use crate::models::{Contact, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, contact: &Contact) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Contact>>;

    /// Newest first; `handled` of `Some` filters on the flag
    async fn list(&self, params: &ListParams, handled: Option<bool>) -> Result<(Vec<Contact>, i64)>;

    /// Returns `true` if the contact exists
    async fn set_handled(&self, id: &str, handled: bool) -> Result<bool>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const CONTACT_COLUMNS: &str =
    "id, name, email, phone, company, subject, message, handled, created_at";

pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, contact: &Contact) -> Result<()> {
        let sql = format!(
            "INSERT INTO contacts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CONTACT_COLUMNS
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&contact.id)
                .bind(&contact.name)
                .bind(&contact.email)
                .bind(&contact.phone)
                .bind(&contact.company)
                .bind(&contact.subject)
                .bind(&contact.message)
                .bind(contact.handled)
                .bind(contact.created_at)
                .execute(conn)
                .await
                .context("Failed to create contact")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS);
        let contact = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Contact>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get contact")?
        });
        Ok(contact)
    }

    async fn list(&self, params: &ListParams, handled: Option<bool>) -> Result<(Vec<Contact>, i64)> {
        // `? IS NULL` keeps one statement for both the filtered and unfiltered case
        let sql = format!(
            "SELECT {} FROM contacts WHERE (? IS NULL OR handled = ?) \
             ORDER BY created_at DESC LIMIT ? OFFSET ?",
            CONTACT_COLUMNS
        );
        let page = on_pool!(self.pool, conn => {
            let rows = sqlx::query_as::<_, Contact>(&sql)
                .bind(handled)
                .bind(handled)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list contacts")?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM contacts WHERE (? IS NULL OR handled = ?)",
            )
            .bind(handled)
            .bind(handled)
            .fetch_one(conn)
            .await
            .context("Failed to count contacts")?;
            (rows, total)
        });
        Ok(page)
    }

    async fn set_handled(&self, id: &str, handled: bool) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("UPDATE contacts SET handled = ? WHERE id = ?")
                .bind(handled)
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update contact")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM contacts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete contact")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Utc;

    fn contact(name: &str) -> Contact {
        Contact {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: "guest@example.com".to_string(),
            phone: Some("0900000000".to_string()),
            company: None,
            subject: None,
            message: "Hello".to_string(),
            handled: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_filters_on_handled() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let repo = SqlxContactRepository::new(pool);

        let first = contact("a");
        repo.create(&first).await.unwrap();
        repo.create(&contact("b")).await.unwrap();
        assert!(repo.set_handled(&first.id, true).await.unwrap());
        assert!(!repo.set_handled("missing", true).await.unwrap());

        let params = ListParams::default();
        assert_eq!(repo.list(&params, None).await.unwrap().1, 2);
        let (handled, total) = repo.list(&params, Some(true)).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(handled[0].id, first.id);
        assert_eq!(repo.list(&params, Some(false)).await.unwrap().1, 1);

        assert!(repo.delete(&first.id).await.unwrap());
        assert!(repo.get_by_id(&first.id).await.unwrap().is_none());
    }
}

//! Feedback repository

use crate::db::DynDatabasePool;
use crate::models::Feedback;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, feedback: &Feedback) -> Result<()>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Feedback>>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Feedback>>;

    async fn update(&self, feedback: &Feedback) -> Result<()>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

const FEEDBACK_COLUMNS: &str =
    "id, name, vi_position, jp_position, vi_content, jp_content, avatar, created_at, updated_at";

pub struct SqlxFeedbackRepository {
    pool: DynDatabasePool,
}

impl SqlxFeedbackRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FeedbackRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FeedbackRepository for SqlxFeedbackRepository {
    async fn create(&self, feedback: &Feedback) -> Result<()> {
        let sql = format!(
            "INSERT INTO feedbacks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            FEEDBACK_COLUMNS
        );
        on_pool!(self.pool, conn => {
            sqlx::query(&sql)
                .bind(&feedback.id)
                .bind(&feedback.name)
                .bind(&feedback.vi_position)
                .bind(&feedback.jp_position)
                .bind(&feedback.vi_content)
                .bind(&feedback.jp_content)
                .bind(&feedback.avatar)
                .bind(feedback.created_at)
                .bind(feedback.updated_at)
                .execute(conn)
                .await
                .context("Failed to create feedback")?;
        });
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Feedback>> {
        let sql = format!("SELECT {} FROM feedbacks WHERE id = ?", FEEDBACK_COLUMNS);
        let feedback = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Feedback>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get feedback")?
        });
        Ok(feedback)
    }

    async fn list(&self) -> Result<Vec<Feedback>> {
        let sql = format!("SELECT {} FROM feedbacks ORDER BY created_at DESC", FEEDBACK_COLUMNS);
        let feedbacks = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Feedback>(&sql)
                .fetch_all(conn)
                .await
                .context("Failed to list feedback")?
        });
        Ok(feedbacks)
    }

    async fn update(&self, feedback: &Feedback) -> Result<()> {
        on_pool!(self.pool, conn => {
            sqlx::query(
                "UPDATE feedbacks SET name = ?, vi_position = ?, jp_position = ?, vi_content = ?, \
                 jp_content = ?, avatar = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&feedback.name)
            .bind(&feedback.vi_position)
            .bind(&feedback.jp_position)
            .bind(&feedback.vi_content)
            .bind(&feedback.jp_content)
            .bind(&feedback.avatar)
            .bind(feedback.updated_at)
            .bind(&feedback.id)
            .execute(conn)
            .await
            .context("Failed to update feedback")?;
        });
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM feedbacks WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete feedback")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

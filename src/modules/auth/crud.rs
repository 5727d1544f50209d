use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool, QueryBuilder};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::modules::auth::interface::{MagicLinkRepository, Result, UserRepository};
use crate::modules::auth::model::{MagicLink, MagicLinkFilter, User};

pub struct UserCrud {
    pool: Pool<MySql>,
}

impl UserCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> std::result::Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl UserRepository for UserCrud {
    async fn upsert(&self, email: &str) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, created_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let user = self
            .find_by_email(email)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

pub struct MagicLinkCrud {
    pool: Pool<MySql>,
}

impl MagicLinkCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Remove links whose validity ended before `now` (unix seconds).
    pub async fn delete_expired(&self, now: i64) -> std::result::Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM magic_links WHERE valid_until < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Periodically purge expired links so rows don't outlive their validity.
    pub fn spawn_expired_sweeper(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                match self.delete_expired(Utc::now().timestamp()).await {
                    Ok(0) => {}
                    Ok(deleted) => tracing::info!("Deleted {} expired magic links", deleted),
                    Err(e) => tracing::warn!("Failed to delete expired magic links: {}", e),
                }
            }
        })
    }
}

/// `SELECT` for the link with the latest `valid_until` matching `filter`.
fn find_first_query(filter: &MagicLinkFilter) -> QueryBuilder<'_, MySql> {
    let mut query = QueryBuilder::<MySql>::new(
        "SELECT id, user_id, token, session_duration, valid_until, created_at FROM magic_links WHERE 1 = 1",
    );

    if let Some(user_id) = &filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id.as_str());
    }
    if let Some(token) = &filter.token {
        query.push(" AND token = ").push_bind(token.as_str());
    }
    if let Some(valid_until) = filter.valid_until_gte {
        query.push(" AND valid_until >= ").push_bind(valid_until);
    }
    query.push(" ORDER BY valid_until DESC LIMIT 1");

    query
}

#[async_trait]
impl MagicLinkRepository for MagicLinkCrud {
    async fn find_first(&self, filter: &MagicLinkFilter) -> Result<Option<MagicLink>> {
        let mut query = find_first_query(filter);
        let magic_link = query
            .build_query_as::<MagicLink>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(magic_link)
    }

    async fn create(&self, magic_link: &MagicLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO magic_links (id, user_id, token, session_duration, valid_until, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&magic_link.id)
        .bind(&magic_link.user_id)
        .bind(&magic_link.token)
        .bind(magic_link.session_duration.as_str())
        .bind(magic_link.valid_until)
        .bind(magic_link.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM magic_links WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

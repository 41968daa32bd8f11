use anyhow::Context;
use axum::async_trait;
use uuid::Uuid;

use crate::{db::PgStore, users::repo::StoreResult};

/// Subscriber → channel edges between users.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Flips the edge; returns `true` if the subscriber is now subscribed.
    async fn toggle(&self, subscriber_id: Uuid, channel_id: Uuid) -> StoreResult<bool>;
    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> StoreResult<bool>;
    async fn count_subscribers(&self, channel_id: Uuid) -> StoreResult<i64>;
    async fn count_subscribed_to(&self, subscriber_id: Uuid) -> StoreResult<i64>;
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn toggle(&self, subscriber_id: Uuid, channel_id: Uuid) -> StoreResult<bool> {
        let removed = sqlx::query(
            "DELETE FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&self.db)
        .await
        .context("delete subscription")?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO subscriptions (subscriber_id, channel_id)
            VALUES ($1, $2)
            ON CONFLICT (subscriber_id, channel_id) DO NOTHING
            "#,
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&self.db)
        .await
        .context("insert subscription")?;
        Ok(true)
    }

    async fn is_subscribed(&self, subscriber_id: Uuid, channel_id: Uuid) -> StoreResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM subscriptions WHERE subscriber_id = $1 AND channel_id = $2
            )
            "#,
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.db)
        .await
        .context("check subscription")?;
        Ok(exists)
    }

    async fn count_subscribers(&self, channel_id: Uuid) -> StoreResult<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE channel_id = $1")
            .bind(channel_id)
            .fetch_one(&self.db)
            .await
            .context("count subscribers")?;
        Ok(n)
    }

    async fn count_subscribed_to(&self, subscriber_id: Uuid) -> StoreResult<i64> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
                .bind(subscriber_id)
                .fetch_one(&self.db)
                .await
                .context("count subscriptions")?;
        Ok(n)
    }
}

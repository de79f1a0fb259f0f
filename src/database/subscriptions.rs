use super::Database;
use crate::error::{AppError, AppResult};
use crate::models::{current_time_millis, SubscriptionRecord};

impl Database {
    pub async fn find_subscription_for_user(&self, user_id: i64) -> AppResult<Option<SubscriptionRecord>> {
        let record = sqlx::query_as::<_, SubscriptionRecord>("SELECT * FROM subscriptions WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(record)
    }

    /// Insert or refresh the user's single subscription row.
    pub async fn upsert_subscription(
        &self,
        user_id: i64,
        customer_id: &str,
        subscription_id: &str,
        price_id: &str,
        current_period_end: i64,
    ) -> AppResult<SubscriptionRecord> {
        let now = current_time_millis();
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, customer_id, subscription_id, price_id,
                current_period_end, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                customer_id = excluded.customer_id,
                subscription_id = excluded.subscription_id,
                price_id = excluded.price_id,
                current_period_end = excluded.current_period_end,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(self.next_id())
        .bind(user_id)
        .bind(customer_id)
        .bind(subscription_id)
        .bind(price_id)
        .bind(current_period_end)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_subscription_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::Internal("Subscription vanished after upsert".to_string()))
    }

    /// Renewal by provider subscription id; `None` when no row tracks it.
    pub async fn renew_subscription(
        &self,
        subscription_id: &str,
        price_id: &str,
        current_period_end: i64,
    ) -> AppResult<Option<SubscriptionRecord>> {
        let result = sqlx::query(
            "UPDATE subscriptions SET price_id = ?, current_period_end = ?, updated_at = ? WHERE subscription_id = ?",
        )
        .bind(price_id)
        .bind(current_period_end)
        .bind(current_time_millis())
        .bind(subscription_id)
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let record = sqlx::query_as::<_, SubscriptionRecord>("SELECT * FROM subscriptions WHERE subscription_id = ?")
            .bind(subscription_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(record)
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::millis_to_datetime;

/// Grace period after the billed period ends.
pub const SUBSCRIPTION_GRACE_MILLIS: i64 = 86_400_000;

#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRecord {
    pub id: i64,
    pub user_id: i64,
    pub customer_id: String,
    pub subscription_id: String,
    pub price_id: String,
    pub current_period_end: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SubscriptionRecord {
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        !self.customer_id.is_empty()
            && self.current_period_end + SUBSCRIPTION_GRACE_MILLIS > now_millis
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_subscribed: bool,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn from_record(record: Option<&SubscriptionRecord>, now_millis: i64) -> Self {
        match record {
            Some(record) => Self {
                is_subscribed: record.is_valid_at(now_millis),
                current_period_end: Some(millis_to_datetime(record.current_period_end)),
            },
            None => Self {
                is_subscribed: false,
                current_period_end: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(customer: &str, period_end: i64) -> SubscriptionRecord {
        SubscriptionRecord {
            id: 1,
            user_id: 1,
            customer_id: customer.to_string(),
            subscription_id: "sub_1".to_string(),
            price_id: "price_1".to_string(),
            current_period_end: period_end,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_grace_day() {
        let now = 10 * SUBSCRIPTION_GRACE_MILLIS;
        assert!(record("cus_1", now).is_valid_at(now));
        assert!(record("cus_1", now - SUBSCRIPTION_GRACE_MILLIS + 1).is_valid_at(now));
        assert!(!record("cus_1", now - SUBSCRIPTION_GRACE_MILLIS).is_valid_at(now));
    }

    #[test]
    fn test_missing_customer_is_invalid() {
        assert!(!record("", i64::MAX / 2).is_valid_at(0));
        assert!(!SubscriptionStatus::from_record(None, 0).is_subscribed);
    }
}

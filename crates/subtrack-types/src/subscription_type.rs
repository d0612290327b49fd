//! Subscription type catalog entries

use chrono::{DateTime, Utc};

/// Catalog status: the type can be referenced by new subscriptions
pub const SUBSCRIPTION_TYPE_ENABLED: i32 = 10;
/// Catalog status: the type is disabled for new subscriptions
pub const SUBSCRIPTION_TYPE_DISABLED: i32 = 0;

/// A catalog entry classifying subscriptions.
///
/// Immutable from the engine's perspective; only enabled types may be
/// referenced when creating a subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionType {
    pub id: u64,
    /// Short code, e.g. `email` or `plan`
    pub type_code: String,
    pub display_name: String,
    /// 0 = disabled, 10 = enabled
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionType {
    pub fn is_enabled(&self) -> bool {
        self.status == SUBSCRIPTION_TYPE_ENABLED
    }
}

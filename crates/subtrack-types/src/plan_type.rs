//! Plan types

use chrono::{DateTime, Utc};

/// Pricing and duration attached to a subscription type.
///
/// A subscription type has at most one plan type; its presence makes
/// subscriptions of that type "plan" subscriptions (bounded by start/end and
/// gated on payment), its absence makes them "email" subscriptions.
#[derive(Debug, Clone)]
pub struct PlanType {
    pub id: u64,
    pub subscription_type_id: u64,
    pub plan_code: String,
    pub display_name: String,
    pub description: String,
    /// Price in minor units
    pub price_cents: i64,
    pub currency: String,
    /// Strictly positive entitlement duration
    pub duration_days: i32,
    /// Opaque feature description
    pub features: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanType {
    /// Entitlement duration as a chrono duration (`duration_days` · 24h)
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::hours(24 * i64::from(self.duration_days))
    }
}

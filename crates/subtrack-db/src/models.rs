//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive and
//! convert into the domain types the engine consumes.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use subtrack_types::{PlanType, Subscription, SubscriptionStatus, SubscriptionType};

use crate::error::{DbError, DbResult};

/// Subscription type row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionTypeRow {
    pub id: u64,
    pub type_code: String,
    pub display_name: String,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubscriptionTypeRow> for SubscriptionType {
    fn from(row: SubscriptionTypeRow) -> Self {
        Self {
            id: row.id,
            type_code: row.type_code,
            display_name: row.display_name,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Plan type row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PlanTypeRow {
    pub id: u64,
    pub subscription_type_id: u64,
    pub plan_code: String,
    pub display_name: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    pub duration_days: i32,
    pub features: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanTypeRow> for PlanType {
    fn from(row: PlanTypeRow) -> Self {
        Self {
            id: row.id,
            subscription_type_id: row.subscription_type_id,
            plan_code: row.plan_code,
            display_name: row.display_name,
            description: row.description,
            price_cents: row.price_cents,
            currency: row.currency,
            duration_days: row.duration_days,
            features: row.features,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: u64,
    pub subscription_type_id: u64,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub status: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub renew_at: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Convert to the domain entity, rejecting status codes outside the
    /// closed set.
    pub fn into_domain(self) -> DbResult<Subscription> {
        let status = SubscriptionStatus::from_code(self.status).ok_or_else(|| {
            DbError::Decode(format!(
                "subscription {} has unknown status code {}",
                self.id, self.status
            ))
        })?;

        Ok(Subscription {
            id: self.id,
            subscription_type_id: self.subscription_type_id,
            user_id: self.user_id,
            email: self.email,
            status,
            start_at: self.start_at,
            end_at: self.end_at,
            renew_at: self.renew_at,
            auto_renew: self.auto_renew,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

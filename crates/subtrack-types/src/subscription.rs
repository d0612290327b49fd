//! Subscription types

use chrono::{DateTime, Utc};

/// Subscription status
///
/// The codes are part of the external contract (they appear verbatim in API
/// payloads and in storage), so the set is closed and conversions are explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    /// Terminal for this life cycle; only a fresh create revives the row
    Inactive,
    /// Transient: the engine owns the next action (payment attempt, retry)
    Processing,
    /// Waiting for an external callback to resolve the payment
    PendingPayment,
    /// Entitlement is currently granted
    Active,
}

impl SubscriptionStatus {
    /// Numeric code stored in the database and exposed over the API
    pub const fn code(self) -> i32 {
        match self {
            Self::Inactive => 0,
            Self::Processing => 1,
            Self::PendingPayment => 2,
            Self::Active => 10,
        }
    }

    /// Parse a numeric status code
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Inactive),
            1 => Some(Self::Processing),
            2 => Some(Self::PendingPayment),
            10 => Some(Self::Active),
            _ => None,
        }
    }
}

/// A user subscription
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Storage-assigned identifier (0 until persisted)
    pub id: u64,
    /// Owning subscription type
    pub subscription_type_id: u64,
    /// Optional user identifier; at least one of user_id/email is set
    pub user_id: Option<String>,
    /// Optional e-mail; at least one of user_id/email is set
    pub email: Option<String>,
    /// Current lifecycle status
    pub status: SubscriptionStatus,
    /// Entitlement start (plan subscriptions only)
    pub start_at: Option<DateTime<Utc>>,
    /// Entitlement end (plan subscriptions only)
    pub end_at: Option<DateTime<Utc>>,
    /// Instant at which the renewal batch becomes eligible to act
    pub renew_at: Option<DateTime<Utc>>,
    /// Whether the renewal batch should renew this subscription
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the identity pair carries at least one value
    pub fn has_identity(&self) -> bool {
        self.user_id.is_some() || self.email.is_some()
    }
}

//! Repository traits
//!
//! Async persistence interfaces consumed by the subscription engine. The
//! engine never sees SQL; these traits are the whole persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use subtrack_types::{PlanType, Subscription, SubscriptionType};

use crate::error::DbResult;

/// Subscription repository trait
///
/// Identity fields (`user_id`, `email`) are optional individually; an absent
/// value is distinct from an empty string and implementations must match the
/// null state exactly (NULL-safe equality).
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a new subscription and return the storage-assigned id.
    ///
    /// Fails with [`crate::DbError::DuplicateKey`] when the
    /// (type, user_id, email) uniqueness constraint is violated.
    async fn create(&self, subscription: &Subscription) -> DbResult<u64>;

    /// Overwrite the mutable columns of an existing subscription.
    ///
    /// Fails with [`crate::DbError::NotFound`] when no row matches the id.
    async fn update(&self, subscription: &Subscription) -> DbResult<()>;

    /// Find a subscription by id
    async fn find_by_id(&self, id: u64) -> DbResult<Option<Subscription>>;

    /// Find the subscription for a (type, identity) triple, matching the
    /// null state of both identity halves.
    async fn find_by_type_and_identity(
        &self,
        subscription_type_id: u64,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Option<Subscription>>;

    /// List subscriptions filtered by identity, newest id first.
    /// Empty filters return all rows.
    async fn list(&self, user_id: Option<&str>, email: Option<&str>)
        -> DbResult<Vec<Subscription>>;

    /// Active rows with auto-renew enabled and renew_at <= now, id ascending
    async fn list_due_auto_renew(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>>;

    /// PendingPayment rows whose updated_at < cutoff, id ascending
    async fn list_pending_payment_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<Subscription>>;

    /// Active rows whose end_at is set and < now, id ascending
    async fn list_expired_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>>;
}

/// Subscription type repository trait
#[async_trait]
pub trait SubscriptionTypeRepository: Send + Sync {
    /// List catalog entries, optionally filtered by type code and status
    async fn list(
        &self,
        type_code: Option<&str>,
        status: Option<i32>,
    ) -> DbResult<Vec<SubscriptionType>>;

    /// Find a catalog entry by id
    async fn find_by_id(&self, id: u64) -> DbResult<Option<SubscriptionType>>;
}

/// Plan type repository trait
#[async_trait]
pub trait PlanTypeRepository: Send + Sync {
    /// Find the plan attached to a subscription type, if any
    async fn find_by_subscription_type_id(
        &self,
        subscription_type_id: u64,
    ) -> DbResult<Option<PlanType>>;
}

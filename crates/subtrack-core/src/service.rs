//! Subscription engine
//!
//! The state machine behind every subscription mutation. All decisions about
//! status transitions, time fields, and payment interpretation live here; the
//! facades only parse requests and map errors.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;

use subtrack_db::{
    DbError, PlanTypeRepository, SubscriptionRepository, SubscriptionTypeRepository,
};
use subtrack_types::{Subscription, SubscriptionStatus, SubscriptionType};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::payment::{PaymentOutcome, PaymentProvider};

/// Create request as seen by the engine (already transport-agnostic)
#[derive(Debug, Clone, Default)]
pub struct CreateSubscriptionInput {
    pub subscription_type_id: u64,
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// RFC-3339 instant; required when the type carries a plan
    pub start_at: Option<String>,
    pub auto_renew: bool,
}

/// Partial update: absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriptionInput {
    pub id: u64,
    pub auto_renew: Option<bool>,
    pub status: Option<i32>,
}

/// Identity filter for subscription listings
#[derive(Debug, Clone, Default)]
pub struct ListSubscriptionsFilter {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// Catalog listing filter
#[derive(Debug, Clone, Default)]
pub struct ListSubscriptionTypesFilter {
    pub type_code: Option<String>,
    pub status: Option<i32>,
}

/// Result of a create call: the persisted subscription plus the redirect URL
/// when the provider demanded one
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub subscription: Subscription,
    pub payment_url: Option<String>,
}

/// Subscription engine
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    subscription_types: Arc<dyn SubscriptionTypeRepository>,
    plan_types: Arc<dyn PlanTypeRepository>,
    payment: Arc<dyn PaymentProvider>,
    cfg: EngineConfig,
}

impl SubscriptionService {
    /// Create a new subscription engine
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        subscription_types: Arc<dyn SubscriptionTypeRepository>,
        plan_types: Arc<dyn PlanTypeRepository>,
        payment: Arc<dyn PaymentProvider>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            subscriptions,
            subscription_types,
            plan_types,
            payment,
            cfg,
        }
    }

    /// List catalog entries, optionally filtered by type code and status
    pub async fn list_subscription_types(
        &self,
        filter: ListSubscriptionTypesFilter,
    ) -> EngineResult<Vec<SubscriptionType>> {
        if let Some(status) = filter.status {
            if !is_subscription_type_status_allowed(status) {
                return Err(EngineError::InvalidStatus);
            }
        }

        let type_code = filter
            .type_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        Ok(self
            .subscription_types
            .list(type_code, filter.status)
            .await?)
    }

    /// Create a subscription, or update the existing row for the same
    /// (type, identity) triple in place.
    pub async fn create_subscription(
        &self,
        input: CreateSubscriptionInput,
    ) -> EngineResult<CreateOutcome> {
        let user_id = normalize_identity(input.user_id.as_deref());
        let email = normalize_identity(input.email.as_deref());
        if user_id.is_none() && email.is_none() {
            return Err(EngineError::InvalidRequest(
                "at least one of user_id or email is required".to_string(),
            ));
        }

        let subscription_type = self
            .subscription_types
            .find_by_id(input.subscription_type_id)
            .await?;
        if !subscription_type.is_some_and(|t| t.is_enabled()) {
            return Err(EngineError::SubscriptionTypeNotFound);
        }

        let plan_type = self
            .plan_types
            .find_by_subscription_type_id(input.subscription_type_id)
            .await?;

        let now = Utc::now();
        let existing = self
            .subscriptions
            .find_by_type_and_identity(
                input.subscription_type_id,
                user_id.as_deref(),
                email.as_deref(),
            )
            .await?;

        let is_new = existing.is_none();
        let mut subscription = existing.unwrap_or_else(|| Subscription {
            id: 0,
            subscription_type_id: input.subscription_type_id,
            user_id: user_id.clone(),
            email: email.clone(),
            status: SubscriptionStatus::Processing,
            start_at: None,
            end_at: None,
            renew_at: None,
            auto_renew: false,
            created_at: now,
            updated_at: now,
        });

        subscription.subscription_type_id = input.subscription_type_id;
        subscription.user_id = user_id;
        subscription.email = email;
        subscription.auto_renew = input.auto_renew;

        match &plan_type {
            Some(plan) => {
                let start_at = parse_start_at(input.start_at.as_deref())?;
                let end_at = start_at + plan.duration();
                subscription.start_at = Some(start_at);
                subscription.end_at = Some(end_at);
                subscription.renew_at = subscription
                    .auto_renew
                    .then(|| end_at - self.cfg.renew_before_end);
                subscription.status = SubscriptionStatus::Processing;
            }
            None => {
                subscription.start_at = None;
                subscription.end_at = None;
                subscription.renew_at = None;
                subscription.auto_renew = false;
                subscription.status = SubscriptionStatus::Active;
            }
        }
        subscription.updated_at = now;

        if is_new {
            subscription.id =
                self.subscriptions
                    .create(&subscription)
                    .await
                    .map_err(|err| match err {
                        DbError::DuplicateKey(_) => EngineError::SubscriptionAlreadyExists,
                        other => EngineError::Database(other),
                    })?;
        } else {
            self.subscriptions
                .update(&subscription)
                .await
                .map_err(map_update_not_found)?;
        }

        let Some(plan) = plan_type else {
            return Ok(CreateOutcome {
                subscription,
                payment_url: None,
            });
        };

        let payment_result = self
            .process_payment_guarded(
                subscription.id,
                plan.id,
                subscription.user_id.as_deref(),
                subscription.email.as_deref(),
            )
            .await;

        let now = Utc::now();
        let mut payment_url = None;
        match payment_result {
            Ok(PaymentOutcome::Success) => {
                subscription.status = SubscriptionStatus::Active;
            }
            Ok(PaymentOutcome::Redirect { url }) => {
                subscription.status = SubscriptionStatus::PendingPayment;
                payment_url = Some(url);
            }
            Ok(PaymentOutcome::Failure { reason }) => {
                tracing::warn!(
                    subscription_id = subscription.id,
                    reason = %reason,
                    "payment declined on create, scheduling retry"
                );
                subscription.status = SubscriptionStatus::Processing;
                subscription.renew_at = Some(now + self.cfg.renewal_retry_interval);
            }
            Err(reason) => {
                // The provider aborted mid-call. Schedule a retry so the
                // renewal batch reclaims the row, then surface the failure.
                subscription.status = SubscriptionStatus::Processing;
                subscription.renew_at = Some(now + self.cfg.renewal_retry_interval);
                subscription.updated_at = now;
                if let Err(err) = self.subscriptions.update(&subscription).await {
                    tracing::error!(
                        subscription_id = subscription.id,
                        error = %err,
                        "failed to persist retry schedule after payment crash"
                    );
                }
                return Err(EngineError::PaymentProcessing(reason));
            }
        }
        subscription.updated_at = now;

        self.subscriptions
            .update(&subscription)
            .await
            .map_err(map_update_not_found)?;

        Ok(CreateOutcome {
            subscription,
            payment_url,
        })
    }

    /// Fetch a subscription by id
    pub async fn get_subscription(&self, id: u64) -> EngineResult<Subscription> {
        self.subscriptions
            .find_by_id(id)
            .await?
            .ok_or(EngineError::SubscriptionNotFound)
    }

    /// List subscriptions filtered by identity
    pub async fn list_subscriptions(
        &self,
        filter: ListSubscriptionsFilter,
    ) -> EngineResult<Vec<Subscription>> {
        let user_id = normalize_identity(filter.user_id.as_deref());
        let email = normalize_identity(filter.email.as_deref());
        Ok(self
            .subscriptions
            .list(user_id.as_deref(), email.as_deref())
            .await?)
    }

    /// Apply a partial update (auto_renew and/or status)
    pub async fn update_subscription(
        &self,
        input: UpdateSubscriptionInput,
    ) -> EngineResult<Subscription> {
        let mut subscription = self
            .subscriptions
            .find_by_id(input.id)
            .await?
            .ok_or(EngineError::SubscriptionNotFound)?;

        if input.auto_renew.is_none() && input.status.is_none() {
            return Err(EngineError::NoFieldsToUpdate);
        }

        if let Some(code) = input.status {
            subscription.status =
                SubscriptionStatus::from_code(code).ok_or(EngineError::InvalidStatus)?;
        }
        if let Some(auto_renew) = input.auto_renew {
            subscription.auto_renew = auto_renew;
            if !auto_renew {
                subscription.renew_at = None;
            } else if let Some(end_at) = subscription.end_at {
                subscription.renew_at = Some(end_at - self.cfg.renew_before_end);
            }
        }
        if subscription.status == SubscriptionStatus::Inactive {
            subscription.auto_renew = false;
            subscription.renew_at = None;
        }

        subscription.updated_at = Utc::now();
        self.subscriptions
            .update(&subscription)
            .await
            .map_err(map_update_not_found)?;

        Ok(subscription)
    }

    /// Soft delete: the row stays, the lifecycle ends
    pub async fn delete_subscription(&self, id: u64) -> EngineResult<Subscription> {
        let mut subscription = self
            .subscriptions
            .find_by_id(id)
            .await?
            .ok_or(EngineError::SubscriptionNotFound)?;

        subscription.status = SubscriptionStatus::Inactive;
        subscription.auto_renew = false;
        subscription.renew_at = None;
        subscription.updated_at = Utc::now();

        self.subscriptions
            .update(&subscription)
            .await
            .map_err(map_update_not_found)?;

        Ok(subscription)
    }

    /// Stop renewing without revoking the current entitlement; the
    /// expiration sweep retires the row when its end-time passes.
    pub async fn cancel_subscription(&self, id: u64) -> EngineResult<Subscription> {
        let mut subscription = self
            .subscriptions
            .find_by_id(id)
            .await?
            .ok_or(EngineError::SubscriptionNotFound)?;

        subscription.auto_renew = false;
        subscription.renew_at = None;
        subscription.updated_at = Utc::now();

        self.subscriptions
            .update(&subscription)
            .await
            .map_err(map_update_not_found)?;

        Ok(subscription)
    }

    /// Auto-renewal batch: attempt payment for every due subscription.
    ///
    /// Per-item failures are logged and skipped; only a failure of the
    /// initial scan surfaces as an error.
    pub async fn run_auto_renewal_batch(&self) -> EngineResult<()> {
        let mut now = Utc::now();
        let items = self.subscriptions.list_due_auto_renew(now).await?;

        for mut item in items {
            item.status = SubscriptionStatus::Processing;
            item.updated_at = now;
            if let Err(err) = self.subscriptions.update(&item).await {
                tracing::warn!(
                    subscription_id = item.id,
                    error = %err,
                    "skipping renewal, failed to mark subscription processing"
                );
                continue;
            }

            let plan = match self
                .plan_types
                .find_by_subscription_type_id(item.subscription_type_id)
                .await
            {
                Ok(Some(plan)) => plan,
                Ok(None) | Err(_) => {
                    // A renewable subscription without a plan cannot be
                    // charged; retire it instead of retrying forever.
                    item.status = SubscriptionStatus::Inactive;
                    item.auto_renew = false;
                    item.renew_at = None;
                    item.updated_at = Utc::now();
                    if let Err(err) = self.subscriptions.update(&item).await {
                        tracing::warn!(
                            subscription_id = item.id,
                            error = %err,
                            "failed to deactivate planless subscription"
                        );
                    }
                    metrics::counter!("subscription_renewals_total", "result" => "no_plan")
                        .increment(1);
                    continue;
                }
            };

            let payment_result = self
                .process_payment_guarded(item.id, plan.id, item.user_id.as_deref(), item.email.as_deref())
                .await;
            now = Utc::now();

            let result_label = match payment_result {
                Err(reason) => {
                    tracing::warn!(
                        subscription_id = item.id,
                        reason = %reason,
                        "payment provider crashed during renewal, scheduling retry"
                    );
                    item.status = SubscriptionStatus::Processing;
                    item.renew_at = Some(now + self.cfg.renewal_retry_interval);
                    "crash"
                }
                Ok(PaymentOutcome::Success) => {
                    item.status = SubscriptionStatus::Active;
                    let base = item.end_at.map_or(now, |end_at| end_at.max(now));
                    let new_end = base + plan.duration();
                    item.end_at = Some(new_end);
                    if item.auto_renew {
                        item.renew_at = Some(new_end - self.cfg.renew_before_end);
                    }
                    "success"
                }
                Ok(PaymentOutcome::Redirect { url }) => {
                    tracing::info!(
                        subscription_id = item.id,
                        payment_url = %url,
                        "renewal requires payer redirect"
                    );
                    item.status = SubscriptionStatus::PendingPayment;
                    item.renew_at = Some(now + self.cfg.renewal_retry_interval);
                    "redirect"
                }
                Ok(PaymentOutcome::Failure { reason }) => {
                    tracing::warn!(
                        subscription_id = item.id,
                        reason = %reason,
                        "renewal payment declined, scheduling retry"
                    );
                    item.status = SubscriptionStatus::Processing;
                    item.renew_at = Some(now + self.cfg.renewal_retry_interval);
                    "failure"
                }
            };

            if self.should_deactivate_for_retry_age(&item) {
                tracing::info!(
                    subscription_id = item.id,
                    "renewal retry window exhausted, deactivating"
                );
                item.status = SubscriptionStatus::Inactive;
                item.auto_renew = false;
                item.renew_at = None;
            }

            item.updated_at = now;
            if let Err(err) = self.subscriptions.update(&item).await {
                tracing::warn!(
                    subscription_id = item.id,
                    error = %err,
                    "failed to persist renewal outcome"
                );
            }
            metrics::counter!("subscription_renewals_total", "result" => result_label)
                .increment(1);
        }

        Ok(())
    }

    /// Pending-payment cleanup batch: kick abandoned PendingPayment rows
    /// back to Processing so the renewal batch retries them.
    pub async fn run_pending_payment_cleanup_batch(&self) -> EngineResult<()> {
        let now = Utc::now();
        let cutoff = now - self.cfg.pending_payment_timeout;
        let items = self.subscriptions.list_pending_payment_stale(cutoff).await?;

        for mut item in items {
            item.status = SubscriptionStatus::Processing;
            if item.renew_at.is_none_or(|renew_at| renew_at < now) {
                item.renew_at = Some(now + self.cfg.renewal_retry_interval);
            }
            item.updated_at = now;
            if let Err(err) = self.subscriptions.update(&item).await {
                tracing::warn!(
                    subscription_id = item.id,
                    error = %err,
                    "failed to reset stale pending-payment subscription"
                );
            }
        }

        Ok(())
    }

    /// Expiration sweep: retire Active subscriptions whose end-time passed.
    pub async fn run_expiration_batch(&self) -> EngineResult<()> {
        let now = Utc::now();
        let items = self.subscriptions.list_expired_active(now).await?;

        for mut item in items {
            item.status = SubscriptionStatus::Inactive;
            item.auto_renew = false;
            item.renew_at = None;
            item.updated_at = now;
            if let Err(err) = self.subscriptions.update(&item).await {
                tracing::warn!(
                    subscription_id = item.id,
                    error = %err,
                    "failed to deactivate expired subscription"
                );
            }
        }

        Ok(())
    }

    /// The single crash boundary around the payment port. A panic inside the
    /// provider is converted into an error value here and never unwinds
    /// further; a well-formed `Failure` outcome passes through untouched.
    async fn process_payment_guarded(
        &self,
        subscription_id: u64,
        plan_type_id: u64,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<PaymentOutcome, String> {
        let call = self
            .payment
            .process_subscription_payment(subscription_id, plan_type_id, user_id, email);

        AssertUnwindSafe(call)
            .catch_unwind()
            .await
            .map_err(panic_message)
    }

    // Guard formula: how far past end has the next scheduled retry drifted.
    // Monotonic with the retry count, so it bounds retries after end.
    fn should_deactivate_for_retry_age(&self, item: &Subscription) -> bool {
        match (item.end_at, item.renew_at) {
            (Some(end_at), Some(renew_at)) => renew_at - end_at > self.cfg.max_renewal_retry_age,
            _ => false,
        }
    }
}

/// Trim an identity half, normalizing empty and whitespace-only values to
/// absent so storage sees NULL rather than "".
pub fn normalize_identity(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_start_at(value: Option<&str>) -> EngineResult<DateTime<Utc>> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    let Some(value) = value else {
        return Err(EngineError::StartAtRequired);
    };

    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| EngineError::InvalidRequest("invalid start_at format".to_string()))
}

fn map_update_not_found(err: DbError) -> EngineError {
    match err {
        DbError::NotFound => EngineError::SubscriptionNotFound,
        other => EngineError::Database(other),
    }
}

fn is_subscription_type_status_allowed(status: i32) -> bool {
    status == subtrack_types::SUBSCRIPTION_TYPE_DISABLED
        || status == subtrack_types::SUBSCRIPTION_TYPE_ENABLED
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

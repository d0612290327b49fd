//! Payment callback handling
//!
//! Applies an out-of-band payment result to a subscription that is (usually)
//! awaiting one. A callback is accepted whatever the subscription's current
//! status; idempotency is the caller's responsibility.

use std::sync::Arc;

use chrono::Utc;

use subtrack_db::{DbError, SubscriptionRepository};
use subtrack_types::{Subscription, SubscriptionStatus};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Payment callback request as seen by the engine
#[derive(Debug, Clone)]
pub struct PaymentCallbackInput {
    pub subscription_id: u64,
    /// Gateway-reported outcome; `success` or `failed`, case-insensitive
    pub status: String,
    /// Opaque gateway transaction reference, kept for the audit log
    pub transaction_id: String,
}

/// Applies gateway callbacks to subscriptions
pub struct PaymentCallbackService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    cfg: EngineConfig,
}

impl PaymentCallbackService {
    /// Create a new callback service
    pub fn new(subscriptions: Arc<dyn SubscriptionRepository>, cfg: EngineConfig) -> Self {
        Self { subscriptions, cfg }
    }

    /// Resolve a pending payment from a gateway callback.
    pub async fn apply(&self, input: PaymentCallbackInput) -> EngineResult<Subscription> {
        let mut subscription = self
            .subscriptions
            .find_by_id(input.subscription_id)
            .await?
            .ok_or(EngineError::SubscriptionNotFound)?;

        let now = Utc::now();
        match input.status.trim().to_ascii_lowercase().as_str() {
            "success" => {
                subscription.status = SubscriptionStatus::Active;
            }
            "failed" => {
                subscription.status = SubscriptionStatus::Processing;
                subscription.renew_at = Some(now + self.cfg.renewal_retry_interval);
            }
            _ => {
                return Err(EngineError::InvalidRequest(
                    "invalid callback status".to_string(),
                ));
            }
        }
        subscription.updated_at = now;

        self.subscriptions
            .update(&subscription)
            .await
            .map_err(|err| match err {
                DbError::NotFound => EngineError::SubscriptionNotFound,
                other => EngineError::Database(other),
            })?;

        tracing::info!(
            subscription_id = subscription.id,
            transaction_id = %input.transaction_id,
            status = subscription.status.code(),
            "payment callback applied"
        );

        Ok(subscription)
    }
}

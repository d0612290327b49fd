//! Payment provider abstraction

use async_trait::async_trait;

/// Outcome of a payment attempt.
///
/// The provider reports its result as a value, never as an error: a declined
/// payment is a well-formed `Failure` and follows the normal retry path. The
/// only abnormal termination is a panic, which the engine catches at the call
/// site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment settled synchronously
    Success,
    /// The payer must be redirected to complete the payment
    Redirect { url: String },
    /// The provider declined the payment
    Failure { reason: String },
}

/// Payment provider trait
///
/// Abstracts the payment gateway so the engine can be exercised against
/// scripted providers in tests.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Attempt to collect payment for a subscription on the given plan.
    ///
    /// Implementations may panic; the engine treats a panic as a transient
    /// "payment processing failed" condition, never as a provider verdict.
    async fn process_subscription_payment(
        &self,
        subscription_id: u64,
        plan_type_id: u64,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> PaymentOutcome;
}

/// Placeholder provider wired in until a real gateway integration lands.
pub struct StubProvider;

impl StubProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn process_subscription_payment(
        &self,
        _subscription_id: u64,
        _plan_type_id: u64,
        _user_id: Option<&str>,
        _email: Option<&str>,
    ) -> PaymentOutcome {
        panic!("payments for renewals are not implemented");
    }
}

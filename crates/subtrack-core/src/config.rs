//! Engine timing configuration

use chrono::Duration;

/// Timing knobs for the subscription state machine.
///
/// All values arrive from the environment in minutes; they are carried as
/// chrono durations because every consumer combines them with UTC instants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long before end-time the renewal batch becomes eligible
    pub renew_before_end: Duration,
    /// Delay before a failed payment attempt is retried
    pub renewal_retry_interval: Duration,
    /// Bound on how far past end-time renewal may keep retrying
    pub max_renewal_retry_age: Duration,
    /// Age after which a PendingPayment row is considered abandoned
    pub pending_payment_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            renew_before_end: Duration::minutes(1440),
            renewal_retry_interval: Duration::minutes(60),
            max_renewal_retry_age: Duration::minutes(10080),
            pending_payment_timeout: Duration::minutes(30),
        }
    }
}

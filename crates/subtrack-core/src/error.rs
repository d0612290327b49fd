//! Engine errors

use thiserror::Error;

/// Subscription engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or incomplete request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Status code outside the closed set
    #[error("invalid status")]
    InvalidStatus,

    /// Plan subscriptions require an explicit start instant
    #[error("start_at is required for plan subscriptions")]
    StartAtRequired,

    /// Update carried neither auto_renew nor status
    #[error("no fields provided for update")]
    NoFieldsToUpdate,

    /// Unknown or disabled subscription type
    #[error("subscription type not found")]
    SubscriptionTypeNotFound,

    /// Subscription not found
    #[error("subscription not found")]
    SubscriptionNotFound,

    /// Create raced another create for the same (type, identity)
    #[error("subscription already exists")]
    SubscriptionAlreadyExists,

    /// The payment provider aborted; converted at the call-site boundary,
    /// never allowed to unwind past the engine
    #[error("payment processing failed: {0}")]
    PaymentProcessing(String),

    /// Storage failure
    #[error("database error: {0}")]
    Database(#[from] subtrack_db::DbError),
}

impl EngineError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionNotFound | Self::SubscriptionTypeNotFound
        )
    }

    /// Check if the caller supplied a bad request (as opposed to an
    /// internal failure)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidStatus
                | Self::StartAtRequired
                | Self::NoFieldsToUpdate
        )
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

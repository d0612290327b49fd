//! Application state for the subscriptions API service.

use std::sync::Arc;

use subtrack_core::{PaymentCallbackService, SubscriptionService};

use crate::auth::AuthVerifier;
use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Subscription engine
    pub engine: Arc<SubscriptionService>,
    /// Payment callback service
    pub callbacks: Arc<PaymentCallbackService>,
    /// Internal auth client used by the HTTP auth middleware
    pub auth: AuthVerifier,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        engine: SubscriptionService,
        callbacks: PaymentCallbackService,
        auth: AuthVerifier,
        config: Config,
    ) -> Self {
        Self {
            engine: Arc::new(engine),
            callbacks: Arc::new(callbacks),
            auth,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

//! Shared test harness

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod mock_repos;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use subtrack_core::{EngineConfig, PaymentCallbackService, SubscriptionService};
use subtrack_db::SubscriptionRepository;
use subtrack_types::{PlanType, Subscription, SubscriptionStatus, SubscriptionType};

use self::mock_repos::{
    MockPaymentProvider, MockPlanTypeRepository, MockSubscriptionRepository,
    MockSubscriptionTypeRepository,
};

/// Engine plus all its mocked collaborators
pub struct Harness {
    pub subscriptions: Arc<MockSubscriptionRepository>,
    pub subscription_types: Arc<MockSubscriptionTypeRepository>,
    pub plan_types: Arc<MockPlanTypeRepository>,
    pub payment: Arc<MockPaymentProvider>,
    pub engine: SubscriptionService,
    pub callbacks: PaymentCallbackService,
    pub cfg: EngineConfig,
}

impl Harness {
    pub fn new(payment: MockPaymentProvider) -> Self {
        Self::with_config(payment, EngineConfig::default())
    }

    pub fn with_config(payment: MockPaymentProvider, cfg: EngineConfig) -> Self {
        let subscriptions = Arc::new(MockSubscriptionRepository::new());
        let subscription_types = Arc::new(MockSubscriptionTypeRepository::new());
        let plan_types = Arc::new(MockPlanTypeRepository::new());
        let payment = Arc::new(payment);

        let engine = SubscriptionService::new(
            subscriptions.clone(),
            subscription_types.clone(),
            plan_types.clone(),
            payment.clone(),
            cfg.clone(),
        );
        let callbacks = PaymentCallbackService::new(
            subscriptions.clone() as Arc<dyn SubscriptionRepository>,
            cfg.clone(),
        );

        Self {
            subscriptions,
            subscription_types,
            plan_types,
            payment,
            engine,
            callbacks,
            cfg,
        }
    }

    /// Seed an enabled catalog entry without a plan ("email" kind)
    pub fn seed_email_type(&self, id: u64) {
        self.subscription_types
            .insert(subscription_type(id, "email", 10));
    }

    /// Seed an enabled catalog entry with an attached plan
    pub fn seed_plan_type(&self, id: u64, duration_days: i32) -> PlanType {
        self.subscription_types
            .insert(subscription_type(id, "plan", 10));
        let plan = plan_type(id * 100, id, duration_days);
        self.plan_types.insert(plan.clone());
        plan
    }

    /// Fetch a subscription straight from the store
    pub fn stored(&self, id: u64) -> Subscription {
        self.subscriptions.get(id).expect("subscription not stored")
    }
}

pub fn subscription_type(id: u64, code: &str, status: i32) -> SubscriptionType {
    let now = Utc::now();
    SubscriptionType {
        id,
        type_code: code.to_string(),
        display_name: format!("{code} subscription"),
        status,
        created_at: now,
        updated_at: now,
    }
}

pub fn plan_type(id: u64, subscription_type_id: u64, duration_days: i32) -> PlanType {
    let now = Utc::now();
    PlanType {
        id,
        subscription_type_id,
        plan_code: "standard".to_string(),
        display_name: "Standard plan".to_string(),
        description: String::new(),
        price_cents: 990,
        currency: "EUR".to_string(),
        duration_days,
        features: String::new(),
        created_at: now,
        updated_at: now,
    }
}

/// A bare subscription row for direct seeding
pub fn subscription(id: u64, subscription_type_id: u64, user_id: &str) -> Subscription {
    let now = Utc::now();
    Subscription {
        id,
        subscription_type_id,
        user_id: Some(user_id.to_string()),
        email: None,
        status: SubscriptionStatus::Active,
        start_at: None,
        end_at: None,
        renew_at: None,
        auto_renew: false,
        created_at: now,
        updated_at: now,
    }
}

/// Assert two instants are within a second of each other
pub fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>) {
    let delta = (actual - expected).num_seconds().abs();
    assert!(
        delta <= 1,
        "expected {expected}, got {actual} ({delta}s apart)"
    );
}

pub fn minutes(n: i64) -> Duration {
    Duration::minutes(n)
}

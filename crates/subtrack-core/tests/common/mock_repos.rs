//! Mock repositories and a scriptable payment provider for engine tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use subtrack_core::{PaymentOutcome, PaymentProvider};
use subtrack_db::{
    DbError, DbResult, PlanTypeRepository, SubscriptionRepository, SubscriptionTypeRepository,
};
use subtrack_types::{PlanType, Subscription, SubscriptionStatus, SubscriptionType};

/// In-memory subscription repository
#[derive(Default)]
pub struct MockSubscriptionRepository {
    rows: DashMap<u64, Subscription>,
    next_id: AtomicU64,
    fail_next_update: AtomicBool,
    fail_lists: AtomicBool,
    miss_next_identity_lookup: AtomicBool,
}

impl MockSubscriptionRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
            fail_next_update: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            miss_next_identity_lookup: AtomicBool::new(false),
        }
    }

    /// Insert a row as-is, keeping its id
    pub fn insert(&self, subscription: Subscription) {
        let floor = subscription.id + 1;
        self.next_id.fetch_max(floor, Ordering::SeqCst);
        self.rows.insert(subscription.id, subscription);
    }

    pub fn get(&self, id: u64) -> Option<Subscription> {
        self.rows.get(&id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Make the next `update` call fail with a storage error
    pub fn fail_next_update(&self) {
        self.fail_next_update.store(true, Ordering::SeqCst);
    }

    /// Make every list scan fail with a storage error
    pub fn fail_lists(&self) {
        self.fail_lists.store(true, Ordering::SeqCst);
    }

    /// Make the next identity lookup miss, simulating a create racing an
    /// insert that committed between lookup and insert
    pub fn miss_next_identity_lookup(&self) {
        self.miss_next_identity_lookup.store(true, Ordering::SeqCst);
    }

    fn list_check(&self) -> DbResult<()> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(DbError::Connection("injected list failure".to_string()));
        }
        Ok(())
    }

    fn sorted<F>(&self, mut keep: F, ascending: bool) -> Vec<Subscription>
    where
        F: FnMut(&Subscription) -> bool,
    {
        let mut items: Vec<Subscription> = self
            .rows
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|s| s.id);
        if !ascending {
            items.reverse();
        }
        items
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> DbResult<u64> {
        let duplicate = self.rows.iter().any(|entry| {
            let row = entry.value();
            row.subscription_type_id == subscription.subscription_type_id
                && row.user_id == subscription.user_id
                && row.email == subscription.email
        });
        if duplicate {
            return Err(DbError::DuplicateKey(
                "uq_subscriptions_type_identity".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut row = subscription.clone();
        row.id = id;
        self.rows.insert(id, row);
        Ok(id)
    }

    async fn update(&self, subscription: &Subscription) -> DbResult<()> {
        if self.fail_next_update.swap(false, Ordering::SeqCst) {
            return Err(DbError::Connection("injected update failure".to_string()));
        }
        if !self.rows.contains_key(&subscription.id) {
            return Err(DbError::NotFound);
        }
        self.rows.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: u64) -> DbResult<Option<Subscription>> {
        Ok(self.get(id))
    }

    async fn find_by_type_and_identity(
        &self,
        subscription_type_id: u64,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Option<Subscription>> {
        if self.miss_next_identity_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .rows
            .iter()
            .find(|entry| {
                let row = entry.value();
                row.subscription_type_id == subscription_type_id
                    && row.user_id.as_deref() == user_id
                    && row.email.as_deref() == email
            })
            .map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Vec<Subscription>> {
        self.list_check()?;
        Ok(self.sorted(
            |row| {
                user_id.is_none_or(|u| row.user_id.as_deref() == Some(u))
                    && email.is_none_or(|e| row.email.as_deref() == Some(e))
            },
            false,
        ))
    }

    async fn list_due_auto_renew(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>> {
        self.list_check()?;
        Ok(self.sorted(
            |row| {
                row.auto_renew
                    && row.status == SubscriptionStatus::Active
                    && row.renew_at.is_some_and(|renew_at| renew_at <= now)
            },
            true,
        ))
    }

    async fn list_pending_payment_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<Subscription>> {
        self.list_check()?;
        Ok(self.sorted(
            |row| row.status == SubscriptionStatus::PendingPayment && row.updated_at < cutoff,
            true,
        ))
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>> {
        self.list_check()?;
        Ok(self.sorted(
            |row| {
                row.status == SubscriptionStatus::Active
                    && row.end_at.is_some_and(|end_at| end_at < now)
            },
            true,
        ))
    }
}

/// In-memory subscription type repository
#[derive(Default)]
pub struct MockSubscriptionTypeRepository {
    rows: DashMap<u64, SubscriptionType>,
}

impl MockSubscriptionTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: SubscriptionType) {
        self.rows.insert(item.id, item);
    }
}

#[async_trait]
impl SubscriptionTypeRepository for MockSubscriptionTypeRepository {
    async fn list(
        &self,
        type_code: Option<&str>,
        status: Option<i32>,
    ) -> DbResult<Vec<SubscriptionType>> {
        let mut items: Vec<SubscriptionType> = self
            .rows
            .iter()
            .filter(|entry| {
                let row = entry.value();
                type_code.is_none_or(|code| row.type_code == code)
                    && status.is_none_or(|status| row.status == status)
            })
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|t| t.id);
        Ok(items)
    }

    async fn find_by_id(&self, id: u64) -> DbResult<Option<SubscriptionType>> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }
}

/// In-memory plan type repository, keyed by subscription type
#[derive(Default)]
pub struct MockPlanTypeRepository {
    rows: DashMap<u64, PlanType>,
}

impl MockPlanTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, plan: PlanType) {
        self.rows.insert(plan.subscription_type_id, plan);
    }

    pub fn remove(&self, subscription_type_id: u64) {
        self.rows.remove(&subscription_type_id);
    }
}

#[async_trait]
impl PlanTypeRepository for MockPlanTypeRepository {
    async fn find_by_subscription_type_id(
        &self,
        subscription_type_id: u64,
    ) -> DbResult<Option<PlanType>> {
        Ok(self
            .rows
            .get(&subscription_type_id)
            .map(|r| r.value().clone()))
    }
}

/// One step of a scripted payment provider
pub enum ScriptedPayment {
    Outcome(PaymentOutcome),
    Panic(&'static str),
}

/// Payment provider that replays a script of outcomes, then panics.
///
/// The trailing panic mirrors the production stub; a test that runs off the
/// end of its script surfaces as a payment crash rather than a silent pass.
pub struct MockPaymentProvider {
    script: Mutex<VecDeque<ScriptedPayment>>,
    calls: Arc<AtomicUsize>,
}

impl MockPaymentProvider {
    pub fn scripted(steps: Vec<ScriptedPayment>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn succeeding() -> Self {
        Self::scripted(vec![ScriptedPayment::Outcome(PaymentOutcome::Success)])
    }

    pub fn redirecting(url: &str) -> Self {
        Self::scripted(vec![ScriptedPayment::Outcome(PaymentOutcome::Redirect {
            url: url.to_string(),
        })])
    }

    pub fn failing(reason: &str) -> Self {
        Self::scripted(vec![ScriptedPayment::Outcome(PaymentOutcome::Failure {
            reason: reason.to_string(),
        })])
    }

    pub fn panicking() -> Self {
        Self::scripted(vec![ScriptedPayment::Panic("payment provider exploded")])
    }

    /// Provider for tests that must not touch payments at all
    pub fn unreachable() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn process_subscription_payment(
        &self,
        _subscription_id: u64,
        _plan_type_id: u64,
        _user_id: Option<&str>,
        _email: Option<&str>,
    ) -> PaymentOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(ScriptedPayment::Outcome(outcome)) => outcome,
            Some(ScriptedPayment::Panic(message)) => panic!("{message}"),
            None => panic!("unexpected payment call"),
        }
    }
}

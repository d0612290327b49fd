//! Create-path behavior: email vs plan subscriptions, payment outcome
//! interpretation, and the two-phase persistence contract.

mod common;

use chrono::{TimeZone, Utc};

use common::mock_repos::MockPaymentProvider;
use common::{assert_close, Harness};
use subtrack_core::{CreateSubscriptionInput, EngineError};
use subtrack_types::SubscriptionStatus;

fn create_input(type_id: u64, user_id: &str) -> CreateSubscriptionInput {
    CreateSubscriptionInput {
        subscription_type_id: type_id,
        user_id: Some(user_id.to_string()),
        email: None,
        start_at: None,
        auto_renew: false,
    }
}

#[tokio::test]
async fn email_subscription_activates_immediately() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let outcome = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            subscription_type_id: 1,
            user_id: Some("u1".to_string()),
            email: Some("u1@ex.com".to_string()),
            start_at: None,
            auto_renew: false,
        })
        .await
        .unwrap();

    let sub = &outcome.subscription;
    assert!(sub.id > 0);
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert!(!sub.auto_renew);
    assert!(sub.start_at.is_none());
    assert!(sub.end_at.is_none());
    assert!(sub.renew_at.is_none());
    assert!(outcome.payment_url.is_none());
    assert_eq!(h.payment.calls(), 0);

    // the stored row matches the response
    let stored = h.stored(sub.id);
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(stored.user_id.as_deref(), Some("u1"));
    assert_eq!(stored.email.as_deref(), Some("u1@ex.com"));
}

#[tokio::test]
async fn email_subscription_never_auto_renews() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let outcome = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            auto_renew: true,
            ..create_input(1, "u1")
        })
        .await
        .unwrap();

    assert!(!outcome.subscription.auto_renew);
    assert!(outcome.subscription.renew_at.is_none());
}

#[tokio::test]
async fn plan_redirect_goes_pending_payment() {
    let h = Harness::new(MockPaymentProvider::redirecting("https://pay/x"));
    h.seed_plan_type(2, 30);

    let outcome = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            subscription_type_id: 2,
            user_id: Some("u2".to_string()),
            email: None,
            start_at: Some("2026-01-01T00:00:00Z".to_string()),
            auto_renew: true,
        })
        .await
        .unwrap();

    let sub = &outcome.subscription;
    assert_eq!(sub.status, SubscriptionStatus::PendingPayment);
    assert_eq!(outcome.payment_url.as_deref(), Some("https://pay/x"));
    assert_eq!(
        sub.start_at,
        Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(
        sub.end_at,
        Some(Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap())
    );
    // default RenewBeforeEnd is one day
    assert_eq!(
        sub.renew_at,
        Some(Utc.with_ymd_and_hms(2026, 1, 30, 0, 0, 0).unwrap())
    );
    assert!(sub.auto_renew);
}

#[tokio::test]
async fn plan_payment_success_activates() {
    let h = Harness::new(MockPaymentProvider::succeeding());
    h.seed_plan_type(2, 30);

    let outcome = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            start_at: Some("2026-01-01T00:00:00Z".to_string()),
            ..create_input(2, "u2")
        })
        .await
        .unwrap();

    assert_eq!(outcome.subscription.status, SubscriptionStatus::Active);
    assert!(outcome.payment_url.is_none());
    assert_eq!(h.payment.calls(), 1);
}

#[tokio::test]
async fn plan_payment_failure_schedules_retry() {
    let h = Harness::new(MockPaymentProvider::failing("card declined"));
    h.seed_plan_type(2, 30);

    let outcome = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            start_at: Some("2026-01-01T00:00:00Z".to_string()),
            ..create_input(2, "u2")
        })
        .await
        .unwrap();

    let sub = &outcome.subscription;
    assert_eq!(sub.status, SubscriptionStatus::Processing);
    let renew_at = sub.renew_at.expect("retry must be scheduled");
    assert_close(renew_at, Utc::now() + h.cfg.renewal_retry_interval);
}

#[tokio::test]
async fn plan_payment_crash_surfaces_internal_error_but_persists_row() {
    let h = Harness::new(MockPaymentProvider::panicking());
    h.seed_plan_type(2, 30);

    let err = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            start_at: Some("2026-01-01T00:00:00Z".to_string()),
            ..create_input(2, "u2")
        })
        .await
        .unwrap_err();

    match &err {
        EngineError::PaymentProcessing(reason) => {
            assert!(reason.contains("payment provider exploded"));
        }
        other => panic!("expected PaymentProcessing, got {other:?}"),
    }

    // The first write survived, and a retry is scheduled so the renewal
    // batch reclaims the row.
    assert_eq!(h.subscriptions.len(), 1);
    let stored = h.stored(1);
    assert_eq!(stored.status, SubscriptionStatus::Processing);
    let renew_at = stored.renew_at.expect("retry must be scheduled");
    assert_close(renew_at, Utc::now() + h.cfg.renewal_retry_interval);
}

#[tokio::test]
async fn create_requires_some_identity() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let err = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            subscription_type_id: 1,
            user_id: Some("   ".to_string()),
            email: Some(String::new()),
            start_at: None,
            auto_renew: false,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
    assert_eq!(h.subscriptions.len(), 0);
}

#[tokio::test]
async fn create_rejects_unknown_type() {
    let h = Harness::new(MockPaymentProvider::unreachable());

    let err = h
        .engine
        .create_subscription(create_input(9, "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::SubscriptionTypeNotFound));
}

#[tokio::test]
async fn create_rejects_disabled_type() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.subscription_types
        .insert(common::subscription_type(1, "email", 0));

    let err = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::SubscriptionTypeNotFound));
}

#[tokio::test]
async fn plan_create_requires_start_at() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_plan_type(2, 30);

    let err = h
        .engine
        .create_subscription(create_input(2, "u2"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::StartAtRequired));
    assert_eq!(h.payment.calls(), 0);
}

#[tokio::test]
async fn plan_create_rejects_malformed_start_at() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_plan_type(2, 30);

    let err = h
        .engine
        .create_subscription(CreateSubscriptionInput {
            start_at: Some("January 1st".to_string()),
            ..create_input(2, "u2")
        })
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn double_create_updates_in_place() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let first = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap();
    let second = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap();

    assert_eq!(first.subscription.id, second.subscription.id);
    assert_eq!(h.subscriptions.len(), 1);
}

#[tokio::test]
async fn identity_is_trimmed_before_matching() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let first = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap();
    let second = h
        .engine
        .create_subscription(create_input(1, "  u1  "))
        .await
        .unwrap();

    assert_eq!(first.subscription.id, second.subscription.id);
    assert_eq!(second.subscription.user_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn create_revives_an_inactive_row() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    let first = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap();
    let id = first.subscription.id;

    h.engine.delete_subscription(id).await.unwrap();
    assert_eq!(h.stored(id).status, SubscriptionStatus::Inactive);

    let revived = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap();
    assert_eq!(revived.subscription.id, id);
    assert_eq!(revived.subscription.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn duplicate_key_race_maps_to_already_exists() {
    let h = Harness::new(MockPaymentProvider::unreachable());
    h.seed_email_type(1);

    // A concurrent create committed the same (type, identity) between this
    // call's identity lookup and its insert; the unique index catches it.
    h.subscriptions.insert(common::subscription(7, 1, "u1"));
    h.subscriptions.miss_next_identity_lookup();

    let err = h
        .engine
        .create_subscription(create_input(1, "u1"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::SubscriptionAlreadyExists));
    assert_eq!(h.subscriptions.len(), 1);
}

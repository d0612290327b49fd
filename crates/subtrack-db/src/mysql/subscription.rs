//! MySQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, QueryBuilder};

use subtrack_types::{Subscription, SubscriptionStatus};

use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;
use crate::repo::SubscriptionRepository;

/// MySQL subscription repository
#[derive(Clone)]
pub struct MySqlSubscriptionRepository {
    pool: MySqlPool,
}

impl MySqlSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn rows_to_domain(rows: Vec<SubscriptionRow>) -> DbResult<Vec<Subscription>> {
    rows.into_iter().map(SubscriptionRow::into_domain).collect()
}

#[async_trait]
impl SubscriptionRepository for MySqlSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                subscription_type_id, user_id, email, status,
                start_at, end_at, renew_at, auto_renew,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(subscription.subscription_type_id)
        .bind(subscription.user_id.as_deref())
        .bind(subscription.email.as_deref())
        .bind(subscription.status.code())
        .bind(subscription.start_at)
        .bind(subscription.end_at)
        .bind(subscription.renew_at)
        .bind(subscription.auto_renew)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn update(&self, subscription: &Subscription) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = ?, start_at = ?, end_at = ?, renew_at = ?,
                auto_renew = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(subscription.status.code())
        .bind(subscription.start_at)
        .bind(subscription.end_at)
        .bind(subscription.renew_at)
        .bind(subscription.auto_renew)
        .bind(subscription.updated_at)
        .bind(subscription.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn find_by_id(&self, id: u64) -> DbResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, subscription_type_id, user_id, email, status,
                   start_at, end_at, renew_at, auto_renew,
                   created_at, updated_at
            FROM subscriptions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubscriptionRow::into_domain).transpose()
    }

    async fn find_by_type_and_identity(
        &self,
        subscription_type_id: u64,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Option<Subscription>> {
        // <=> is MySQL's NULL-safe equality: an absent identity half matches
        // only rows where that column is NULL.
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, subscription_type_id, user_id, email, status,
                   start_at, end_at, renew_at, auto_renew,
                   created_at, updated_at
            FROM subscriptions
            WHERE subscription_type_id = ?
              AND user_id <=> ?
              AND email <=> ?
            LIMIT 1
            "#,
        )
        .bind(subscription_type_id)
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SubscriptionRow::into_domain).transpose()
    }

    async fn list(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> DbResult<Vec<Subscription>> {
        let mut builder: QueryBuilder<sqlx::MySql> = QueryBuilder::new(
            "SELECT id, subscription_type_id, user_id, email, status, \
             start_at, end_at, renew_at, auto_renew, created_at, updated_at \
             FROM subscriptions",
        );

        let mut prefix = " WHERE ";
        if let Some(user_id) = user_id {
            builder.push(prefix).push("user_id = ").push_bind(user_id);
            prefix = " AND ";
        }
        if let Some(email) = email {
            builder.push(prefix).push("email = ").push_bind(email);
        }
        builder.push(" ORDER BY id DESC");

        let rows = builder
            .build_query_as::<SubscriptionRow>()
            .fetch_all(&self.pool)
            .await?;

        rows_to_domain(rows)
    }

    async fn list_due_auto_renew(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, subscription_type_id, user_id, email, status,
                   start_at, end_at, renew_at, auto_renew,
                   created_at, updated_at
            FROM subscriptions
            WHERE auto_renew = 1
              AND renew_at <= ?
              AND status = ?
            ORDER BY id ASC
            "#,
        )
        .bind(now)
        .bind(SubscriptionStatus::Active.code())
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    async fn list_pending_payment_stale(
        &self,
        cutoff: DateTime<Utc>,
    ) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, subscription_type_id, user_id, email, status,
                   start_at, end_at, renew_at, auto_renew,
                   created_at, updated_at
            FROM subscriptions
            WHERE status = ?
              AND updated_at < ?
            ORDER BY id ASC
            "#,
        )
        .bind(SubscriptionStatus::PendingPayment.code())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, subscription_type_id, user_id, email, status,
                   start_at, end_at, renew_at, auto_renew,
                   created_at, updated_at
            FROM subscriptions
            WHERE status = ?
              AND end_at IS NOT NULL
              AND end_at < ?
            ORDER BY id ASC
            "#,
        )
        .bind(SubscriptionStatus::Active.code())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows_to_domain(rows)
    }
}

//! MySQL subscription type repository implementation

use async_trait::async_trait;
use sqlx::{MySqlPool, QueryBuilder};

use subtrack_types::SubscriptionType;

use crate::error::DbResult;
use crate::models::SubscriptionTypeRow;
use crate::repo::SubscriptionTypeRepository;

/// MySQL subscription type repository
#[derive(Clone)]
pub struct MySqlSubscriptionTypeRepository {
    pool: MySqlPool,
}

impl MySqlSubscriptionTypeRepository {
    /// Create a new subscription type repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionTypeRepository for MySqlSubscriptionTypeRepository {
    async fn list(
        &self,
        type_code: Option<&str>,
        status: Option<i32>,
    ) -> DbResult<Vec<SubscriptionType>> {
        let mut builder: QueryBuilder<sqlx::MySql> = QueryBuilder::new(
            "SELECT id, type_code, display_name, status, created_at, updated_at \
             FROM subscription_types",
        );

        let mut prefix = " WHERE ";
        if let Some(type_code) = type_code {
            builder
                .push(prefix)
                .push("type_code = ")
                .push_bind(type_code);
            prefix = " AND ";
        }
        if let Some(status) = status {
            builder.push(prefix).push("status = ").push_bind(status);
        }
        builder.push(" ORDER BY id ASC");

        let rows = builder
            .build_query_as::<SubscriptionTypeRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SubscriptionType::from).collect())
    }

    async fn find_by_id(&self, id: u64) -> DbResult<Option<SubscriptionType>> {
        let row = sqlx::query_as::<_, SubscriptionTypeRow>(
            r#"
            SELECT id, type_code, display_name, status, created_at, updated_at
            FROM subscription_types
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SubscriptionType::from))
    }
}

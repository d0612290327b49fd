//! MySQL plan type repository implementation

use async_trait::async_trait;
use sqlx::MySqlPool;

use subtrack_types::PlanType;

use crate::error::DbResult;
use crate::models::PlanTypeRow;
use crate::repo::PlanTypeRepository;

/// MySQL plan type repository
#[derive(Clone)]
pub struct MySqlPlanTypeRepository {
    pool: MySqlPool,
}

impl MySqlPlanTypeRepository {
    /// Create a new plan type repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanTypeRepository for MySqlPlanTypeRepository {
    async fn find_by_subscription_type_id(
        &self,
        subscription_type_id: u64,
    ) -> DbResult<Option<PlanType>> {
        let row = sqlx::query_as::<_, PlanTypeRow>(
            r#"
            SELECT id, subscription_type_id, plan_code, display_name, description,
                   price_cents, currency, duration_days, features,
                   created_at, updated_at
            FROM plan_types
            WHERE subscription_type_id = ?
            LIMIT 1
            "#,
        )
        .bind(subscription_type_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PlanType::from))
    }
}

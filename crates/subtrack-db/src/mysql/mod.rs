//! MySQL repository implementations

mod plan_type;
mod subscription;
mod subscription_type;

pub use plan_type::MySqlPlanTypeRepository;
pub use subscription::MySqlSubscriptionRepository;
pub use subscription_type::MySqlSubscriptionTypeRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub subscriptions: MySqlSubscriptionRepository,
    pub subscription_types: MySqlSubscriptionTypeRepository,
    pub plan_types: MySqlPlanTypeRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscriptions: MySqlSubscriptionRepository::new(pool.clone()),
            subscription_types: MySqlSubscriptionTypeRepository::new(pool.clone()),
            plan_types: MySqlPlanTypeRepository::new(pool),
        }
    }
}

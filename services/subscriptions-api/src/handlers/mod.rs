//! HTTP request handlers

mod health;
mod shared;
mod subscription_types;
mod subscriptions;
mod webhook;

pub use health::health;
pub use subscription_types::list_subscription_types;
pub use subscriptions::{
    cancel_subscription, create_subscription, delete_subscription, get_subscription,
    list_subscriptions, update_subscription,
};
pub use webhook::payment_callback;

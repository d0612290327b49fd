//! Subtrack Types - Shared domain types
//!
//! This crate contains domain types used across the subscriptions service:
//! - Subscription type catalog entries and their plan types
//! - The subscription record and its status machine

pub mod plan_type;
pub mod subscription;
pub mod subscription_type;

pub use plan_type::*;
pub use subscription::*;
pub use subscription_type::*;

//! Subtrack DB - Database abstractions
//!
//! SQLx-based MySQL persistence layer: repository traits consumed by the
//! engine and their MySQL implementations.

pub mod error;
pub mod models;
pub mod mysql;
pub mod pool;
pub mod repo;

pub use error::*;
pub use pool::*;
pub use repo::*;

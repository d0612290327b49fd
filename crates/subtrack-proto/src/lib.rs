//! Subtrack Proto - gRPC Protocol Buffers
//!
//! Generated code from Protocol Buffer definitions for the subscriptions
//! service and the internal auth service it authenticates against.

// Suppress clippy warnings from generated tonic code
#![allow(clippy::derive_partial_eq_without_eq)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::too_many_lines)]

/// Subtrack v1 API types and services.
pub mod subtrack {
    pub mod v1 {
        tonic::include_proto!("subtrack.v1");

        /// File descriptor set for gRPC reflection.
        pub const FILE_DESCRIPTOR_SET: &[u8] =
            tonic::include_file_descriptor_set!("subtrack_descriptor");
    }
}

// Re-export commonly used types at crate root for convenience
pub use subtrack::v1::*;

// Service module aliases for clearer imports
pub mod subscriptions_service {
    pub use super::subtrack::v1::subscriptions_service_client;
    pub use super::subtrack::v1::subscriptions_service_server;
}

pub mod auth_service {
    pub use super::subtrack::v1::auth_service_client;
    pub use super::subtrack::v1::auth_service_server;
}

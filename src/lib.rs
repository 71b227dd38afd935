//! Terraform provider for Tinkerbell.
//!
//! The provider manages three resource types on a Tinkerbell server:
//!
//! | Resource              | Service           | Updated in place |
//! |-----------------------|-------------------|------------------|
//! | `tinkerbell_template` | `TemplateService` | yes              |
//! | `tinkerbell_workflow` | `WorkflowService` | no               |
//! | `tinkerbell_hardware` | `HardwareService` | yes              |
//!
//! # Overview
//!
//! - **Host protocol**: [`ProviderService`] and [`serve`] expose the provider
//!   to its host over gRPC (`plugin.v1.Provider`)
//! - **Provider**: [`TinkerbellProvider`] dispatches lifecycle calls to the
//!   handlers in [`resources`]
//! - **Tinkerbell access**: [`client::ClientFactory`] connects once over TLS;
//!   the [`api`] traits wrap the generated clients in [`tink`]
//! - **Validation**: [`validation`] and [`definition`] check attribute values
//!   before any RPC is made
//! - **Retries**: [`retry::RetryPolicy`] retries serialization conflicts and
//!   transient failures
//! - **Logging**: `tracing` spans and events, written to stderr
//!
//! # Configuration
//!
//! ```hcl
//! provider "tinkerbell" {
//!   grpc_authority = "127.0.0.1:42113"
//!   cert_url       = "http://127.0.0.1:42114/cert"
//! }
//! ```
//!
//! Both settings fall back to `TINKERBELL_GRPC_AUTHORITY` and
//! `TINKERBELL_CERT_URL`.
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to
//! stdout:
//!
//! ```text
//! TINKERBELL_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `TINKERBELL_PROVIDER|<protocol_version>|<address>`
//!
//! # Provider Protocol
//!
//! - **GetMetadata**: Returns provider capabilities and resource names
//! - **GetSchema**: Returns the schema for the provider block and resources
//! - **ValidateProviderConfig**: Validates the provider block
//! - **Configure**: Records the connection settings
//! - **Stop**: Gracefully shuts down the provider
//! - **ValidateResourceConfig**: Runs the attribute validators
//! - **Plan**: Calculates required changes, including replacements
//! - **Create/Read/Update/Delete**: Resource lifecycle

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod definition;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod server;
pub mod testing;
pub mod tink;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use client::{ClientFactory, ProviderConfig, TinkClient};
pub use error::{ProviderError, ResultExt};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::TinkerbellProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, PlanResult, ProviderMetadata, ServerCapabilities, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};

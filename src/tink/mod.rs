//! Wire types and clients for the Tinkerbell gRPC services.
//!
//! The submodules are generated from `proto/tink/*.proto`; see `build.rs`.

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod hardware;
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod template;
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod workflow;

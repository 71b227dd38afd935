//! Error types for the Tinkerbell provider.

use thiserror::Error;

/// Errors that can occur while serving the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Fetching the CA certificate failed.
    #[error("Certificate error: {0}")]
    Certificate(#[from] reqwest::Error),

    /// The Tinkerbell service answered with a non-OK status.
    #[error("rpc error: code = {:?} desc = {}", .0.code(), .0.message())]
    Rpc(#[from] tonic::Status),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// An error annotated with what was being attempted.
    #[error("{context}: {source}")]
    Context {
        /// What the provider was doing when the error occurred.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Wrap this error with a description of the failed operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`ProviderError::Context`] layers.
    pub fn root(&self) -> &ProviderError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait adding [`context`](ResultExt::context) to fallible results.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with a description of the failed operation.
    fn context(self, context: impl Into<String>) -> Result<T, ProviderError>;

    /// Like [`context`](ResultExt::context), but builds the message lazily.
    fn with_context<F, S>(self, f: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ProviderError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, ProviderError> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().context(f()))
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            }
            ProviderError::Certificate(err) => {
                tonic::Status::unavailable(format!("Certificate error: {}", err))
            }
            ProviderError::Rpc(status) => status,
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            err @ ProviderError::Context { .. } => {
                let message = err.to_string();
                let code = tonic::Status::from(take_root(err)).code();
                tonic::Status::new(code, message)
            }
        }
    }
}

fn take_root(err: ProviderError) -> ProviderError {
    match err {
        ProviderError::Context { source, .. } => take_root(*source),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("template \"abc\"".to_string());
        assert_eq!(format!("{}", err), "Resource not found: template \"abc\"");

        let err = ProviderError::Validation("value must not be empty".to_string());
        assert_eq!(format!("{}", err), "Validation error: value must not be empty");

        let err = ProviderError::UnknownResource("tinkerbell_target".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: tinkerbell_target");
    }

    #[test]
    fn test_rpc_error_display() {
        let err = ProviderError::from(tonic::Status::unavailable("connection refused"));
        assert_eq!(
            format!("{}", err),
            "rpc error: code = Unavailable desc = connection refused"
        );
    }

    #[test]
    fn test_context_chain() {
        let err = ProviderError::from(tonic::Status::internal("boom"))
            .context("receiving template entry")
            .context("checking if template exists");

        assert_eq!(
            format!("{}", err),
            "checking if template exists: receiving template entry: rpc error: code = Internal desc = boom"
        );
        assert!(matches!(err.root(), ProviderError::Rpc(_)));

        let source = std::error::Error::source(&err).expect("context keeps its source");
        assert!(source.to_string().starts_with("receiving template entry"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), tonic::Status> = Err(tonic::Status::aborted("conflict"));
        let err = result.context("creating template").unwrap_err();
        assert!(err.to_string().starts_with("creating template: "));

        let result: Result<(), ProviderError> =
            Err(ProviderError::Configuration("missing authority".to_string()));
        let err = result
            .with_context(|| format!("creating {} client", "Tink"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "creating Tink client: Configuration error: missing authority"
        );
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::NotFound("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let err = ProviderError::Validation("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::Configuration("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::AlreadyExists("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);

        let err = ProviderError::Unimplemented("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);
    }

    #[test]
    fn test_context_to_status_keeps_root_code() {
        let err = ProviderError::AlreadyExists("hardware ID \"u\"".to_string())
            .context("creating hardware");
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);
        assert!(status.message().starts_with("creating hardware: "));
    }
}

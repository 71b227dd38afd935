//! Connection to the Tinkerbell service.
//!
//! [`ClientFactory`] resolves the connection settings, connects once and
//! shares the resulting [`TinkClient`] bundle between every lifecycle call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, info};

use crate::api::{HardwareApi, TemplateApi, WorkflowApi};
use crate::error::{ProviderError, ResultExt};
use crate::tink::hardware::hardware_service_client::HardwareServiceClient;
use crate::tink::template::template_service_client::TemplateServiceClient;
use crate::tink::workflow::workflow_service_client::WorkflowServiceClient;

/// Environment variable holding the service address (`host:port`).
pub const GRPC_AUTHORITY_ENV: &str = "TINKERBELL_GRPC_AUTHORITY";

/// Environment variable holding the URL of the CA certificate.
pub const CERT_URL_ENV: &str = "TINKERBELL_CERT_URL";

/// Default timeout for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// The provider block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Overrides `TINKERBELL_GRPC_AUTHORITY`.
    #[serde(default)]
    pub grpc_authority: Option<String>,
    /// Overrides `TINKERBELL_CERT_URL`.
    #[serde(default)]
    pub cert_url: Option<String>,
}

impl ProviderConfig {
    fn grpc_authority(&self) -> Option<&str> {
        non_empty(self.grpc_authority.as_deref())
    }

    fn cert_url(&self) -> Option<&str> {
        non_empty(self.cert_url.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Service address as `host:port`.
    pub grpc_authority: String,
    /// URL serving the PEM-encoded CA certificate.
    pub cert_url: String,
}

impl ConnectionConfig {
    /// Resolve the settings from the provider block and the process
    /// environment.
    ///
    /// Values set in the provider block win and are exported to the
    /// environment first, so anything reading the variables later sees the
    /// same settings.
    ///
    /// `set_var` races with concurrent environment reads on other runtime
    /// threads. The only caller is the [`ClientFactory`] connect-once
    /// initializer, which runs before the HTTP client and TLS stack exist.
    pub fn resolve(config: &ProviderConfig) -> Result<Self, ProviderError> {
        if let Some(authority) = config.grpc_authority() {
            std::env::set_var(GRPC_AUTHORITY_ENV, authority);
        }
        if let Some(cert_url) = config.cert_url() {
            std::env::set_var(CERT_URL_ENV, cert_url);
        }

        Self::resolve_with(config, |name| std::env::var(name).ok())
    }

    /// Resolve the settings using `lookup` as the environment.
    pub fn resolve_with<F>(config: &ProviderConfig, lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |explicit: Option<&str>, env: &str| {
            explicit
                .map(str::to_string)
                .or_else(|| lookup(env).filter(|v| !v.is_empty()))
                .ok_or_else(|| ProviderError::Configuration(format!("undefined {}", env)))
        };

        Ok(Self {
            grpc_authority: setting(config.grpc_authority(), GRPC_AUTHORITY_ENV)?,
            cert_url: setting(config.cert_url(), CERT_URL_ENV)?,
        })
    }

    /// Host part of the authority, used to verify the server certificate.
    pub fn server_name(&self) -> &str {
        let authority = self.grpc_authority.as_str();
        if let Some(rest) = authority.strip_prefix('[') {
            return rest.split(']').next().unwrap_or(rest);
        }
        match authority.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
            _ => authority,
        }
    }
}

/// Handles to the three Tinkerbell services.
#[derive(Clone)]
pub struct TinkClient {
    /// Template service.
    pub templates: Arc<dyn TemplateApi>,
    /// Workflow service.
    pub workflows: Arc<dyn WorkflowApi>,
    /// Hardware service.
    pub hardware: Arc<dyn HardwareApi>,
}

impl TinkClient {
    /// Bundle existing service handles.
    pub fn new(
        templates: Arc<dyn TemplateApi>,
        workflows: Arc<dyn WorkflowApi>,
        hardware: Arc<dyn HardwareApi>,
    ) -> Self {
        Self {
            templates,
            workflows,
            hardware,
        }
    }

    /// Build all three clients on one channel.
    pub fn from_channel(channel: Channel) -> Self {
        Self::new(
            Arc::new(TemplateServiceClient::new(channel.clone())),
            Arc::new(WorkflowServiceClient::new(channel.clone())),
            Arc::new(HardwareServiceClient::new(channel)),
        )
    }
}

impl std::fmt::Debug for TinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinkClient").finish_non_exhaustive()
    }
}

/// Opens a connection for resolved settings.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and build the client bundle.
    async fn connect(&self, config: &ConnectionConfig) -> Result<TinkClient, ProviderError>;
}

/// Connects over TLS, trusting the CA certificate served at `cert_url`.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    connect_timeout: Duration,
}

impl GrpcConnector {
    /// Create a connector with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn fetch_certificate(&self, url: &str) -> Result<Certificate, ProviderError> {
        debug!(url, "fetching CA certificate");
        let http = reqwest::Client::builder()
            .timeout(self.connect_timeout)
            .build()?;
        let pem = http.get(url).send().await?.error_for_status()?.bytes().await?;
        Ok(Certificate::from_pem(pem))
    }
}

impl Default for GrpcConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<TinkClient, ProviderError> {
        let certificate = self
            .fetch_certificate(&config.cert_url)
            .await
            .with_context(|| format!("fetching certificate from {}", config.cert_url))?;

        let tls = ClientTlsConfig::new()
            .ca_certificate(certificate)
            .domain_name(config.server_name());

        let channel = Endpoint::from_shared(format!("https://{}", config.grpc_authority))?
            .tls_config(tls)?
            .connect_timeout(self.connect_timeout)
            .connect()
            .await
            .with_context(|| format!("connecting to {}", config.grpc_authority))?;

        Ok(TinkClient::from_channel(channel))
    }
}

/// Connects on first use and hands out the shared client bundle.
pub struct ClientFactory {
    config: ProviderConfig,
    connector: Arc<dyn Connector>,
    client: OnceCell<Arc<TinkClient>>,
}

impl ClientFactory {
    /// Create a factory that connects with `connector` when first asked.
    pub fn new(config: ProviderConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            client: OnceCell::new(),
        }
    }

    /// Create a factory around an already built bundle.
    pub fn with_client(client: TinkClient) -> Self {
        Self {
            config: ProviderConfig::default(),
            connector: Arc::new(GrpcConnector::default()),
            client: OnceCell::new_with(Some(Arc::new(client))),
        }
    }

    /// The shared client bundle, connecting if this is the first call.
    ///
    /// Concurrent first callers wait for a single connection attempt. A
    /// failed attempt is not cached.
    pub async fn client(&self) -> Result<Arc<TinkClient>, ProviderError> {
        self.client
            .get_or_try_init(|| async {
                let connection = ConnectionConfig::resolve(&self.config)?;
                info!(authority = %connection.grpc_authority, "connecting to Tinkerbell");
                let client = self.connector.connect(&connection).await?;
                Ok::<_, ProviderError>(Arc::new(client))
            })
            .await
            .map(Arc::clone)
            .context("creating Tink client")
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}

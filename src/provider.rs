//! The Tinkerbell provider.
//!
//! [`TinkerbellProvider`] implements [`ProviderService`] by dispatching each
//! lifecycle call to the [`Resource`] handler registered for the type.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::{ClientFactory, Connector, GrpcConnector, ProviderConfig, TinkClient};
use crate::error::ProviderError;
use crate::plan::{mark_replacement, plan};
use crate::resources::{self, Resource, ResourceData};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::PlanResult;
use crate::validation::validate;

/// Provider managing Tinkerbell templates, workflows and hardware.
pub struct TinkerbellProvider {
    connector: Arc<dyn Connector>,
    factory: RwLock<Option<Arc<ClientFactory>>>,
    resources: Vec<Box<dyn Resource>>,
}

impl TinkerbellProvider {
    /// Provider connecting to Tinkerbell over TLS once configured.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(GrpcConnector::default()))
    }

    /// Provider connecting through `connector` once configured.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            factory: RwLock::new(None),
            resources: resources::all(),
        }
    }

    /// Provider already connected to `client`. Configuring it keeps the
    /// connection.
    pub fn with_client(client: TinkClient) -> Self {
        let provider = Self::new();
        Self {
            factory: RwLock::new(Some(Arc::new(ClientFactory::with_client(client)))),
            ..provider
        }
    }

    fn provider_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "grpc_authority",
                Attribute::optional_string()
                    .with_description("Equivalent of TINKERBELL_GRPC_AUTHORITY environment variable."),
            )
            .with_attribute(
                "cert_url",
                Attribute::optional_string()
                    .with_description("Equivalent of TINKERBELL_CERT_URL environment variable."),
            )
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .iter()
            .find(|r| r.type_name() == resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn client(&self) -> Result<Arc<TinkClient>, ProviderError> {
        let factory = self.factory.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })?;
        factory.client().await
    }

    /// Reject a state whose attributes fail validation.
    fn check(resource: &dyn Resource, state: &Value) -> Result<(), ProviderError> {
        let problems: Vec<String> = validate(&resource.schema(), state)
            .into_iter()
            .filter(Diagnostic::is_error)
            .map(|d| match d.detail {
                Some(detail) => format!("{}: {}", d.summary, detail),
                None => d.summary,
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(problems.join("; ")))
        }
    }
}

impl Default for TinkerbellProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TinkerbellProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TinkerbellProvider")
            .field(
                "resources",
                &self.resources.iter().map(|r| r.type_name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProviderService for TinkerbellProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources.iter().fold(
            ProviderSchema::new().with_provider_config(Self::provider_schema()),
            |schema, resource| schema.with_resource(resource.type_name(), resource.schema()),
        )
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&Self::provider_schema(), &config);
        if let Err(e) = serde_json::from_value::<Option<ProviderConfig>>(config) {
            diagnostics.push(Diagnostic::error("Invalid provider configuration").with_detail(e.to_string()));
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config: ProviderConfig =
            serde_json::from_value::<Option<ProviderConfig>>(config)?.unwrap_or_default();

        let mut factory = self.factory.write().await;
        if factory.as_ref().is_some_and(|f| f.is_connected()) {
            debug!("already connected, keeping the existing client");
            return Ok(vec![]);
        }

        info!(
            grpc_authority = config.grpc_authority.as_deref().unwrap_or("<env>"),
            "provider configured"
        );
        *factory = Some(Arc::new(ClientFactory::new(config, Arc::clone(&self.connector))));
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate(&resource.schema(), &config))
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let result = plan(&resource.schema(), prior_state.as_ref(), &proposed_state);

        let prior = match prior_state {
            Some(prior) if !prior.is_null() && !result.planned_state.is_null() => prior,
            _ => return Ok(result),
        };
        if result.requires_replace {
            return Ok(result);
        }

        let prior = ResourceData::from_state(prior)?;
        let planned = ResourceData::from_state(result.planned_state.clone())?;
        if resource.requires_replacement(&prior, &planned) {
            debug!(resource_type, "identity changed, planning replacement");
            Ok(mark_replacement(result))
        } else {
            Ok(result)
        }
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        Self::check(resource, &planned_state)?;

        let client = self.client().await?;
        let mut data = ResourceData::from_state(planned_state)?;
        resource.create(&client, &mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(Value::Null);
        }

        let client = self.client().await?;
        let mut data = ResourceData::from_state(current_state)?;
        resource.read(&client, &mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        Self::check(resource, &planned_state)?;

        let client = self.client().await?;
        let mut data = ResourceData::from_state(planned_state)?;
        if data.id().is_none() {
            if let Some(id) = ResourceData::from_state(prior_state)?.id() {
                data.set_id(id);
            }
        }
        resource.update(&client, &mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        if current_state.is_null() {
            return Ok(());
        }

        let client = self.client().await?;
        let mut data = ResourceData::from_state(current_state)?;
        resource.delete(&client, &mut data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        assert_error_contains, assert_no_errors, assert_plan_no_changes, assert_plan_replaces,
        FakeTinkerbell,
    };
    use crate::tink::hardware::Hardware;
    use serde_json::json;

    #[test]
    fn test_schema_lists_resources() {
        let schema = TinkerbellProvider::new().schema();
        assert_eq!(schema.resources.len(), 3);
        assert!(schema.resources.contains_key("tinkerbell_hardware"));
        assert!(schema.provider.attribute("grpc_authority").is_some());
        assert!(schema.provider.attribute("cert_url").is_some());
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let provider = TinkerbellProvider::new();
        let err = provider
            .read("tinkerbell_template", json!({"id": "t", "name": "n", "content": "c"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let provider = TinkerbellProvider::with_client(FakeTinkerbell::new().client());
        let err = provider
            .validate_resource_config("tinkerbell_target", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        assert_eq!(err.to_string(), "Unknown resource type: tinkerbell_target");
    }

    #[tokio::test]
    async fn test_validate_provider_config() {
        let provider = TinkerbellProvider::new();
        let diagnostics = provider
            .validate_provider_config(json!({"grpc_authority": "tink.example:42113"}))
            .await
            .unwrap();
        assert_no_errors(&diagnostics);

        let diagnostics = provider
            .validate_provider_config(json!({"cert_url": 8080}))
            .await
            .unwrap();
        assert_error_contains(&diagnostics, "cert_url");
    }

    #[tokio::test]
    async fn test_configure_keeps_connected_client() {
        let fake = FakeTinkerbell::new();
        fake.add_hardware(Hardware {
            id: "u".to_string(),
            ..Default::default()
        });
        let provider = TinkerbellProvider::with_client(fake.client());
        provider.configure(Value::Null).await.unwrap();

        provider
            .delete("tinkerbell_hardware", json!({"id": "u", "data": "{\"id\":\"u\"}"}))
            .await
            .unwrap();
        assert!(fake.hardware().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_template_never_reaches_service() {
        let fake = FakeTinkerbell::new();
        let provider = TinkerbellProvider::with_client(fake.client());

        let err = provider
            .create("tinkerbell_template", json!({"id": null, "name": "t", "content": "tasks: ["}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("parsing template"));
        assert_eq!(fake.calls("create_template"), 0);
    }

    #[tokio::test]
    async fn test_plan_equivalent_hardware_json() {
        let provider = TinkerbellProvider::with_client(FakeTinkerbell::new().client());
        let prior = json!({"id": "u", "data": r#"{"id":"u","metadata":{"a":1}}"#});
        let proposed = json!({"id": null, "data": r#"{ "metadata": { "a": 1 }, "id": "u" }"#});

        let result = provider
            .plan("tinkerbell_hardware", Some(prior), proposed, Value::Null)
            .await
            .unwrap();
        assert_plan_no_changes(&result);
    }

    #[tokio::test]
    async fn test_plan_hardware_id_change_replaces() {
        let provider = TinkerbellProvider::with_client(FakeTinkerbell::new().client());
        let prior = json!({"id": "u", "data": r#"{"id":"u"}"#});
        let proposed = json!({"id": null, "data": r#"{"id":"v"}"#});

        let result = provider
            .plan("tinkerbell_hardware", Some(prior), proposed, Value::Null)
            .await
            .unwrap();
        assert_plan_replaces(&result);
        assert_eq!(result.planned_state["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_gone_resource_returns_null() {
        let fake = FakeTinkerbell::new();
        let provider = TinkerbellProvider::with_client(fake.client());

        let state = provider
            .read("tinkerbell_workflow", json!({"id": "wf", "template": "t", "hardwares": "{}"}))
            .await
            .unwrap();
        assert_eq!(state, Value::Null);
    }
}

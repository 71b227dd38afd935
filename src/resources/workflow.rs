//! `tinkerbell_workflow`: a template instantiated against hardware.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{Resource, ResourceData, ID_ATTRIBUTE};
use crate::client::TinkClient;
use crate::error::{ProviderError, ResultExt};
use crate::retry::RetryPolicy;
use crate::schema::{Attribute, Schema};
use crate::validation::{suppress_equivalent_json, validate_json_object, validate_not_empty};

/// Host-visible type name.
pub const TYPE_NAME: &str = "tinkerbell_workflow";

/// Manages workflows. Every attribute forces a replacement, so there is no
/// in-place update.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowResource;

#[async_trait]
impl Resource for WorkflowResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A workflow run of a template on a set of devices.")
            .with_attribute(
                ID_ATTRIBUTE,
                Attribute::computed_string().with_description("Workflow ID assigned by Tinkerbell."),
            )
            .with_attribute(
                "template",
                Attribute::required_string()
                    .with_description("ID of the template to run.")
                    .with_force_new()
                    .with_validator(validate_not_empty),
            )
            .with_attribute(
                "hardwares",
                Attribute::required_string()
                    .with_description(
                        "JSON object mapping template device names to hardware MAC addresses.",
                    )
                    .with_force_new()
                    .with_validator(validate_json_object)
                    .with_diff_suppress(suppress_equivalent_json),
            )
    }

    #[instrument(skip_all, name = "workflow.create")]
    async fn create(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = data.get_str("template")?.to_string();
        let hardwares = data.get_str("hardwares")?.to_string();

        let id = RetryPolicy::transient()
            .run(|| client.workflows.create_workflow(&template, &hardwares))
            .await
            .context("creating workflow")?;

        info!(id = %id, template = %template, "workflow created");
        data.set_id(id);
        Ok(())
    }

    #[instrument(skip_all, name = "workflow.read", fields(id = data.id()))]
    async fn read(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        let workflow = match client
            .workflows
            .find_workflow(&id)
            .await
            .with_context(|| format!("getting workflow {:?}", id))?
        {
            Some(workflow) => workflow,
            None => {
                warn!(id = %id, "workflow no longer exists");
                data.clear_id();
                return Ok(());
            },
        };

        // The listing may leave these blank; keep what the state has then.
        if !workflow.template.is_empty() {
            data.set("template", workflow.template);
        }
        if !workflow.hardware.is_empty() {
            data.set("hardwares", workflow.hardware);
        }
        debug!(id = %id, "workflow refreshed");
        Ok(())
    }

    async fn update(&self, _client: &TinkClient, _data: &mut ResourceData) -> Result<(), ProviderError> {
        Err(ProviderError::Unimplemented(
            "workflows cannot be updated in place".to_string(),
        ))
    }

    #[instrument(skip_all, name = "workflow.delete", fields(id = data.id()))]
    async fn delete(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        if client
            .workflows
            .find_workflow(&id)
            .await
            .with_context(|| format!("getting workflow {:?}", id))?
            .is_none()
        {
            debug!(id = %id, "workflow already gone");
            data.clear_id();
            return Ok(());
        }

        RetryPolicy::transient()
            .run(|| client.workflows.delete_workflow(&id))
            .await
            .with_context(|| format!("removing workflow {:?}", id))?;

        info!(id = %id, "workflow removed");
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTinkerbell;
    use serde_json::json;
    use tonic::Status;

    const HARDWARES: &str = r#"{"device_1": "00:00:00:00:00:01"}"#;

    fn data(state: serde_json::Value) -> ResourceData {
        ResourceData::from_state(state).unwrap()
    }

    #[test]
    fn test_schema_forces_replacement() {
        let schema = WorkflowResource.schema();
        assert!(schema.attribute("template").unwrap().force_new);
        assert!(schema.attribute("hardwares").unwrap().force_new);
        assert!(schema.attribute("id").unwrap().is_computed_only());
    }

    #[tokio::test]
    async fn test_create_retries_unavailable() {
        let fake = FakeTinkerbell::new();
        fake.fail_next("create_workflow", Status::unavailable("connection refused"));
        let mut data = data(json!({"template": "tpl-1", "hardwares": HARDWARES}));

        WorkflowResource.create(&fake.client(), &mut data).await.unwrap();

        let stored = fake.workflows();
        assert_eq!(fake.calls("create_workflow"), 2);
        assert_eq!(stored.len(), 1);
        assert_eq!(data.id(), Some(stored[0].id.as_str()));
        assert_eq!(stored[0].template, "tpl-1");
        assert_eq!(stored[0].hardware, HARDWARES);
    }

    #[tokio::test]
    async fn test_create_does_not_retry_rejection() {
        let fake = FakeTinkerbell::new();
        fake.fail_next("create_workflow", Status::invalid_argument("unknown template"));
        let mut data = data(json!({"template": "tpl-1", "hardwares": HARDWARES}));

        let err = WorkflowResource.create(&fake.client(), &mut data).await.unwrap_err();

        assert!(err.to_string().starts_with("creating workflow: "));
        assert_eq!(fake.calls("create_workflow"), 1);
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_read_keeps_state_for_blank_fields() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_workflow("tpl-1", "");
        let mut data = data(json!({"id": id, "template": "old", "hardwares": HARDWARES}));

        WorkflowResource.read(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.get_str("template").unwrap(), "tpl-1");
        assert_eq!(data.get_str("hardwares").unwrap(), HARDWARES);
    }

    #[tokio::test]
    async fn test_read_missing_clears_id() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "gone", "template": "tpl-1", "hardwares": HARDWARES}));

        WorkflowResource.read(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_update_is_unimplemented() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "wf", "template": "tpl-1", "hardwares": HARDWARES}));

        let err = WorkflowResource.update(&fake.client(), &mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unimplemented(_)));
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "gone", "template": "tpl-1", "hardwares": HARDWARES}));

        WorkflowResource.delete(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), None);
        assert_eq!(fake.calls("delete_workflow"), 0);
    }

    #[tokio::test]
    async fn test_delete_existing() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_workflow("tpl-1", HARDWARES);
        let mut data = data(json!({"id": id, "template": "tpl-1", "hardwares": HARDWARES}));

        WorkflowResource.delete(&fake.client(), &mut data).await.unwrap();

        assert!(fake.workflows().is_empty());
        assert_eq!(data.id(), None);
    }
}

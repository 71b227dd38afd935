//! `tinkerbell_template`: workflow templates.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::{Resource, ResourceData, ID_ATTRIBUTE};
use crate::client::TinkClient;
use crate::error::{ProviderError, ResultExt};
use crate::retry::RetryPolicy;
use crate::schema::{Attribute, Schema};
use crate::tink::template::WorkflowTemplate;
use crate::validation::{validate_not_empty, validate_template};

/// Host-visible type name.
pub const TYPE_NAME: &str = "tinkerbell_template";

/// Manages workflow templates. Name and content are updated in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResource;

impl TemplateResource {
    fn request(data: &ResourceData) -> Result<WorkflowTemplate, ProviderError> {
        Ok(WorkflowTemplate {
            id: data.id().unwrap_or_default().to_string(),
            name: data.get_str("name")?.to_string(),
            data: data.get_str("content")?.to_string(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl Resource for TemplateResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A workflow template stored in Tinkerbell.")
            .with_attribute(
                ID_ATTRIBUTE,
                Attribute::computed_string().with_description("Template ID assigned by Tinkerbell."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name of the template.")
                    .with_validator(validate_not_empty),
            )
            .with_attribute(
                "content",
                Attribute::required_string()
                    .with_description("Workflow definition in YAML.")
                    .with_validator(validate_template),
            )
    }

    #[instrument(skip_all, name = "template.create")]
    async fn create(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = Self::request(data)?;

        let id = RetryPolicy::serialization()
            .run(|| client.templates.create_template(template.clone()))
            .await
            .context("creating template")?;

        info!(id = %id, name = %template.name, "template created");
        data.set_id(id);
        Ok(())
    }

    #[instrument(skip_all, name = "template.read", fields(id = data.id()))]
    async fn read(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        if client
            .templates
            .find_template(&id)
            .await
            .context("checking if template exists")?
            .is_none()
        {
            warn!(id = %id, "template no longer exists");
            data.clear_id();
            return Ok(());
        }

        let template = client
            .templates
            .get_template(&id)
            .await
            .with_context(|| format!("getting template {:?}", id))?;

        debug!(id = %id, "template refreshed");
        data.set("name", template.name);
        data.set("content", template.data);
        Ok(())
    }

    #[instrument(skip_all, name = "template.update", fields(id = data.id()))]
    async fn update(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        if client
            .templates
            .find_template(&id)
            .await
            .context("checking if template exists")?
            .is_none()
        {
            return Err(ProviderError::NotFound(format!(
                "template {:?} does not exist",
                id
            )));
        }

        let template = Self::request(data)?;
        RetryPolicy::serialization()
            .run(|| client.templates.update_template(template.clone()))
            .await
            .context("updating template")?;

        info!(id = %id, "template updated");
        Ok(())
    }

    #[instrument(skip_all, name = "template.delete", fields(id = data.id()))]
    async fn delete(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();

        if client
            .templates
            .find_template(&id)
            .await
            .context("checking if template exists")?
            .is_none()
        {
            debug!(id = %id, "template already gone");
            data.clear_id();
            return Ok(());
        }

        RetryPolicy::serialization()
            .run(|| client.templates.delete_template(&id))
            .await
            .context("removing template")?;

        info!(id = %id, "template removed");
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

    const CONTENT: &str = r#"
version: "0.1"
name: hello_world_workflow
global_timeout: 600
tasks:
  - name: "hello world"
    worker: "{{.device_1}}"
    actions:
      - name: "hello_world"
        image: hello-world
        timeout: 60
"#;

    fn data(state: serde_json::Value) -> ResourceData {
        ResourceData::from_state(state).unwrap()
    }

    #[tokio::test]
    async fn test_create_records_id() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"name": "hello", "content": CONTENT}));

        TemplateResource.create(&fake.client(), &mut data).await.unwrap();

        let stored = fake.templates();
        assert_eq!(stored.len(), 1);
        assert_eq!(data.id(), Some(stored[0].id.as_str()));
        assert_eq!(stored[0].name, "hello");
        assert_eq!(stored[0].data, CONTENT);
    }

    #[tokio::test]
    async fn test_create_retries_serialization_conflict() {
        let fake = FakeTinkerbell::new();
        fake.fail_next(
            "create_template",
            Status::unknown("could not serialize access due to concurrent update"),
        );
        let mut data = data(json!({"name": "hello", "content": CONTENT}));

        TemplateResource.create(&fake.client(), &mut data).await.unwrap();

        assert_eq!(fake.calls("create_template"), 2);
        assert_eq!(fake.templates().len(), 1);
    }

    #[tokio::test]
    async fn test_read_refreshes_content() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_template("hello", CONTENT);
        let mut data = data(json!({"id": id, "name": "hello", "content": "stale"}));

        TemplateResource.read(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), Some(id.as_str()));
        assert_eq!(data.get_str("content").unwrap(), CONTENT);
        assert_eq!(fake.calls("get_template"), 1);
    }

    #[tokio::test]
    async fn test_read_missing_clears_id() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "gone", "name": "hello", "content": CONTENT}));

        TemplateResource.read(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), None);
        assert_eq!(fake.calls("get_template"), 0);
    }

    #[tokio::test]
    async fn test_read_list_failure_is_an_error() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_template("hello", CONTENT);
        fake.fail_next("list_templates", Status::unavailable("connection reset"));
        let mut data = data(json!({"id": id, "name": "hello", "content": CONTENT}));

        let err = TemplateResource.read(&fake.client(), &mut data).await.unwrap_err();

        assert!(err.to_string().starts_with("checking if template exists: "));
        assert_eq!(data.id(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_update_in_place() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_template("hello", CONTENT);
        let mut data = data(json!({"id": id, "name": "renamed", "content": CONTENT}));

        TemplateResource.update(&fake.client(), &mut data).await.unwrap();

        let stored = fake.templates();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].name, "renamed");
    }

    #[tokio::test]
    async fn test_update_missing_template() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "gone", "name": "hello", "content": CONTENT}));

        let err = TemplateResource.update(&fake.client(), &mut data).await.unwrap_err();

        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(err.to_string().contains("template \"gone\" does not exist"));
        assert_eq!(fake.calls("update_template"), 0);
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let fake = FakeTinkerbell::new();
        let mut data = data(json!({"id": "gone", "name": "hello", "content": CONTENT}));

        TemplateResource.delete(&fake.client(), &mut data).await.unwrap();

        assert_eq!(data.id(), None);
        assert_eq!(fake.calls("delete_template"), 0);
    }

    #[tokio::test]
    async fn test_delete_existing() {
        let fake = FakeTinkerbell::new();
        let id = fake.add_template("hello", CONTENT);
        let mut data = data(json!({"id": id, "name": "hello", "content": CONTENT}));

        TemplateResource.delete(&fake.client(), &mut data).await.unwrap();

        assert!(fake.templates().is_empty());
        assert_eq!(fake.calls("delete_template"), 1);
    }
}

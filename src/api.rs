//! Capability traits over the Tinkerbell gRPC services.
//!
//! Resource handlers talk to the service through these traits instead of
//! the generated clients, so tests can substitute in-memory fakes. The
//! `find_*` lookups have a default list-and-scan body; an implementation
//! backed by a service with a real get-by-id RPC can override them.

use std::pin::Pin;

use async_trait::async_trait;
use tokio_stream::{Stream, StreamExt};
use tonic::transport::Channel;
use tonic::Status;

use crate::error::{ProviderError, ResultExt};
use crate::tink::hardware::hardware_service_client::HardwareServiceClient;
use crate::tink::hardware::{self, Hardware};
use crate::tink::template::template_service_client::TemplateServiceClient;
use crate::tink::template::{self, WorkflowTemplate};
use crate::tink::workflow::workflow_service_client::WorkflowServiceClient;
use crate::tink::workflow::{self, Workflow};

/// Entries of a server-streaming list RPC.
pub type EntryStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Operations on workflow templates.
#[async_trait]
pub trait TemplateApi: Send + Sync {
    /// Store a new template and return its service-assigned id.
    async fn create_template(&self, template: WorkflowTemplate) -> Result<String, Status>;

    /// Fetch a single template.
    async fn get_template(&self, id: &str) -> Result<WorkflowTemplate, Status>;

    /// Stream every template.
    async fn list_templates(&self) -> Result<EntryStream<WorkflowTemplate>, Status>;

    /// Replace the name and body of an existing template.
    async fn update_template(&self, template: WorkflowTemplate) -> Result<(), Status>;

    /// Remove a template.
    async fn delete_template(&self, id: &str) -> Result<(), Status>;

    /// Look up a template by id.
    ///
    /// `Ok(None)` means the listing completed without a match.
    async fn find_template(&self, id: &str) -> Result<Option<WorkflowTemplate>, ProviderError> {
        let entries = self
            .list_templates()
            .await
            .context("getting all template entries")?;
        scan(entries, "template", |entry| entry.id == id).await
    }
}

/// Operations on workflows.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Instantiate a workflow and return its service-assigned id.
    async fn create_workflow(&self, template: &str, hardware: &str) -> Result<String, Status>;

    /// Stream every workflow.
    async fn list_workflows(&self) -> Result<EntryStream<Workflow>, Status>;

    /// Remove a workflow.
    async fn delete_workflow(&self, id: &str) -> Result<(), Status>;

    /// Look up a workflow by id.
    ///
    /// `Ok(None)` means the listing completed without a match.
    async fn find_workflow(&self, id: &str) -> Result<Option<Workflow>, ProviderError> {
        let entries = self
            .list_workflows()
            .await
            .context("getting all workflow entries")?;
        scan(entries, "workflow", |entry| entry.id == id).await
    }
}

/// Operations on hardware records.
#[async_trait]
pub trait HardwareApi: Send + Sync {
    /// Create or replace a hardware record.
    async fn push_hardware(&self, record: Hardware) -> Result<(), Status>;

    /// Stream every hardware record.
    async fn list_hardware(&self) -> Result<EntryStream<Hardware>, Status>;

    /// Remove a hardware record.
    async fn delete_hardware(&self, id: &str) -> Result<(), Status>;

    /// Look up a hardware record by id.
    ///
    /// `Ok(None)` means the listing completed without a match.
    async fn find_hardware(&self, id: &str) -> Result<Option<Hardware>, ProviderError> {
        let entries = self
            .list_hardware()
            .await
            .context("getting all hardware entries")?;
        scan(entries, "hardware", |entry| entry.id == id).await
    }
}

/// Receive entries until one matches or the stream ends.
async fn scan<T, F>(
    mut entries: EntryStream<T>,
    kind: &str,
    matches: F,
) -> Result<Option<T>, ProviderError>
where
    F: Fn(&T) -> bool + Send,
{
    while let Some(entry) = entries.next().await {
        let entry = entry.with_context(|| format!("receiving {} entry", kind))?;
        if matches(&entry) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

// The generated clients take `&mut self`; they are cheap to clone, so each
// call works on its own copy of the channel handle. Calls use the inherent
// methods by path since the trait methods would otherwise shadow them.

#[async_trait]
impl TemplateApi for TemplateServiceClient<Channel> {
    async fn create_template(&self, template: WorkflowTemplate) -> Result<String, Status> {
        let mut client = self.clone();
        let response = TemplateServiceClient::create_template(&mut client, template).await?;
        Ok(response.into_inner().id)
    }

    async fn get_template(&self, id: &str) -> Result<WorkflowTemplate, Status> {
        let mut client = self.clone();
        let request = template::GetRequest { id: id.to_string() };
        let response = TemplateServiceClient::get_template(&mut client, request).await?;
        Ok(response.into_inner())
    }

    async fn list_templates(&self) -> Result<EntryStream<WorkflowTemplate>, Status> {
        let mut client = self.clone();
        let response = TemplateServiceClient::list_templates(&mut client, template::Empty {}).await?;
        Ok(Box::pin(response.into_inner()))
    }

    async fn update_template(&self, template: WorkflowTemplate) -> Result<(), Status> {
        let mut client = self.clone();
        TemplateServiceClient::update_template(&mut client, template).await?;
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> Result<(), Status> {
        let mut client = self.clone();
        let request = template::GetRequest { id: id.to_string() };
        TemplateServiceClient::delete_template(&mut client, request).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowApi for WorkflowServiceClient<Channel> {
    async fn create_workflow(&self, template: &str, hardware: &str) -> Result<String, Status> {
        let mut client = self.clone();
        let request = workflow::CreateRequest {
            template: template.to_string(),
            hardware: hardware.to_string(),
        };
        let response = WorkflowServiceClient::create_workflow(&mut client, request).await?;
        Ok(response.into_inner().id)
    }

    async fn list_workflows(&self) -> Result<EntryStream<Workflow>, Status> {
        let mut client = self.clone();
        let response = WorkflowServiceClient::list_workflows(&mut client, workflow::Empty {}).await?;
        Ok(Box::pin(response.into_inner()))
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), Status> {
        let mut client = self.clone();
        let request = workflow::GetRequest { id: id.to_string() };
        WorkflowServiceClient::delete_workflow(&mut client, request).await?;
        Ok(())
    }
}

#[async_trait]
impl HardwareApi for HardwareServiceClient<Channel> {
    async fn push_hardware(&self, record: Hardware) -> Result<(), Status> {
        let mut client = self.clone();
        let request = hardware::PushRequest { data: Some(record) };
        HardwareServiceClient::push(&mut client, request).await?;
        Ok(())
    }

    async fn list_hardware(&self) -> Result<EntryStream<Hardware>, Status> {
        let mut client = self.clone();
        let response = HardwareServiceClient::all(&mut client, hardware::Empty {}).await?;
        Ok(Box::pin(response.into_inner()))
    }

    async fn delete_hardware(&self, id: &str) -> Result<(), Status> {
        let mut client = self.clone();
        let request = hardware::DeleteRequest { id: id.to_string() };
        HardwareServiceClient::delete(&mut client, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListOnly(Vec<Result<Hardware, Status>>);

    #[async_trait]
    impl HardwareApi for ListOnly {
        async fn push_hardware(&self, _record: Hardware) -> Result<(), Status> {
            Err(Status::unimplemented("push"))
        }

        async fn list_hardware(&self) -> Result<EntryStream<Hardware>, Status> {
            Ok(Box::pin(tokio_stream::iter(self.0.clone())))
        }

        async fn delete_hardware(&self, _id: &str) -> Result<(), Status> {
            Err(Status::unimplemented("delete"))
        }
    }

    fn record(id: &str) -> Hardware {
        Hardware {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_find_returns_match() {
        let api = ListOnly(vec![Ok(record("a")), Ok(record("b")), Ok(record("c"))]);
        let found = api.find_hardware("b").await.unwrap();
        assert_eq!(found.map(|h| h.id), Some("b".to_string()));
    }

    #[tokio::test]
    async fn test_find_exhausted_stream_is_absent() {
        let api = ListOnly(vec![Ok(record("a"))]);
        assert!(api.find_hardware("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_stops_at_match() {
        let api = ListOnly(vec![Ok(record("a")), Err(Status::internal("broken stream"))]);
        assert!(api.find_hardware("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_receive_error_is_failure() {
        let api = ListOnly(vec![Ok(record("a")), Err(Status::unavailable("reset"))]);
        let err = api.find_hardware("z").await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("receiving hardware entry: rpc error: code = Unavailable"));
    }
}

//! Testing utilities.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server, and
//! [`FakeTinkerbell`] stands in for the Tinkerbell API with in-memory
//! services that count calls and can be told to fail.
//!
//! # Example
//!
//! ```
//! use tinkerbell_provider::testing::{FakeTinkerbell, ProviderTester};
//! use tinkerbell_provider::TinkerbellProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let fake = FakeTinkerbell::new();
//! let tester = ProviderTester::new(TinkerbellProvider::with_client(fake.client()));
//!
//! let state = tester
//!     .lifecycle_create("tinkerbell_hardware", json!({"data": r#"{"id": "node-1"}"#}))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(state["id"], "node-1");
//! assert_eq!(fake.calls("push_hardware"), 1);
//! # });
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tonic::Status;

use crate::api::{EntryStream, HardwareApi, TemplateApi, WorkflowApi};
use crate::client::TinkClient;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::tink::hardware::Hardware;
use crate::tink::template::WorkflowTemplate;
use crate::tink::workflow::Workflow;
use crate::types::PlanResult;

/// A test harness for provider implementations.
///
/// This wraps a `ProviderService` implementation and provides
/// simplified methods for testing without a gRPC server.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a mutable reference to the underlying provider.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Ok(())` if validation passes (no error diagnostics).
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Ok(())` if configuration succeeds.
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Full plan operation with explicit config.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior_state, proposed_state, config)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        // Plan
        let plan_result = self.plan_create(resource_type, config).await?;

        // Create
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        // Read to verify
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        // Plan
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;

        // Update
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;

        // Read to verify
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        // Plan (optional, but good practice)
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        // Delete
        self.delete(resource_type, current_state).await
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        // Create
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;

        // Update
        let updated_state = self
            .lifecycle_update(resource_type, created_state.clone(), updated_config)
            .await?;

        // Delete
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;

        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

/// Check diagnostics and return an error if there are any errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates changes are needed.
///
/// # Panics
///
/// Panics if the plan has no changes.
pub fn assert_plan_has_changes(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes, but got no changes"
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        !has_change,
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

// =========================================================================
// In-memory Tinkerbell
// =========================================================================

#[derive(Debug, Default)]
struct FakeState {
    templates: Vec<WorkflowTemplate>,
    workflows: Vec<Workflow>,
    hardware: Vec<Hardware>,
    calls: HashMap<String, usize>,
    failures: HashMap<String, VecDeque<Status>>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", kind, self.next_id)
    }
}

/// In-memory implementation of the three Tinkerbell services.
///
/// Clones share the same state. Every API method counts its calls under its
/// trait method name (e.g. `"push_hardware"`), and [`fail_next`] queues
/// errors that the named method returns instead of doing its work.
///
/// [`fail_next`]: FakeTinkerbell::fail_next
#[derive(Debug, Clone, Default)]
pub struct FakeTinkerbell {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTinkerbell {
    /// An empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bundle backed by this fake.
    pub fn client(&self) -> TinkClient {
        TinkClient::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// How many times `method` has been called.
    pub fn calls(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Make the next call to `method` fail with `status`. Failures queue up.
    pub fn fail_next(&self, method: &str, status: Status) {
        self.lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(status);
    }

    /// Store a template directly, returning its id.
    pub fn add_template(&self, name: &str, data: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("template");
        state.templates.push(WorkflowTemplate {
            id: id.clone(),
            name: name.to_string(),
            data: data.to_string(),
            ..Default::default()
        });
        id
    }

    /// Store a workflow directly, returning its id.
    pub fn add_workflow(&self, template: &str, hardware: &str) -> String {
        let mut state = self.lock();
        let id = state.next_id("workflow");
        state.workflows.push(Workflow {
            id: id.clone(),
            template: template.to_string(),
            hardware: hardware.to_string(),
            ..Default::default()
        });
        id
    }

    /// Store a hardware record directly.
    pub fn add_hardware(&self, record: Hardware) {
        self.lock().hardware.push(record);
    }

    /// Stored templates.
    pub fn templates(&self) -> Vec<WorkflowTemplate> {
        self.lock().templates.clone()
    }

    /// Stored workflows.
    pub fn workflows(&self) -> Vec<Workflow> {
        self.lock().workflows.clone()
    }

    /// Stored hardware records.
    pub fn hardware(&self) -> Vec<Hardware> {
        self.lock().hardware.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and hand out the state, unless a failure is queued.
    fn enter(&self, method: &str) -> Result<MutexGuard<'_, FakeState>, Status> {
        let mut state = self.lock();
        *state.calls.entry(method.to_string()).or_default() += 1;
        match state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            Some(status) => Err(status),
            None => Ok(state),
        }
    }
}

fn entries<T: Send + 'static>(items: Vec<T>) -> EntryStream<T> {
    Box::pin(tokio_stream::iter(items.into_iter().map(Ok)))
}

fn missing(kind: &str, id: &str) -> Status {
    Status::not_found(format!("{} {} not found", kind, id))
}

#[async_trait]
impl TemplateApi for FakeTinkerbell {
    async fn create_template(&self, template: WorkflowTemplate) -> Result<String, Status> {
        let mut state = self.enter("create_template")?;
        let id = state.next_id("template");
        state.templates.push(WorkflowTemplate {
            id: id.clone(),
            ..template
        });
        Ok(id)
    }

    async fn get_template(&self, id: &str) -> Result<WorkflowTemplate, Status> {
        let state = self.enter("get_template")?;
        state
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| missing("template", id))
    }

    async fn list_templates(&self) -> Result<EntryStream<WorkflowTemplate>, Status> {
        let state = self.enter("list_templates")?;
        Ok(entries(state.templates.clone()))
    }

    async fn update_template(&self, template: WorkflowTemplate) -> Result<(), Status> {
        let mut state = self.enter("update_template")?;
        let stored = state
            .templates
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| missing("template", &template.id))?;
        stored.name = template.name;
        stored.data = template.data;
        Ok(())
    }

    async fn delete_template(&self, id: &str) -> Result<(), Status> {
        let mut state = self.enter("delete_template")?;
        let before = state.templates.len();
        state.templates.retain(|t| t.id != id);
        if state.templates.len() == before {
            return Err(missing("template", id));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowApi for FakeTinkerbell {
    async fn create_workflow(&self, template: &str, hardware: &str) -> Result<String, Status> {
        let mut state = self.enter("create_workflow")?;
        let id = state.next_id("workflow");
        state.workflows.push(Workflow {
            id: id.clone(),
            template: template.to_string(),
            hardware: hardware.to_string(),
            ..Default::default()
        });
        Ok(id)
    }

    async fn list_workflows(&self) -> Result<EntryStream<Workflow>, Status> {
        let state = self.enter("list_workflows")?;
        Ok(entries(state.workflows.clone()))
    }

    async fn delete_workflow(&self, id: &str) -> Result<(), Status> {
        let mut state = self.enter("delete_workflow")?;
        let before = state.workflows.len();
        state.workflows.retain(|w| w.id != id);
        if state.workflows.len() == before {
            return Err(missing("workflow", id));
        }
        Ok(())
    }
}

#[async_trait]
impl HardwareApi for FakeTinkerbell {
    async fn push_hardware(&self, record: Hardware) -> Result<(), Status> {
        let mut state = self.enter("push_hardware")?;
        match state.hardware.iter().position(|h| h.id == record.id) {
            Some(index) => state.hardware[index] = record,
            None => state.hardware.push(record),
        }
        Ok(())
    }

    async fn list_hardware(&self) -> Result<EntryStream<Hardware>, Status> {
        let state = self.enter("list_hardware")?;
        Ok(entries(state.hardware.clone()))
    }

    async fn delete_hardware(&self, id: &str) -> Result<(), Status> {
        let mut state = self.enter("delete_hardware")?;
        let before = state.hardware.len();
        state.hardware.retain(|h| h.id != id);
        if state.hardware.len() == before {
            return Err(missing("hardware", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TinkerbellProvider;
    use serde_json::json;
    use tokio_stream::StreamExt;

    const TEMPLATE: &str = r#"
version: "0.1"
name: debian
global_timeout: 1800
tasks:
  - name: "os-installation"
    worker: "{{.device_1}}"
    actions:
      - name: "stream-image"
        image: quay.io/tinkerbell-actions/image2disk:v1.0.0
        timeout: 600
"#;

    fn tester(fake: &FakeTinkerbell) -> ProviderTester<TinkerbellProvider> {
        ProviderTester::new(TinkerbellProvider::with_client(fake.client()))
    }

    #[tokio::test]
    async fn test_fake_counts_and_fails() {
        let fake = FakeTinkerbell::new();
        fake.fail_next("list_hardware", Status::unavailable("down"));

        assert!(fake.list_hardware().await.is_err());
        assert!(fake.list_hardware().await.is_ok());
        assert_eq!(fake.calls("list_hardware"), 2);
        assert_eq!(fake.calls("push_hardware"), 0);
    }

    #[tokio::test]
    async fn test_fake_push_upserts() {
        let fake = FakeTinkerbell::new();
        let record = |version| Hardware {
            id: "u".to_string(),
            version,
            ..Default::default()
        };
        fake.push_hardware(record(1)).await.unwrap();
        fake.push_hardware(record(2)).await.unwrap();

        let stored: Vec<_> = fake
            .list_hardware()
            .await
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].version, 2);
    }

    #[tokio::test]
    async fn test_fake_delete_absent_is_not_found() {
        let fake = FakeTinkerbell::new();
        let status = fake.delete_workflow("nope").await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_tester_resource_types() {
        let fake = FakeTinkerbell::new();
        let types = tester(&fake).resource_types();
        assert_eq!(
            types,
            vec!["tinkerbell_hardware", "tinkerbell_template", "tinkerbell_workflow"]
        );
    }

    #[tokio::test]
    async fn test_tester_plan_create() {
        let fake = FakeTinkerbell::new();
        let plan = tester(&fake)
            .plan_create("tinkerbell_template", json!({"name": "debian", "content": TEMPLATE}))
            .await
            .unwrap();

        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "content");
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_tester_validate_resource_config() {
        let fake = FakeTinkerbell::new();
        let err = tester(&fake)
            .validate_resource_config("tinkerbell_template", json!({"name": "", "content": TEMPLATE}))
            .await
            .unwrap_err();

        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "'name'");
                assert_eq!(
                    diagnostics[0].detail.as_deref(),
                    Some("value must not be empty")
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_tester_lifecycle_crud_template() {
        let fake = FakeTinkerbell::new();
        let final_state = tester(&fake)
            .lifecycle_crud(
                "tinkerbell_template",
                json!({"name": "debian", "content": TEMPLATE}),
                json!({"name": "debian-12", "content": TEMPLATE}),
            )
            .await
            .unwrap();

        assert_eq!(final_state["name"], "debian-12");
        assert_eq!(fake.calls("update_template"), 1);
        assert!(fake.templates().is_empty());
    }

    #[tokio::test]
    async fn test_tester_lifecycle_create_workflow() {
        let fake = FakeTinkerbell::new();
        let template = fake.add_template("debian", TEMPLATE);

        let state = tester(&fake)
            .lifecycle_create(
                "tinkerbell_workflow",
                json!({"template": template, "hardwares": r#"{"device_1":"00:00:00:00:00:01"}"#}),
            )
            .await
            .unwrap();

        assert_eq!(state["template"], template.as_str());
        assert_eq!(fake.workflows().len(), 1);
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid value for attribute 'data'")];
        assert_has_errors(&diagnostics);
        assert_error_contains(&diagnostics, "'data'");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("hardwares"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("hardwares"));
        assert!(display.contains("More info"));
    }
}

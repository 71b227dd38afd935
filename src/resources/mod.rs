//! Resource handlers.
//!
//! Each managed resource type implements [`Resource`]: a schema plus the
//! create/read/update/delete lifecycle against the Tinkerbell API. Handlers
//! work on a [`ResourceData`] view of the host state.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::TinkClient;
use crate::error::ProviderError;
use crate::schema::Schema;

pub mod hardware;
pub mod template;
pub mod workflow;

pub use hardware::HardwareResource;
pub use template::TemplateResource;
pub use workflow::WorkflowResource;

/// Attribute holding the service-assigned identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// Lifecycle of one resource type.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Host-visible type name, e.g. `tinkerbell_template`.
    fn type_name(&self) -> &'static str;

    /// Attributes of the resource.
    fn schema(&self) -> Schema;

    /// Whether moving from `prior` to `planned` needs a new resource even
    /// though no force-new attribute changed.
    fn requires_replacement(&self, prior: &ResourceData, planned: &ResourceData) -> bool {
        let _ = (prior, planned);
        false
    }

    /// Create the resource and record its id.
    async fn create(&self, client: &TinkClient, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Refresh the attributes, clearing the id if the resource is gone.
    async fn read(&self, client: &TinkClient, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Apply planned changes in place.
    async fn update(&self, client: &TinkClient, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Remove the resource.
    async fn delete(&self, client: &TinkClient, data: &mut ResourceData)
        -> Result<(), ProviderError>;
}

/// Every resource type the provider manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(TemplateResource),
        Box::new(WorkflowResource),
        Box::new(HardwareResource),
    ]
}

/// Mutable view of a resource's state.
///
/// A cleared id means the resource no longer exists; such data turns into a
/// null state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceData {
    id: Option<String>,
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// Build from a host state or planned state. `null` yields empty data.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        let mut attributes = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::Validation(format!(
                    "expected resource state to be an object, got {}",
                    other
                )))
            },
        };

        let id = match attributes.remove(ID_ATTRIBUTE) {
            Some(Value::String(id)) if !id.is_empty() => Some(id),
            _ => None,
        };

        Ok(Self { id, attributes })
    }

    /// The tracked id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The tracked id, or an error if the state has none.
    pub fn require_id(&self) -> Result<&str, ProviderError> {
        self.id()
            .ok_or_else(|| ProviderError::Validation("resource state has no id".to_string()))
    }

    /// Record the service-assigned id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Forget the id, marking the resource as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// A string attribute.
    pub fn get_str(&self, name: &str) -> Result<&str, ProviderError> {
        match self.attributes.get(name) {
            Some(Value::String(value)) => Ok(value),
            Some(other) => Err(ProviderError::Validation(format!(
                "attribute {:?} must be a string, got {}",
                name, other
            ))),
            None => Err(ProviderError::Validation(format!(
                "missing attribute {:?}",
                name
            ))),
        }
    }

    /// Set a string attribute.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.attributes
            .insert(name.to_string(), Value::String(value.into()));
    }

    /// The state to hand back to the host.
    pub fn into_state(self) -> Value {
        match self.id {
            Some(id) => {
                let mut attributes = self.attributes;
                attributes.insert(ID_ATTRIBUTE.to_string(), Value::String(id));
                Value::Object(attributes)
            },
            None => Value::Null,
        }
    }
}

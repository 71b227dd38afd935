//! Workflow definition grammar.
//!
//! Template bodies are YAML documents describing a workflow: a list of tasks,
//! each running a list of container actions on a worker. Parsing is strict,
//! so unknown keys are rejected.
//!
//! ```
//! use tinkerbell_provider::definition::Workflow;
//!
//! let workflow = Workflow::parse(
//!     r#"
//! version: "0.1"
//! name: ubuntu_provisioning
//! global_timeout: 6000
//! tasks:
//!   - name: "os-installation"
//!     worker: "{{.device_1}}"
//!     actions:
//!       - name: "disk-wipe"
//!         image: quay.io/tinkerbell-actions/disk-wipe:v1
//!         timeout: 90
//! "#,
//! )
//! .unwrap();
//!
//! assert!(workflow.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Longest name accepted for workflows, tasks and actions.
pub const MAX_NAME_LENGTH: usize = 200;

/// A parsed workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Workflow {
    /// Definition format version.
    #[serde(default)]
    pub version: String,
    /// Unique name.
    #[serde(default)]
    pub name: String,
    /// Identifier assigned when the workflow is instantiated.
    #[serde(default)]
    pub id: String,
    /// Timeout for the whole workflow, in seconds.
    #[serde(default)]
    pub global_timeout: i64,
    /// Tasks in execution order.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// A group of actions executed on one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Unique name.
    #[serde(default)]
    pub name: String,
    /// Worker address or template placeholder such as `{{.device_1}}`.
    #[serde(default)]
    pub worker: String,
    /// Actions in execution order.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Volume mounts in `host:container` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
}

/// A single container run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Action {
    /// Unique name.
    #[serde(default)]
    pub name: String,
    /// Container image reference.
    #[serde(default)]
    pub image: String,
    /// Timeout for the action, in seconds.
    #[serde(default)]
    pub timeout: i64,
    /// Overrides the image command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Command run when the action times out.
    #[serde(default, rename = "on-timeout", skip_serializing_if = "Vec::is_empty")]
    pub on_timeout: Vec<String>,
    /// Command run when the action fails.
    #[serde(default, rename = "on-failure", skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<String>,
    /// Volume mounts in `host:container` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,
    /// PID namespace mode.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pid: String,
}

/// Semantic problems in a syntactically valid definition.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("workflow name cannot be empty")]
    EmptyWorkflowName,

    #[error("workflow name should not have more than 200 characters")]
    WorkflowNameTooLong,

    #[error("template must have at least one task defined")]
    NoTasks,

    #[error("task name cannot be empty")]
    EmptyTaskName,

    #[error("task name should not have more than 200 characters: {0}")]
    TaskNameTooLong(String),

    #[error("two tasks in a template cannot have same name: {0}")]
    DuplicateTask(String),

    #[error("task must have at least one action: {0}")]
    NoActions(String),

    #[error("action name cannot be empty")]
    EmptyActionName,

    #[error("action name should not have more than 200 characters: {0}")]
    ActionNameTooLong(String),

    #[error("two actions in a task cannot have same name: {0}")]
    DuplicateAction(String),

    #[error("invalid action image ({image}): {reason}")]
    InvalidImage { image: String, reason: &'static str },
}

impl Workflow {
    /// Parse a definition, rejecting unknown keys.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Check the rules a definition must satisfy before the service accepts it.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::EmptyWorkflowName);
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(DefinitionError::WorkflowNameTooLong);
        }
        if self.tasks.is_empty() {
            return Err(DefinitionError::NoTasks);
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !task_names.insert(task.name.as_str()) {
                return Err(DefinitionError::DuplicateTask(task.name.clone()));
            }
        }

        Ok(())
    }
}

impl Task {
    fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::EmptyTaskName);
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(DefinitionError::TaskNameTooLong(self.name.clone()));
        }
        if self.actions.is_empty() {
            return Err(DefinitionError::NoActions(self.name.clone()));
        }

        let mut action_names = HashSet::new();
        for action in &self.actions {
            action.validate()?;
            if !action_names.insert(action.name.as_str()) {
                return Err(DefinitionError::DuplicateAction(action.name.clone()));
            }
        }

        Ok(())
    }
}

impl Action {
    fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::EmptyActionName);
        }
        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(DefinitionError::ActionNameTooLong(self.name.clone()));
        }

        validate_image(&self.image).map_err(|reason| DefinitionError::InvalidImage {
            image: self.image.clone(),
            reason,
        })
    }
}

/// Check a container image reference of the form
/// `[registry[:port]/]path[:tag][@digest]`.
pub fn validate_image(image: &str) -> Result<(), &'static str> {
    if image.is_empty() {
        return Err("image cannot be empty");
    }
    if image.chars().any(char::is_whitespace) {
        return Err("image cannot contain whitespace");
    }

    let name = match image.split_once('@') {
        Some((name, digest)) => {
            if !is_valid_digest(digest) {
                return Err("invalid digest");
            }
            name
        },
        None => image,
    };

    let repository = match name.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => {
            if !is_valid_tag(tag) {
                return Err("invalid tag");
            }
            repository
        },
        _ => name,
    };

    let mut components = repository.split('/').peekable();
    let first = components.next().unwrap_or_default();
    let has_registry = components.peek().is_some()
        && (first.contains('.') || first.contains(':') || first == "localhost");
    let path: Vec<&str> = if has_registry {
        components.collect()
    } else {
        repository.split('/').collect()
    };

    if path.is_empty() {
        return Err("missing repository path");
    }
    if !path.iter().all(|component| is_valid_path_component(component)) {
        return Err("repository path must be lowercase alphanumerics separated by '.', '_', '-' or '/'");
    }

    Ok(())
}

fn is_valid_path_component(component: &str) -> bool {
    let starts_and_ends_alnum = component
        .chars()
        .next()
        .zip(component.chars().last())
        .is_some_and(|(first, last)| is_lower_alnum(first) && is_lower_alnum(last));

    starts_and_ends_alnum
        && component
            .chars()
            .all(|c| is_lower_alnum(c) || matches!(c, '.' | '_' | '-'))
}

fn is_lower_alnum(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= 128
        && !tag.starts_with(['.', '-'])
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_valid_digest(digest: &str) -> bool {
    match digest.split_once(':') {
        Some((algorithm, hex)) => {
            !algorithm.is_empty()
                && hex.len() >= 32
                && hex.chars().all(|c| c.is_ascii_hexdigit())
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: "0.1"
name: ubuntu_provisioning
global_timeout: 6000
tasks:
  - name: "os-installation"
    worker: "{{.device_1}}"
    volumes:
      - /dev:/dev
    environment:
      MIRROR_HOST: 192.168.1.2
    actions:
      - name: "disk-wipe"
        image: quay.io/tinkerbell-actions/disk-wipe:v1
        timeout: 90
      - name: "stream-image"
        image: image2disk
        timeout: 600
        on-failure:
          - echo failed
"#;

    fn parse(content: &str) -> Workflow {
        Workflow::parse(content).expect("definition parses")
    }

    #[test]
    fn test_parse_valid_definition() {
        let workflow = parse(VALID);
        assert_eq!(workflow.name, "ubuntu_provisioning");
        assert_eq!(workflow.global_timeout, 6000);
        assert_eq!(workflow.tasks.len(), 1);

        let task = &workflow.tasks[0];
        assert_eq!(task.worker, "{{.device_1}}");
        assert_eq!(task.actions[1].on_failure, vec!["echo failed".to_string()]);
        assert_eq!(task.environment["MIRROR_HOST"], "192.168.1.2");

        assert!(workflow.validate().is_ok());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(Workflow::parse("foo: bar").is_err());
        assert!(Workflow::parse("name: x\ntasks:\n  - name: t\n    cpus: 2\n").is_err());
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        assert!(Workflow::parse("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_validate_workflow_name() {
        let workflow = parse("tasks: []");
        assert_eq!(workflow.validate(), Err(DefinitionError::EmptyWorkflowName));

        let workflow = Workflow {
            name: "x".repeat(MAX_NAME_LENGTH + 1),
            ..Default::default()
        };
        assert_eq!(workflow.validate(), Err(DefinitionError::WorkflowNameTooLong));
    }

    #[test]
    fn test_validate_requires_tasks() {
        let workflow = parse("name: empty");
        assert_eq!(workflow.validate(), Err(DefinitionError::NoTasks));
    }

    #[test]
    fn test_validate_duplicate_tasks() {
        let workflow = parse(
            r#"
name: dup
tasks:
  - name: t
    actions:
      - name: a
        image: alpine
  - name: t
    actions:
      - name: a
        image: alpine
"#,
        );
        assert_eq!(
            workflow.validate(),
            Err(DefinitionError::DuplicateTask("t".to_string()))
        );
    }

    #[test]
    fn test_validate_task_without_actions() {
        let workflow = parse("name: w\ntasks:\n  - name: t\n");
        assert_eq!(
            workflow.validate(),
            Err(DefinitionError::NoActions("t".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_actions() {
        let workflow = parse(
            r#"
name: dup
tasks:
  - name: t
    actions:
      - name: a
        image: alpine
      - name: a
        image: busybox
"#,
        );
        assert_eq!(
            workflow.validate(),
            Err(DefinitionError::DuplicateAction("a".to_string()))
        );
    }

    #[test]
    fn test_validate_action_image() {
        let workflow = parse(
            r#"
name: bad-image
tasks:
  - name: t
    actions:
      - name: a
        image: Quay.io/Tinkerbell/Disk-Wipe
"#,
        );
        let err = workflow.validate().unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidImage { .. }));
        assert!(err.to_string().starts_with("invalid action image (Quay.io/Tinkerbell/Disk-Wipe)"));
    }

    #[test]
    fn test_validate_image_references() {
        for image in [
            "alpine",
            "alpine:3.18",
            "library/alpine:latest",
            "quay.io/tinkerbell-actions/image2disk:v1.0.0",
            "localhost:5000/actions/writefile",
            "192.168.1.1:5000/disk-wipe@sha256:0123456789abcdef0123456789abcdef",
        ] {
            assert!(validate_image(image).is_ok(), "{image} should be valid");
        }

        for image in [
            "",
            "alpine latest",
            "Alpine",
            "quay.io/Tinkerbell/disk",
            "alpine:",
            "alpine:-tag",
            "alpine@sha256:xyz",
            "actions//wipe",
        ] {
            assert!(validate_image(image).is_err(), "{image:?} should be invalid");
        }
    }
}

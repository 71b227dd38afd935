//! Plan computation.
//!
//! Compares a prior state with the proposed configuration attribute by
//! attribute, honouring each attribute's diff suppressor and force-new flag.

use serde_json::{Map, Value};

use crate::resources::ID_ATTRIBUTE;
use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` (absent for a new resource) to
/// `proposed` (null for a destroy).
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|value| !value.is_null());

    match (prior, proposed) {
        (None, Value::Null) => PlanResult::no_change(Value::Null),
        (Some(prior), Value::Null) => plan_destroy(schema, prior),
        (None, proposed) => plan_create(schema, proposed),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

/// Turn an in-place update into a replacement: the id becomes unknown again.
pub fn mark_replacement(mut result: PlanResult) -> PlanResult {
    result.requires_replace = true;
    if let Value::Object(map) = &mut result.planned_state {
        map.insert(ID_ATTRIBUTE.to_string(), Value::Null);
    }
    result
}

/// Configurable attributes in a stable order.
fn configurable(schema: &Schema) -> Vec<(&String, &Attribute)> {
    let mut attributes: Vec<_> = schema
        .block
        .attributes
        .iter()
        .filter(|(_, attr)| !attr.is_computed_only())
        .collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));
    attributes
}

fn object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let mut planned = object(proposed);
    planned.insert(ID_ATTRIBUTE.to_string(), Value::Null);

    let changes = configurable(schema)
        .into_iter()
        .filter_map(|(name, _)| match planned.get(name.as_str()) {
            Some(value) if !value.is_null() => {
                Some(AttributeChange::added(name.clone(), value.clone()))
            },
            _ => None,
        })
        .collect();

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_destroy(schema: &Schema, prior: &Value) -> PlanResult {
    let prior = object(prior);

    let changes = configurable(schema)
        .into_iter()
        .filter_map(|(name, _)| match prior.get(name.as_str()) {
            Some(value) if !value.is_null() => {
                Some(AttributeChange::removed(name.clone(), value.clone()))
            },
            _ => None,
        })
        .collect();

    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let prior = object(prior);
    let mut planned = object(proposed);
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in configurable(schema) {
        let before = prior.get(name.as_str()).cloned().unwrap_or(Value::Null);
        let after = planned.get(name.as_str()).cloned().unwrap_or(Value::Null);
        if before == after {
            continue;
        }

        if let (Some(suppress), Value::String(old), Value::String(new)) =
            (attr.diff_suppress, &before, &after)
        {
            if suppress(old, new) {
                planned.insert(name.clone(), before);
                continue;
            }
        }

        requires_replace |= attr.force_new;
        changes.push(AttributeChange::modified(name.clone(), before, after));
    }

    // Computed attributes carry over from the prior state.
    for (name, attr) in &schema.block.attributes {
        if attr.is_computed_only() {
            if let Some(value) = prior.get(name.as_str()) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    let result = PlanResult::with_changes(Value::Object(planned), changes, false);
    if requires_replace {
        mark_replacement(result)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{HardwareResource, Resource, WorkflowResource};
    use serde_json::json;

    #[test]
    fn test_plan_create() {
        let schema = WorkflowResource.schema();
        let result = plan(
            &schema,
            None,
            &json!({"template": "tpl", "hardwares": "{}"}),
        );

        assert!(result.has_changes());
        assert!(!result.requires_replace);
        assert_eq!(result.changes.len(), 2);
        assert_eq!(result.changes[0].path, "hardwares");
        assert_eq!(result.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_destroy() {
        let schema = WorkflowResource.schema();
        let prior = json!({"id": "wf", "template": "tpl", "hardwares": "{}"});
        let result = plan(&schema, Some(&prior), &Value::Null);

        assert_eq!(result.planned_state, Value::Null);
        assert_eq!(result.changes.len(), 2);
        assert!(result.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_plan_no_change_keeps_id() {
        let schema = WorkflowResource.schema();
        let prior = json!({"id": "wf", "template": "tpl", "hardwares": "{}"});
        let proposed = json!({"id": null, "template": "tpl", "hardwares": "{}"});
        let result = plan(&schema, Some(&prior), &proposed);

        assert!(!result.has_changes());
        assert_eq!(result.planned_state["id"], "wf");
    }

    #[test]
    fn test_plan_suppresses_equivalent_json() {
        let schema = HardwareResource.schema();
        let prior = json!({"id": "u", "data": r#"{"id":"u","metadata":{"a":1,"b":2}}"#});
        let proposed = json!({"data": "{\n  \"metadata\": {\"b\": 2, \"a\": 1},\n  \"id\": \"u\"\n}"});
        let result = plan(&schema, Some(&prior), &proposed);

        assert!(!result.has_changes());
        assert_eq!(result.planned_state["data"], prior["data"]);
    }

    #[test]
    fn test_plan_force_new_change() {
        let schema = WorkflowResource.schema();
        let prior = json!({"id": "wf", "template": "tpl", "hardwares": "{}"});
        let proposed = json!({"template": "other", "hardwares": "{}"});
        let result = plan(&schema, Some(&prior), &proposed);

        assert!(result.requires_replace);
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].path, "template");
        assert_eq!(result.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_in_place_change() {
        let schema = HardwareResource.schema();
        let prior = json!({"id": "u", "data": r#"{"id":"u"}"#});
        let proposed = json!({"data": r#"{"id":"u","version":2}"#});
        let result = plan(&schema, Some(&prior), &proposed);

        assert!(result.has_changes());
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["id"], "u");
    }
}

//! Per-node comparison of desired and observed state.
//!
//! The diff picks exactly one operation per node. Inherited fields are
//! copied from the observed body before comparison, output-only fields are
//! excluded, and a change to a non-updatable field escalates the operation to
//! a recreate. External nodes are never mutated; drift on them is reported
//! as a diagnostic with a no-op.

use crate::meta::ResourceID;
use crate::node::{Node, NodeState, Ownership};
use crate::path::PathError;
use crate::value::{self, ConversionError, DiffReport};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The operation the planner should emit for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Nop,
    Create,
    Update(DiffReport),
    /// Delete followed by create; required when a non-updatable field
    /// changed.
    Recreate(DiffReport),
    Delete,
}

impl Operation {
    pub fn is_nop(&self) -> bool {
        matches!(self, Operation::Nop)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Nop => write!(f, "no-op"),
            Operation::Create => write!(f, "create"),
            Operation::Update(_) => write!(f, "update"),
            Operation::Recreate(_) => write!(f, "recreate"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome of diffing one node.
#[derive(Debug, Clone)]
pub struct NodeDiff {
    pub id: ResourceID,
    pub operation: Operation,
    /// Desired body after inheritance; the body updates are executed with.
    pub merged: Option<Value>,
    /// Human-readable notes, e.g. drift on an external resource.
    pub diagnostics: Vec<String>,
}

impl NodeDiff {
    fn nop(id: ResourceID) -> NodeDiff {
        NodeDiff {
            id,
            operation: Operation::Nop,
            merged: None,
            diagnostics: Vec::new(),
        }
    }

    fn with_diag(mut self, diag: String) -> NodeDiff {
        self.diagnostics.push(diag);
        self
    }
}

/// Failure to compare two nodes.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("{id}: desired resource body is missing")]
    MissingBody { id: ResourceID },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Choose the operation for one node given its observed counterpart.
pub fn diff_nodes(want: &dyn Node, got: Option<&dyn Node>) -> Result<NodeDiff, DiffError> {
    let id = want.id().clone();
    let observed_state = got.map(|g| g.state()).unwrap_or(NodeState::DoesNotExist);
    let managed = want.ownership() == Ownership::Managed;

    match (want.state(), observed_state) {
        (NodeState::Unknown, _) => {
            Ok(NodeDiff::nop(id).with_diag("desired state is unknown".into()))
        }
        (_, NodeState::Unknown) => {
            Ok(NodeDiff::nop(id).with_diag("observed state is unknown; sync failed".into()))
        }
        (NodeState::Exists, NodeState::DoesNotExist) => {
            if managed {
                Ok(NodeDiff {
                    id,
                    operation: Operation::Create,
                    merged: None,
                    diagnostics: Vec::new(),
                })
            } else {
                Ok(NodeDiff::nop(id).with_diag(format!(
                    "{} resource does not exist and will not be created",
                    want.ownership()
                )))
            }
        }
        // The observed state is Exists only when an observed node is present.
        (NodeState::Exists, NodeState::Exists) => match got {
            Some(got) => diff_existing(want, got, managed),
            None => Ok(NodeDiff::nop(id)),
        },
        (NodeState::DoesNotExist, NodeState::Exists) => {
            if managed {
                Ok(NodeDiff {
                    id,
                    operation: Operation::Delete,
                    merged: None,
                    diagnostics: Vec::new(),
                })
            } else {
                Ok(NodeDiff::nop(id).with_diag(format!(
                    "{} resource exists and will not be deleted",
                    want.ownership()
                )))
            }
        }
        (NodeState::DoesNotExist, NodeState::DoesNotExist) => Ok(NodeDiff::nop(id)),
    }
}

fn diff_existing(want: &dyn Node, got: &dyn Node, managed: bool) -> Result<NodeDiff, DiffError> {
    let id = want.id().clone();

    // External nodes without a desired body only verify existence.
    let Some(mut want_body) = want.resource_value().cloned() else {
        if managed {
            return Err(DiffError::MissingBody { id });
        }
        return Ok(NodeDiff::nop(id));
    };
    let Some(got_body) = got.value_in(want.version())? else {
        return Ok(NodeDiff::nop(id).with_diag("observed node has no resource body".into()));
    };

    let traits = want.field_traits();
    value::inherit(&mut want_body, &got_body, &traits)?;
    let report = value::diff(&want_body, &got_body, &traits);

    if report.is_empty() {
        return Ok(NodeDiff {
            id,
            operation: Operation::Nop,
            merged: Some(want_body),
            diagnostics: Vec::new(),
        });
    }

    if !managed {
        let paths: Vec<String> = report.paths().map(|p| p.to_string()).collect();
        return Ok(NodeDiff {
            id,
            operation: Operation::Nop,
            merged: Some(want_body),
            diagnostics: vec![format!(
                "{} resource differs from desired state at {}",
                want.ownership(),
                paths.join(", ")
            )],
        });
    }

    let operation = if report.needs_recreate {
        Operation::Recreate(report)
    } else {
        Operation::Update(report)
    };
    Ok(NodeDiff {
        id,
        operation,
        merged: Some(want_body),
        diagnostics: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudClient, MockCloud};
    use crate::meta::{Key, ResourceID, Version};
    use crate::node::{NodeBuilder, TypedBuilder};
    use crate::testkind::WidgetKind;
    use serde_json::{Value, json};

    fn wid(name: &str) -> ResourceID {
        ResourceID::new("proj-1", "widgets", Key::global(name))
    }

    fn want_node(name: &str, state: NodeState, ownership: Ownership, body: Option<Value>) -> Box<dyn Node> {
        let mut b = TypedBuilder::<WidgetKind>::new("proj-1", Key::global(name));
        b.set_ownership(ownership);
        b.set_state(state);
        if let Some(body) = body {
            b.set_resource_value(Version::Ga, body).unwrap();
        }
        b.build().unwrap()
    }

    async fn observed_node(name: &str, body: Option<Value>) -> Box<dyn Node> {
        let cloud = MockCloud::new();
        if let Some(body) = body {
            cloud.insert(&wid(name), Version::Ga, body).await.unwrap();
        }
        let mut b = TypedBuilder::<WidgetKind>::new("proj-1", Key::global(name));
        b.sync_from_cloud(&cloud).await.unwrap();
        b.build().unwrap()
    }

    #[tokio::test]
    async fn test_create_when_absent() {
        let want = want_node("w1", NodeState::Exists, Ownership::Managed, Some(json!({})));
        let got = observed_node("w1", None).await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert_eq!(d.operation, Operation::Create);
    }

    #[tokio::test]
    async fn test_nop_when_equal_modulo_output_only() {
        let want = want_node(
            "w1",
            NodeState::Exists,
            Ownership::Managed,
            Some(json!({"shape": "round"})),
        );
        // Observed body carries server-set fields the desired one lacks.
        let got = observed_node("w1", Some(json!({"name": "w1", "shape": "round"}))).await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert!(d.operation.is_nop());
        assert!(d.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_update_on_field_change() {
        let want = want_node(
            "w1",
            NodeState::Exists,
            Ownership::Managed,
            Some(json!({"shape": "round", "weight": 5})),
        );
        let got = observed_node(
            "w1",
            Some(json!({"name": "w1", "shape": "round", "weight": 9})),
        )
        .await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        match d.operation {
            Operation::Update(report) => {
                assert_eq!(report.items.len(), 1);
                assert_eq!(report.items[0].path.to_string(), ".weight");
            }
            other => panic!("want update, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_recreate_on_non_updatable_change() {
        let want = want_node(
            "w1",
            NodeState::Exists,
            Ownership::Managed,
            Some(json!({"shape": "square"})),
        );
        let got = observed_node("w1", Some(json!({"name": "w1", "shape": "round"}))).await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert!(matches!(d.operation, Operation::Recreate(_)));
    }

    #[tokio::test]
    async fn test_delete_when_unwanted() {
        let want = want_node("w1", NodeState::DoesNotExist, Ownership::Managed, None);
        let got = observed_node("w1", Some(json!({"name": "w1"}))).await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert_eq!(d.operation, Operation::Delete);
    }

    #[tokio::test]
    async fn test_external_drift_is_nop_with_diagnostic() {
        let want = want_node(
            "w1",
            NodeState::Exists,
            Ownership::External,
            Some(json!({"shape": "round", "weight": 5})),
        );
        let got = observed_node(
            "w1",
            Some(json!({"name": "w1", "shape": "round", "weight": 9})),
        )
        .await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert!(d.operation.is_nop());
        assert_eq!(d.diagnostics.len(), 1);
        assert!(d.diagnostics[0].contains(".weight"));
    }

    #[tokio::test]
    async fn test_external_missing_is_nop_with_diagnostic() {
        let want = want_node("w1", NodeState::Exists, Ownership::External, None);
        let got = observed_node("w1", None).await;
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert!(d.operation.is_nop());
        assert!(!d.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_merged_body_inherits_observed_fields() {
        let cloud = MockCloud::new();
        // Seed directly so the observed widget has a fingerprint.
        cloud.seed(
            wid("w1"),
            Version::Ga,
            json!({"name": "w1", "shape": "round", "weight": 9, "fingerprint": "fp-42"}),
        );
        let mut b = TypedBuilder::<WidgetKind>::new("proj-1", Key::global("w1"));
        b.sync_from_cloud(&cloud).await.unwrap();
        let got = b.build().unwrap();

        let want = want_node(
            "w1",
            NodeState::Exists,
            Ownership::Managed,
            Some(json!({"shape": "round", "weight": 5})),
        );
        let d = diff_nodes(want.as_ref(), Some(got.as_ref())).unwrap();
        assert!(matches!(d.operation, Operation::Update(_)));
        assert_eq!(d.merged.unwrap()["fingerprint"], "fp-42");
    }
}

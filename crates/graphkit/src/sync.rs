//! Populating observed state from the cloud.
//!
//! Sync does not mutate the desired graph: every node is cloned back to a
//! builder, fetched, and assembled into a separate observed graph that the
//! planner diffs against.

use crate::cloud::{CloudClient, CloudError};
use crate::graph::{Graph, GraphError};
use crate::meta::ResourceID;
use crate::node::NodeState;
use thiserror::Error;

/// How sync reacts to per-node fetch failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Record failures per node and keep going.
    #[default]
    Lenient,
    /// Fail the whole sync on the first fetch error.
    Strict,
}

/// A per-node fetch failure. NotFound never appears here; it is a state
/// observation.
#[derive(Debug)]
pub struct SyncFailure {
    pub id: ResourceID,
    pub error: CloudError,
}

/// The observed graph plus any per-node failures.
#[derive(Debug)]
pub struct SyncOutcome {
    pub graph: Graph,
    pub failures: Vec<SyncFailure>,
}

/// Fatal sync failure.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync {id}: {source}")]
    Fetch {
        id: ResourceID,
        #[source]
        source: CloudError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Fetch observed state for every node of `graph`.
pub async fn sync(cloud: &dyn CloudClient, graph: &Graph) -> Result<SyncOutcome, SyncError> {
    sync_with(cloud, graph, SyncStrategy::default()).await
}

pub async fn sync_with(
    cloud: &dyn CloudClient,
    graph: &Graph,
    strategy: SyncStrategy,
) -> Result<SyncOutcome, SyncError> {
    let mut observed = graph.to_builder();
    // The observed side may legitimately reference resources outside the
    // graph; those edges are dropped rather than rejected.
    observed.allow_unresolved_refs();

    let mut failures = Vec::new();
    for builder in observed.builders_mut() {
        // External nodes are fetched too, but only so existence can be
        // verified and their fields read during diff; they are never written.
        match builder.sync_from_cloud(cloud).await {
            Ok(()) => {}
            Err(error) => {
                let id = builder.id().clone();
                log::warn!("sync {id}: {error}");
                if strategy == SyncStrategy::Strict {
                    return Err(SyncError::Fetch { id, source: error });
                }
                builder.set_state(NodeState::Unknown);
                failures.push(SyncFailure { id, error });
            }
        }
    }

    Ok(SyncOutcome {
        graph: observed.build()?,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{MockCloud, MockOp};
    use crate::graph::GraphBuilder;
    use crate::meta::{Key, ResourceID, Version};
    use crate::node::{NodeBuilder, Ownership, TypedBuilder};
    use crate::testkind::WidgetKind;
    use serde_json::json;

    fn want_graph(names: &[&str]) -> Graph {
        let mut gb = GraphBuilder::new();
        for name in names {
            let mut b = TypedBuilder::<WidgetKind>::new("proj-1", Key::global(*name));
            b.set_ownership(Ownership::Managed);
            b.set_state(NodeState::Exists);
            b.set_resource_value(Version::Ga, json!({"shape": "round"}))
                .unwrap();
            gb.add(Box::new(b));
        }
        gb.build().unwrap()
    }

    fn wid(name: &str) -> ResourceID {
        ResourceID::new("proj-1", "widgets", Key::global(name))
    }

    #[tokio::test]
    async fn test_sync_observes_existence() {
        let cloud = MockCloud::new();
        cloud
            .insert(&wid("w1"), Version::Ga, json!({"name": "w1", "shape": "square"}))
            .await
            .unwrap();

        let want = want_graph(&["w1", "w2"]);
        let outcome = sync(&cloud, &want).await.unwrap();
        assert!(outcome.failures.is_empty());

        let w1 = outcome.graph.get(&wid("w1")).unwrap();
        assert_eq!(w1.state(), NodeState::Exists);
        assert_eq!(w1.resource_value().unwrap()["shape"], "square");

        let w2 = outcome.graph.get(&wid("w2")).unwrap();
        assert_eq!(w2.state(), NodeState::DoesNotExist);
        assert!(w2.resource_value().is_none());
    }

    #[tokio::test]
    async fn test_sync_records_failures_leniently() {
        let cloud = MockCloud::new();
        cloud.inject_error(
            wid("w1"),
            MockOp::Get,
            CloudError::Rpc {
                op: "get",
                id: wid("w1"),
                message: "backend unavailable".into(),
            },
        );

        let want = want_graph(&["w1", "w2"]);
        let outcome = sync(&cloud, &want).await.unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, wid("w1"));
        // The failed node's observation is unknown, the rest proceed.
        assert_eq!(
            outcome.graph.get(&wid("w1")).unwrap().state(),
            NodeState::Unknown
        );
        assert_eq!(
            outcome.graph.get(&wid("w2")).unwrap().state(),
            NodeState::DoesNotExist
        );
    }

    #[tokio::test]
    async fn test_sync_strict_fails_fast() {
        let cloud = MockCloud::new();
        cloud.inject_error(
            wid("w1"),
            MockOp::Get,
            CloudError::Rpc {
                op: "get",
                id: wid("w1"),
                message: "backend unavailable".into(),
            },
        );
        let want = want_graph(&["w1"]);
        let err = sync_with(&cloud, &want, SyncStrategy::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Fetch { .. }));
    }
}

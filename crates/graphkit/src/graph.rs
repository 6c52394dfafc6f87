//! The resource graph: nodes keyed by identity plus the reference edge set.
//!
//! [`GraphBuilder`] accumulates node builders and validates the graph
//! invariants at build time: unique IDs and no dangling reference targets.
//! The built [`Graph`] is immutable; planning never mutates it. Insertion
//! order is preserved and serves as the executors' deterministic tiebreak.

use crate::meta::ResourceID;
use crate::node::{Node, NodeBuilder};
use crate::resource::{ResourceError, ResourceRef};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Invariant violation detected while building a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node {0}")]
    DuplicateNode(ResourceID),
    #[error("{from} references {to}, which is not in the graph")]
    DanglingRef { from: ResourceID, to: ResourceID },
    #[error("{0} is managed and expected to exist, but has no resource")]
    MissingResource(ResourceID),
    #[error("{0} should not exist, but carries a resource")]
    UnexpectedResource(ResourceID),
    #[error(transparent)]
    Resource(Box<ResourceError>),
}

/// Accumulates node builders into a validated [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    builders: Vec<Box<dyn NodeBuilder>>,
    allow_unresolved_refs: bool,
}

impl GraphBuilder {
    pub fn new() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn add(&mut self, builder: Box<dyn NodeBuilder>) -> &mut Self {
        self.builders.push(builder);
        self
    }

    /// Drop edges whose target is outside the graph instead of failing.
    ///
    /// Observed graphs are built this way: live cloud state may reference
    /// objects the caller does not model.
    pub(crate) fn allow_unresolved_refs(&mut self) -> &mut Self {
        self.allow_unresolved_refs = true;
        self
    }

    pub fn builders_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn NodeBuilder>> {
        self.builders.iter_mut()
    }

    /// Materialize every node, harvest the edge set, and verify invariants.
    pub fn build(&self) -> Result<Graph, GraphError> {
        let mut nodes: Vec<Box<dyn Node>> = Vec::with_capacity(self.builders.len());
        let mut index: HashMap<ResourceID, usize> = HashMap::with_capacity(self.builders.len());

        for builder in &self.builders {
            let node = builder.build()?;
            if index.contains_key(node.id()) {
                return Err(GraphError::DuplicateNode(node.id().clone()));
            }
            index.insert(node.id().clone(), nodes.len());
            nodes.push(node);
        }

        let mut edges: Vec<ResourceRef> = Vec::new();
        for node in &nodes {
            for edge in node.out_refs() {
                if !index.contains_key(&edge.to) {
                    if self.allow_unresolved_refs {
                        log::debug!("dropping unresolved edge {} -> {}", edge.from, edge.to);
                        continue;
                    }
                    return Err(GraphError::DanglingRef {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                    });
                }
                edges.push(edge.clone());
            }
        }

        Ok(Graph {
            nodes,
            index,
            edges,
        })
    }
}

/// Immutable collection of nodes and reference edges.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Box<dyn Node>>,
    index: HashMap<ResourceID, usize>,
    edges: Vec<ResourceRef>,
}

impl Graph {
    /// Nodes in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Node> {
        self.nodes.iter().map(|n| n.as_ref())
    }

    pub fn get(&self, id: &ResourceID) -> Option<&dyn Node> {
        self.index.get(id).map(|i| self.nodes[*i].as_ref())
    }

    pub fn edges(&self) -> &[ResourceRef] {
        &self.edges
    }

    /// Edges pointing at the given node.
    pub fn in_refs(&self, id: &ResourceID) -> impl Iterator<Item = &ResourceRef> {
        self.edges.iter().filter(move |e| e.to == *id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Projects, regions, and zones the graph's resources span.
    pub fn scope(&self) -> GraphScope {
        let mut scope = GraphScope::default();
        for node in &self.nodes {
            let id = node.id();
            scope.projects.insert(id.project.clone());
            match id.key.scope() {
                crate::meta::Scope::Global => {}
                crate::meta::Scope::Regional => {
                    scope.regions.insert(id.key.location().unwrap_or("").to_string());
                }
                crate::meta::Scope::Zonal => {
                    scope.zones.insert(id.key.location().unwrap_or("").to_string());
                }
            }
        }
        scope
    }

    /// Clone every node back into a builder, e.g. to sync observed state.
    pub fn to_builder(&self) -> GraphBuilder {
        let mut gb = GraphBuilder::new();
        for node in &self.nodes {
            gb.add(node.to_builder());
        }
        gb
    }
}

/// The identity space a graph covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphScope {
    pub projects: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub zones: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Key, ResourceID, Version};
    use crate::node::{NodeState, Ownership, TypedBuilder};
    use crate::testkind::WidgetKind;
    use serde_json::json;

    fn widget(name: &str, backend: Option<&str>) -> Box<dyn NodeBuilder> {
        let mut b = TypedBuilder::<WidgetKind>::new("proj-1", Key::global(name));
        b.set_ownership(Ownership::Managed);
        b.set_state(NodeState::Exists);
        let body = match backend {
            Some(target) => {
                let link = ResourceID::new("proj-1", "widgets", Key::global(target))
                    .self_link(Version::Ga);
                json!({"shape": "round", "backend": link})
            }
            None => json!({"shape": "round"}),
        };
        b.set_resource_value(Version::Ga, body).unwrap();
        Box::new(b)
    }

    #[test]
    fn test_build_and_lookup() {
        let mut gb = GraphBuilder::new();
        gb.add(widget("w1", Some("w2")));
        gb.add(widget("w2", None));
        let graph = gb.build().unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        let id = ResourceID::new("proj-1", "widgets", Key::global("w2"));
        assert!(graph.get(&id).is_some());
        assert_eq!(graph.in_refs(&id).count(), 1);
        assert_eq!(graph.scope().projects.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut gb = GraphBuilder::new();
        gb.add(widget("w1", None));
        gb.add(widget("w1", None));
        let err = gb.build().unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(_)));
    }

    #[test]
    fn test_dangling_ref_rejected() {
        let mut gb = GraphBuilder::new();
        gb.add(widget("w1", Some("ghost")));
        let err = gb.build().unwrap_err();
        assert!(matches!(err, GraphError::DanglingRef { .. }));
    }

    #[test]
    fn test_unresolved_refs_dropped_when_allowed() {
        let mut gb = GraphBuilder::new();
        gb.add(widget("w1", Some("ghost")));
        gb.allow_unresolved_refs();
        let graph = gb.build().unwrap();
        assert_eq!(graph.edges().len(), 0);
        // The node itself still reports the reference.
        assert_eq!(graph.all().next().unwrap().out_refs().len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut gb = GraphBuilder::new();
        for name in ["c", "a", "b"] {
            gb.add(widget(name, None));
        }
        let graph = gb.build().unwrap();
        let names: Vec<&str> = graph.all().map(|n| n.id().key.name()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}

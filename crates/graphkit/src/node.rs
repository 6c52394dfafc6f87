//! Graph nodes and their mutable builders.
//!
//! A node pairs a resource identity with ownership, desired state, and an
//! optional resource body. Builders are the mutable staging form; building
//! enforces the state/resource invariants. Both traits are object-safe so a
//! graph can hold nodes of heterogeneous resource kinds; [`TypedBuilder`] and
//! [`TypedNode`] are the single generic implementation resource kinds plug
//! into.

use crate::cloud::{CloudClient, CloudError};
use crate::graph::GraphError;
use crate::meta::{Key, ResourceID, Version};
use crate::resource::{Mutable, Resource, ResourceError, ResourceKind, ResourceRef};
use crate::traits::FieldTraits;
use crate::value::ConversionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who controls a resource's lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// The engine may create, update, and delete the resource.
    Managed,
    /// Assumed present; never mutated by the engine.
    External,
    #[default]
    Unknown,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Managed => write!(f, "managed"),
            Ownership::External => write!(f, "external"),
            Ownership::Unknown => write!(f, "unknown"),
        }
    }
}

/// Existence state of a resource, desired or observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeState {
    Exists,
    DoesNotExist,
    #[default]
    Unknown,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Exists => write!(f, "exists"),
            NodeState::DoesNotExist => write!(f, "does-not-exist"),
            NodeState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Mutable staging form of a graph node.
#[async_trait]
pub trait NodeBuilder: Send + Sync + fmt::Debug {
    fn id(&self) -> &ResourceID;
    fn kind(&self) -> &'static str;

    fn ownership(&self) -> Ownership;
    fn set_ownership(&mut self, ownership: Ownership);

    fn state(&self) -> NodeState;
    fn set_state(&mut self, state: NodeState);

    /// Serialized desired resource body, if one is set.
    fn resource_value(&self) -> Option<&Value>;

    /// Set the desired resource from a serialized body, validating it
    /// against the kind's schema and trait table.
    fn set_resource_value(&mut self, version: Version, body: Value) -> Result<(), ResourceError>;

    /// Replace the resource with the observed state from the cloud.
    ///
    /// A NotFound observation sets the state to [`NodeState::DoesNotExist`];
    /// it is not an error.
    async fn sync_from_cloud(&mut self, cloud: &dyn CloudClient) -> Result<(), CloudError>;

    /// References harvested from the desired resource body.
    fn out_refs(&self) -> Result<Vec<ResourceRef>, ResourceError>;

    fn build(&self) -> Result<Box<dyn Node>, GraphError>;
}

/// Immutable graph node.
pub trait Node: Send + Sync + fmt::Debug {
    fn id(&self) -> &ResourceID;
    fn kind(&self) -> &'static str;
    fn ownership(&self) -> Ownership;
    fn state(&self) -> NodeState;

    /// Authoritative version of the resource body.
    fn version(&self) -> Version;

    fn resource_value(&self) -> Option<&Value>;

    /// Resource body converted to the given version, if a body is present.
    fn value_in(&self, version: Version) -> Result<Option<Value>, ConversionError>;

    fn field_traits(&self) -> FieldTraits;

    fn out_refs(&self) -> &[ResourceRef];

    /// Clone back into a builder, e.g. for syncing observed state.
    fn to_builder(&self) -> Box<dyn NodeBuilder>;
}

/// Generic [`NodeBuilder`] implementation for a resource kind.
pub struct TypedBuilder<K: ResourceKind> {
    id: ResourceID,
    ownership: Ownership,
    state: NodeState,
    resource: Option<Resource<K>>,
}

impl<K: ResourceKind> TypedBuilder<K> {
    pub fn new(project: &str, key: Key) -> TypedBuilder<K> {
        TypedBuilder {
            id: ResourceID::new(project, K::KIND, key),
            ownership: Ownership::Unknown,
            state: NodeState::Unknown,
            resource: None,
        }
    }

    /// Builder seeded with a frozen resource.
    pub fn with_resource(resource: Resource<K>) -> TypedBuilder<K> {
        TypedBuilder {
            id: resource.id().clone(),
            ownership: Ownership::Unknown,
            state: NodeState::Unknown,
            resource: Some(resource),
        }
    }

    pub fn set_resource(&mut self, resource: Resource<K>) {
        self.resource = Some(resource);
    }

    pub fn resource(&self) -> Option<&Resource<K>> {
        self.resource.as_ref()
    }

    fn version(&self) -> Version {
        self.resource
            .as_ref()
            .map(|r| r.version())
            .unwrap_or_default()
    }
}

impl<K: ResourceKind> fmt::Debug for TypedBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBuilder")
            .field("id", &self.id)
            .field("ownership", &self.ownership)
            .field("state", &self.state)
            .field("resource", &self.resource)
            .finish()
    }
}

#[async_trait]
impl<K: ResourceKind> NodeBuilder for TypedBuilder<K> {
    fn id(&self) -> &ResourceID {
        &self.id
    }

    fn kind(&self) -> &'static str {
        K::KIND
    }

    fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    fn state(&self) -> NodeState {
        self.state
    }

    fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    fn resource_value(&self) -> Option<&Value> {
        self.resource.as_ref().map(|r| r.value())
    }

    fn set_resource_value(&mut self, version: Version, body: Value) -> Result<(), ResourceError> {
        let mut m = Mutable::<K>::new_in_version(&self.id.project, self.id.key.clone(), version);
        match version {
            Version::Ga => {
                let typed: K::Ga = serde_json::from_value(body)?;
                m.access(|x| *x = typed)?;
            }
            Version::Beta => {
                let typed: K::Beta = serde_json::from_value(body)?;
                m.access_beta(|x| *x = typed)?;
            }
            Version::Alpha => {
                let typed: K::Alpha = serde_json::from_value(body)?;
                m.access_alpha(|x| *x = typed)?;
            }
        }
        self.resource = Some(m.freeze()?);
        Ok(())
    }

    async fn sync_from_cloud(&mut self, cloud: &dyn CloudClient) -> Result<(), CloudError> {
        let version = self.version();
        match cloud.get(&self.id, version).await {
            Ok(body) => {
                log::debug!("sync {}: exists", self.id);
                self.resource = Some(Resource::from_observed(self.id.clone(), version, body));
                self.state = NodeState::Exists;
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                log::debug!("sync {}: does not exist", self.id);
                self.resource = None;
                self.state = NodeState::DoesNotExist;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn out_refs(&self) -> Result<Vec<ResourceRef>, ResourceError> {
        match &self.resource {
            Some(r) => Ok(r.out_refs()?),
            None => Ok(Vec::new()),
        }
    }

    fn build(&self) -> Result<Box<dyn Node>, GraphError> {
        match self.state {
            NodeState::Exists
                if self.ownership == Ownership::Managed && self.resource.is_none() =>
            {
                return Err(GraphError::MissingResource(self.id.clone()));
            }
            NodeState::DoesNotExist if self.resource.is_some() => {
                return Err(GraphError::UnexpectedResource(self.id.clone()));
            }
            _ => {}
        }
        let out_refs = self
            .out_refs()
            .map_err(|e| GraphError::Resource(Box::new(e)))?;
        Ok(Box::new(TypedNode::<K> {
            id: self.id.clone(),
            ownership: self.ownership,
            state: self.state,
            resource: self.resource.clone(),
            out_refs,
        }))
    }
}

/// Generic [`Node`] implementation for a resource kind.
pub struct TypedNode<K: ResourceKind> {
    id: ResourceID,
    ownership: Ownership,
    state: NodeState,
    resource: Option<Resource<K>>,
    out_refs: Vec<ResourceRef>,
}

impl<K: ResourceKind> fmt::Debug for TypedNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedNode")
            .field("id", &self.id)
            .field("ownership", &self.ownership)
            .field("state", &self.state)
            .field("resource", &self.resource)
            .finish()
    }
}

impl<K: ResourceKind> Node for TypedNode<K> {
    fn id(&self) -> &ResourceID {
        &self.id
    }

    fn kind(&self) -> &'static str {
        K::KIND
    }

    fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn state(&self) -> NodeState {
        self.state
    }

    fn version(&self) -> Version {
        self.resource
            .as_ref()
            .map(|r| r.version())
            .unwrap_or_default()
    }

    fn resource_value(&self) -> Option<&Value> {
        self.resource.as_ref().map(|r| r.value())
    }

    fn value_in(&self, version: Version) -> Result<Option<Value>, ConversionError> {
        match &self.resource {
            Some(r) => Ok(Some(r.value_in(version)?)),
            None => Ok(None),
        }
    }

    fn field_traits(&self) -> FieldTraits {
        K::field_traits(self.version())
    }

    fn out_refs(&self) -> &[ResourceRef] {
        &self.out_refs
    }

    fn to_builder(&self) -> Box<dyn NodeBuilder> {
        Box::new(TypedBuilder::<K> {
            id: self.id.clone(),
            ownership: self.ownership,
            state: self.state,
            resource: self.resource.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudClient, MockCloud};
    use crate::testkind::WidgetKind;
    use serde_json::json;

    fn builder(name: &str) -> TypedBuilder<WidgetKind> {
        TypedBuilder::new("proj-1", Key::global(name))
    }

    #[test]
    fn test_build_requires_resource_for_managed_exists() {
        let mut b = builder("w1");
        b.set_ownership(Ownership::Managed);
        b.set_state(NodeState::Exists);
        let err = b.build().unwrap_err();
        assert!(matches!(err, GraphError::MissingResource(_)));

        b.set_resource_value(Version::Ga, json!({"shape": "round"}))
            .unwrap();
        let node = b.build().unwrap();
        assert_eq!(node.state(), NodeState::Exists);
        assert_eq!(node.resource_value().unwrap()["name"], "w1");
    }

    #[test]
    fn test_build_forbids_resource_when_absent() {
        let mut b = builder("w1");
        b.set_ownership(Ownership::Managed);
        b.set_state(NodeState::DoesNotExist);
        b.set_resource_value(Version::Ga, json!({})).unwrap();
        let err = b.build().unwrap_err();
        assert!(matches!(err, GraphError::UnexpectedResource(_)));
    }

    #[test]
    fn test_out_refs_harvested() {
        let mut b = builder("w1");
        b.set_ownership(Ownership::Managed);
        b.set_state(NodeState::Exists);
        let link = ResourceID::new("proj-1", "widgets", Key::global("w2")).self_link(Version::Ga);
        b.set_resource_value(Version::Ga, json!({"backend": link}))
            .unwrap();
        let node = b.build().unwrap();
        assert_eq!(node.out_refs().len(), 1);
        assert_eq!(node.out_refs()[0].to.key.name(), "w2");
    }

    #[tokio::test]
    async fn test_sync_from_cloud() {
        let cloud = MockCloud::new();
        let mut b = builder("w1");
        b.set_ownership(Ownership::Managed);
        b.sync_from_cloud(&cloud).await.unwrap();
        assert_eq!(b.state(), NodeState::DoesNotExist);
        assert!(b.resource_value().is_none());

        cloud
            .insert(b.id(), Version::Ga, json!({"name": "w1", "shape": "round"}))
            .await
            .unwrap();
        b.sync_from_cloud(&cloud).await.unwrap();
        assert_eq!(b.state(), NodeState::Exists);
        assert_eq!(b.resource_value().unwrap()["shape"], "round");
    }
}

//! Builds node builders from dynamic input.
//!
//! The factory resolves the API version and project for each service through
//! the resolver callbacks, then constructs a typed builder for the named
//! kind from a serialized body. This is the seam the CLI and test harnesses
//! use to assemble graphs without naming concrete kind types.

use crate::backend_service::BackendServiceKind;
use crate::forwarding_rule::ForwardingRuleKind;
use crate::health_check::HealthCheckKind;
use crate::mesh::MeshKind;
use crate::network_endpoint_group::NetworkEndpointGroupKind;
use crate::target_http_proxy::TargetHttpProxyKind;
use crate::tcp_route::TcpRouteKind;
use crate::url_map::UrlMapKind;
use graphkit::{
    Key, NodeBuilder, NodeState, Ownership, ProjectRouter, ResourceError, ResourceKind, Scope,
    TypedBuilder, VersionResolver,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Collection names the factory can build.
pub const KINDS: &[&str] = &[
    "backendServices",
    "forwardingRules",
    "healthChecks",
    "meshes",
    "networkEndpointGroups",
    "targetHttpProxies",
    "tcpRoutes",
    "urlMaps",
];

/// Where a resource lives within its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Global,
    Region(String),
    Zone(String),
}

impl Location {
    pub fn scope(&self) -> Scope {
        match self {
            Location::Global => Scope::Global,
            Location::Region(_) => Scope::Regional,
            Location::Zone(_) => Scope::Zonal,
        }
    }

    fn key(&self, name: &str) -> Key {
        match self {
            Location::Global => Key::global(name),
            Location::Region(region) => Key::regional(name, region.clone()),
            Location::Zone(zone) => Key::zonal(name, zone.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("unknown resource kind {0:?}")]
    UnknownKind(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Constructs node builders with project and version resolved per service.
pub struct Factory {
    projects: Arc<dyn ProjectRouter>,
    versions: Arc<dyn VersionResolver>,
}

impl Factory {
    pub fn new(projects: Arc<dyn ProjectRouter>, versions: Arc<dyn VersionResolver>) -> Factory {
        Factory { projects, versions }
    }

    /// Everything in one project at the GA surface.
    pub fn single_project(project: impl Into<String>) -> Factory {
        Factory::new(
            Arc::new(graphkit::SingleProjectRouter::new(project)),
            Arc::new(graphkit::FixedVersionResolver::default()),
        )
    }

    /// Build a node builder for `kind` from a serialized body.
    ///
    /// `body` is required for managed nodes expected to exist; pass `None`
    /// for nodes being deleted or externally owned.
    pub fn builder(
        &self,
        kind: &str,
        name: &str,
        location: Location,
        ownership: Ownership,
        state: NodeState,
        body: Option<Value>,
    ) -> Result<Box<dyn NodeBuilder>, FactoryError> {
        match kind {
            "backendServices" => {
                self.make::<BackendServiceKind>(name, location, ownership, state, body)
            }
            "forwardingRules" => {
                self.make::<ForwardingRuleKind>(name, location, ownership, state, body)
            }
            "healthChecks" => self.make::<HealthCheckKind>(name, location, ownership, state, body),
            "meshes" => self.make::<MeshKind>(name, location, ownership, state, body),
            "networkEndpointGroups" => {
                self.make::<NetworkEndpointGroupKind>(name, location, ownership, state, body)
            }
            "targetHttpProxies" => {
                self.make::<TargetHttpProxyKind>(name, location, ownership, state, body)
            }
            "tcpRoutes" => self.make::<TcpRouteKind>(name, location, ownership, state, body),
            "urlMaps" => self.make::<UrlMapKind>(name, location, ownership, state, body),
            other => Err(FactoryError::UnknownKind(other.to_string())),
        }
    }

    fn make<K: ResourceKind>(
        &self,
        name: &str,
        location: Location,
        ownership: Ownership,
        state: NodeState,
        body: Option<Value>,
    ) -> Result<Box<dyn NodeBuilder>, FactoryError> {
        let version = self.versions.version(K::KIND, location.scope());
        let project = self.projects.project_id(version, K::KIND);
        let mut builder = TypedBuilder::<K>::new(&project, location.key(name));
        builder.set_ownership(ownership);
        builder.set_state(state);
        if let Some(body) = body {
            builder.set_resource_value(version, body)?;
        }
        Ok(Box::new(builder))
    }
}

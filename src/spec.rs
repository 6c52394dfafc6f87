//! Graph spec and cloud state seed files.
//!
//! The spec file declares the desired graph; the state file seeds the
//! offline cloud the CLI plans against. The real API wrappers live behind
//! the `CloudClient` trait and are out of scope here, so the CLI doubles as
//! the engine's test harness.

use anyhow::{Context, Result};
use graphkit::{Graph, GraphBuilder, Key, MockCloud, NodeState, Ownership, ResourceID, Version};
use netkit::{Factory, Location};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// Desired graph: a project plus one entry per resource.
#[derive(Debug, Deserialize)]
pub struct GraphSpec {
    pub project: String,
    pub resources: Vec<ResourceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSpec {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default = "default_ownership")]
    pub ownership: Ownership,
    #[serde(default = "default_state")]
    pub state: NodeState,
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_ownership() -> Ownership {
    Ownership::Managed
}

fn default_state() -> NodeState {
    NodeState::Exists
}

impl ResourceSpec {
    fn location(&self) -> Location {
        match (&self.region, &self.zone) {
            (Some(region), _) => Location::Region(region.clone()),
            (None, Some(zone)) => Location::Zone(zone.clone()),
            (None, None) => Location::Global,
        }
    }
}

impl GraphSpec {
    pub fn load(path: &Path) -> Result<GraphSpec> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading spec {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing spec {}", path.display()))
    }

    /// Build the desired graph through the resource factory.
    pub fn build_graph(&self) -> Result<Graph> {
        let factory = Factory::single_project(&self.project);
        let mut gb = GraphBuilder::new();
        for resource in &self.resources {
            let builder = factory
                .builder(
                    &resource.kind,
                    &resource.name,
                    resource.location(),
                    resource.ownership,
                    resource.state,
                    resource.body.clone(),
                )
                .with_context(|| format!("resource {}/{}", resource.kind, resource.name))?;
            gb.add(builder);
        }
        gb.build().context("building desired graph")
    }
}

/// Seed objects for the offline cloud.
#[derive(Debug, Deserialize)]
pub struct StateSeed {
    pub objects: Vec<SeedObject>,
}

#[derive(Debug, Deserialize)]
pub struct SeedObject {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub version: Version,
    pub body: Value,
}

impl StateSeed {
    pub fn load(path: &Path) -> Result<StateSeed> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading state {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing state {}", path.display()))
    }

    pub fn apply(&self, cloud: &MockCloud, project: &str) {
        for object in &self.objects {
            let key = match (&object.region, &object.zone) {
                (Some(region), _) => Key::regional(&object.name, region),
                (None, Some(zone)) => Key::zonal(&object.name, zone),
                (None, None) => Key::global(&object.name),
            };
            let id = ResourceID::new(project, &object.kind, key);
            cloud.seed(id, object.version, object.body.clone());
        }
    }
}

//! Service meshes (network services API).

use graphkit::{FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mesh {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Sidecar interception port; unset means the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interception_port: Option<i64>,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

pub enum MeshKind {}

impl ResourceKind for MeshKind {
    type Ga = Mesh;
    type Beta = Mesh;
    type Alpha = Mesh;

    const KIND: &'static str = "meshes";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt
    }

    fn out_refs(_id: &ResourceID, _body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        Ok(Vec::new())
    }
}

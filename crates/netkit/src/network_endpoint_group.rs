//! Network endpoint groups.

use graphkit::{FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkEndpointGroup {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Endpoint type, e.g. `GCE_VM_IP_PORT`. Immutable.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_endpoint_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_port: Option<i64>,
    /// Opaque network and subnetwork URLs; not modeled as graph edges.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnetwork: String,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

pub enum NetworkEndpointGroupKind {}

impl ResourceKind for NetworkEndpointGroupKind {
    type Ga = NetworkEndpointGroup;
    type Beta = NetworkEndpointGroup;
    type Alpha = NetworkEndpointGroup;

    const KIND: &'static str = "networkEndpointGroups";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("id"));
        dt.output_only(Path::root().deref().field("size"));
        dt.output_only(Path::root().deref().field("zone"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt.non_updatable(Path::root().deref().field("networkEndpointType"));
        dt.non_updatable(Path::root().deref().field("network"));
        dt
    }

    fn out_refs(_id: &ResourceID, _body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkit::{Key, Mutable};

    #[test]
    fn test_zonal_key() {
        let mut m = Mutable::<NetworkEndpointGroupKind>::new(
            "proj-1",
            Key::zonal("neg1", "us-central1-c"),
        );
        m.access(|neg| neg.network_endpoint_type = "GCE_VM_IP_PORT".to_string())
            .unwrap();
        let r = m.freeze().unwrap();
        assert!(
            r.id()
                .self_link(Version::Ga)
                .contains("/zones/us-central1-c/networkEndpointGroups/neg1")
        );
    }
}

//! TCP routes (network services API).
//!
//! A TCP route attaches to one or more meshes and steers matched traffic at
//! backend services.

use graphkit::{
    FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version, link_ref,
    value_list_refs,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpRoute {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Self-links of the meshes this route is attached to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gateways: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<TcpRouteRule>,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpRouteRule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<TcpRouteMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<TcpRouteAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpRouteMatch {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpRouteAction {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<TcpRouteDestination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_destination: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpRouteDestination {
    /// Self-link of the backend service traffic is sent to.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

pub enum TcpRouteKind {}

impl ResourceKind for TcpRouteKind {
    type Ga = TcpRoute;
    type Beta = TcpRoute;
    type Alpha = TcpRoute;

    const KIND: &'static str = "tcpRoutes";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt
    }

    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        let mut refs = value_list_refs(id, body, "meshes")?;
        if let Some(rules) = body.get("rules").and_then(Value::as_array) {
            for (i, rule) in rules.iter().enumerate() {
                let destinations = rule
                    .get("action")
                    .and_then(|a| a.get("destinations"))
                    .and_then(Value::as_array);
                let Some(destinations) = destinations else {
                    continue;
                };
                for (j, destination) in destinations.iter().enumerate() {
                    if let Some(service) = destination.get("serviceName").and_then(Value::as_str)
                        && !service.is_empty()
                    {
                        refs.push(link_ref(
                            id,
                            Path::root()
                                .field("rules")
                                .index(i)
                                .field("action")
                                .field("destinations")
                                .index(j)
                                .field("serviceName"),
                            service,
                        )?);
                    }
                }
            }
        }
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkit::Key;
    use serde_json::json;

    #[test]
    fn test_mesh_and_service_refs() {
        let id = ResourceID::new("proj-1", "tcpRoutes", Key::global("route1"));
        let mesh = ResourceID::new("proj-1", "meshes", Key::global("mesh1"));
        let bs = ResourceID::new("proj-1", "backendServices", Key::global("bs1"));
        let body = json!({
            "name": "route1",
            "meshes": [mesh.self_link(Version::Ga)],
            "rules": [{
                "action": {"destinations": [{"serviceName": bs.self_link(Version::Ga)}]},
            }],
        });
        let refs = TcpRouteKind::out_refs(&id, &body).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].to, mesh);
        assert_eq!(refs[1].to, bs);
        assert_eq!(
            refs[1].path.to_string(),
            ".rules[0].action.destinations[0].serviceName"
        );
    }

    #[test]
    fn test_mesh_ref_accepts_location_links() {
        let id = ResourceID::new("proj-1", "tcpRoutes", Key::global("route1"));
        let body = json!({
            "meshes": ["https://networkservices.googleapis.com/v1alpha1/projects/proj-1/locations/global/meshes/mcs-mesh"],
        });
        let refs = TcpRouteKind::out_refs(&id, &body).unwrap();
        assert_eq!(refs[0].to.key.name(), "mcs-mesh");
        assert_eq!(refs[0].to.resource, "meshes");
    }
}

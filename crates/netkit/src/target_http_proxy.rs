//! Target HTTP proxies.

use graphkit::{
    FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version, value_str_ref,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetHttpProxy {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Self-link of the URL map routing this proxy's requests.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url_map: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_bind: Option<bool>,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

pub enum TargetHttpProxyKind {}

impl ResourceKind for TargetHttpProxyKind {
    type Ga = TargetHttpProxy;
    type Beta = TargetHttpProxy;
    type Alpha = TargetHttpProxy;

    const KIND: &'static str = "targetHttpProxies";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("fingerprint"));
        dt.output_only(Path::root().deref().field("id"));
        dt.output_only(Path::root().deref().field("region"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt.inherit_value(Path::root().deref().field("fingerprint"));
        dt
    }

    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        Ok(value_str_ref(id, body, "urlMap")?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkit::Key;
    use serde_json::json;

    #[test]
    fn test_url_map_ref() {
        let id = ResourceID::new("proj-1", "targetHttpProxies", Key::global("proxy1"));
        let um = ResourceID::new("proj-1", "urlMaps", Key::global("um1"));
        let refs = TargetHttpProxyKind::out_refs(
            &id,
            &json!({"name": "proxy1", "urlMap": um.self_link(Version::Ga)}),
        )
        .unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].to, um);
    }

    #[test]
    fn test_no_refs_when_unset() {
        let id = ResourceID::new("proj-1", "targetHttpProxies", Key::global("proxy1"));
        let refs = TargetHttpProxyKind::out_refs(&id, &json!({"name": "proxy1"})).unwrap();
        assert!(refs.is_empty());
    }
}

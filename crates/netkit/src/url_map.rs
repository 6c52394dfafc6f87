//! URL maps.

use graphkit::{
    FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version, link_ref,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlMap {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Self-link of the backend service handling unmatched requests.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_service: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host_rules: Vec<HostRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path_matchers: Vec<PathMatcher>,

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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostRule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_matcher: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathMatcher {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_service: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path_rules: Vec<PathRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathRule {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
}

pub enum UrlMapKind {}

impl ResourceKind for UrlMapKind {
    type Ga = UrlMap;
    type Beta = UrlMap;
    type Alpha = UrlMap;

    const KIND: &'static str = "urlMaps";

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
        let mut refs = Vec::new();
        let mut push = |path: Path, link: Option<&str>| -> Result<(), RefError> {
            if let Some(link) = link.filter(|l| !l.is_empty()) {
                refs.push(link_ref(id, path, link)?);
            }
            Ok(())
        };

        push(
            Path::root().field("defaultService"),
            body.get("defaultService").and_then(Value::as_str),
        )?;
        if let Some(matchers) = body.get("pathMatchers").and_then(Value::as_array) {
            for (i, matcher) in matchers.iter().enumerate() {
                let base = Path::root().field("pathMatchers").index(i);
                push(
                    base.clone().field("defaultService"),
                    matcher.get("defaultService").and_then(Value::as_str),
                )?;
                if let Some(rules) = matcher.get("pathRules").and_then(Value::as_array) {
                    for (j, rule) in rules.iter().enumerate() {
                        push(
                            base.clone().field("pathRules").index(j).field("service"),
                            rule.get("service").and_then(Value::as_str),
                        )?;
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
    fn test_nested_service_refs() {
        let id = ResourceID::new("proj-1", "urlMaps", Key::global("um1"));
        let bs = |name: &str| {
            ResourceID::new("proj-1", "backendServices", Key::global(name)).self_link(Version::Ga)
        };
        let body = json!({
            "name": "um1",
            "defaultService": bs("bs-default"),
            "pathMatchers": [{
                "name": "api",
                "defaultService": bs("bs-api"),
                "pathRules": [{"paths": ["/v2/*"], "service": bs("bs-v2")}],
            }],
        });
        let refs = UrlMapKind::out_refs(&id, &body).unwrap();
        let paths: Vec<String> = refs.iter().map(|r| r.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                ".defaultService",
                ".pathMatchers[0].defaultService",
                ".pathMatchers[0].pathRules[0].service",
            ]
        );
        assert!(refs.iter().all(|r| r.to.resource == "backendServices"));
    }
}

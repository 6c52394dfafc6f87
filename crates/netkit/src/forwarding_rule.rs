//! Forwarding rules.
//!
//! See <https://cloud.google.com/compute/docs/reference/rest/beta/forwardingRules>.

use graphkit::{
    FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version, value_str_ref,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardingRule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "IPAddress", skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(rename = "IPProtocol", skip_serializing_if = "String::is_empty")]
    pub ip_protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port_range: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Immutable once created.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub load_balancing_scheme: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subnetwork: String,
    /// Self-link of the target proxy receiving the traffic.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_forwarding_rule: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label_fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub psc_connection_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_name: String,
}

pub enum ForwardingRuleKind {}

impl ResourceKind for ForwardingRuleKind {
    type Ga = ForwardingRule;
    type Beta = ForwardingRule;
    type Alpha = ForwardingRule;

    const KIND: &'static str = "forwardingRules";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("baseForwardingRule"));
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("fingerprint"));
        dt.output_only(Path::root().deref().field("id"));
        dt.output_only(Path::root().deref().field("labelFingerprint"));
        dt.output_only(Path::root().deref().field("pscConnectionId"));
        dt.output_only(Path::root().deref().field("pscConnectionStatus")); // Not documented
        dt.output_only(Path::root().deref().field("region"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt.output_only(Path::root().deref().field("serviceName"));

        dt.inherit_value(Path::root().deref().field("fingerprint"));
        dt.non_updatable(Path::root().deref().field("loadBalancingScheme"));
        dt.non_updatable(Path::root().deref().field("IPAddress"));
        dt
    }

    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        Ok(value_str_ref(id, body, "target")?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphkit::Key;
    use serde_json::json;

    #[test]
    fn test_target_ref() {
        let id = ResourceID::new("proj-1", "forwardingRules", Key::regional("fr1", "us-east1"));
        let proxy = ResourceID::new("proj-1", "targetHttpProxies", Key::global("proxy1"));
        let body = json!({"name": "fr1", "target": proxy.self_link(Version::Ga)});
        let refs = ForwardingRuleKind::out_refs(&id, &body).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].to, proxy);
        assert_eq!(refs[0].path.to_string(), ".target");
    }

    #[test]
    fn test_ip_address_is_recreate_only() {
        let dt = ForwardingRuleKind::field_traits(Version::Ga);
        assert!(dt.is_non_updatable(&Path::root().field("IPAddress")));
        assert!(!dt.is_non_updatable(&Path::root().field("target")));
    }
}

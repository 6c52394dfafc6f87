//! Backend services.
//!
//! A backend service groups backends (network endpoint groups) behind a
//! load-balancing policy and references the health checks probing them.
//! See <https://cloud.google.com/compute/docs/reference/rest/v1/backendServices>.

use graphkit::{
    FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version, link_ref,
    value_list_refs,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendService {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port_name: String,
    /// Immutable once created.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub load_balancing_scheme: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_affinity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<i64>,
    /// Self-links of the health checks probing this service.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backends: Vec<Backend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iap: Option<Iap>,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub security_policy: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edge_security_policy: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Backend {
    /// Self-link of the instance group or network endpoint group.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub balancing_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_scaler: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Iap {
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub oauth2_client_id: String,
    /// [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub oauth2_client_secret_sha256: String,
}

/// Alpha surface carries the high-availability policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendServiceAlpha {
    #[serde(flatten)]
    pub base: BackendService,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ha_policy: String,
}

pub enum BackendServiceKind {}

impl ResourceKind for BackendServiceKind {
    type Ga = BackendService;
    type Beta = BackendService;
    type Alpha = BackendServiceAlpha;

    const KIND: &'static str = "backendServices";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        // Built-ins
        dt.output_only(Path::root().deref().field("fingerprint"));

        // [Output Only]
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("edgeSecurityPolicy"));
        dt.output_only(Path::root().deref().field("id"));
        dt.output_only(Path::root().deref().field("region"));
        dt.output_only(Path::root().deref().field("securityPolicy"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt.output_only(
            Path::root()
                .deref()
                .field("iap")
                .field("oauth2ClientSecretSha256"),
        );

        dt.inherit_value(Path::root().deref().field("fingerprint"));
        dt.non_updatable(Path::root().deref().field("loadBalancingScheme"));
        dt
    }

    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, RefError> {
        let mut refs = value_list_refs(id, body, "healthChecks")?;
        if let Some(backends) = body.get("backends").and_then(Value::as_array) {
            for (i, backend) in backends.iter().enumerate() {
                if let Some(group) = backend.get("group").and_then(Value::as_str)
                    && !group.is_empty()
                {
                    refs.push(link_ref(
                        id,
                        Path::root().field("backends").index(i).field("group"),
                        group,
                    )?);
                }
            }
        }
        Ok(refs)
    }
}

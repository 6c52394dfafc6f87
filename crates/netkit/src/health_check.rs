//! Health checks.

use graphkit::{FieldTraits, Path, RefError, ResourceID, ResourceKind, ResourceRef, Version};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Probe protocol: `TCP`, `HTTP`, or `HTTPS`. Immutable.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub check_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_health_check: Option<TcpHealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_health_check: Option<HttpHealthCheck>,

    // [Output Only]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub creation_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TcpHealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub port_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpHealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host: String,
}

pub enum HealthCheckKind {}

impl ResourceKind for HealthCheckKind {
    type Ga = HealthCheck;
    type Beta = HealthCheck;
    type Alpha = HealthCheck;

    const KIND: &'static str = "healthChecks";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut dt = FieldTraits::new();
        dt.output_only(Path::root().deref().field("creationTimestamp"));
        dt.output_only(Path::root().deref().field("id"));
        dt.output_only(Path::root().deref().field("region"));
        dt.output_only(Path::root().deref().field("selfLink"));
        dt.non_updatable(Path::root().deref().field("type"));
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
    fn test_type_change_requires_recreate() {
        let dt = HealthCheckKind::field_traits(Version::Ga);
        assert!(dt.is_non_updatable(&Path::root().field("type")));
        assert!(!dt.is_non_updatable(&Path::root().field("checkIntervalSec")));
    }

    #[test]
    fn test_freeze_probe_config() {
        let mut m = Mutable::<HealthCheckKind>::new("proj-1", Key::global("hc1"));
        m.access(|hc| {
            hc.check_type = "TCP".to_string();
            hc.tcp_health_check = Some(TcpHealthCheck {
                port: Some(80),
                ..Default::default()
            });
        })
        .unwrap();
        let r = m.freeze().unwrap();
        assert_eq!(r.value()["type"], "TCP");
        assert_eq!(r.value()["tcpHealthCheck"]["port"], 80);
    }
}

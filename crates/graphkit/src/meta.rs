//! Resource identity: API versions, scopes, keys, and self-links.
//!
//! A [`ResourceID`] names one cloud object as `(project, collection, key)`
//! and doubles as the target of cross-resource references. It serializes to
//! and from the canonical self-link URL form used inside resource bodies.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Surface version of a resource schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    #[default]
    Ga,
    Beta,
    Alpha,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Ga => write!(f, "ga"),
            Version::Beta => write!(f, "beta"),
            Version::Alpha => write!(f, "alpha"),
        }
    }
}

/// API group a resource collection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiGroup {
    Compute,
    NetworkServices,
}

impl ApiGroup {
    /// The group serving a given collection name.
    pub fn for_collection(collection: &str) -> ApiGroup {
        match collection {
            "meshes" | "gateways" | "tcpRoutes" | "httpRoutes" | "grpcRoutes" => {
                ApiGroup::NetworkServices
            }
            _ => ApiGroup::Compute,
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            ApiGroup::Compute => "compute.googleapis.com",
            ApiGroup::NetworkServices => "networkservices.googleapis.com",
        }
    }

    /// URL path segment for a version within this group.
    pub fn version_segment(&self, version: Version) -> &'static str {
        match (self, version) {
            (ApiGroup::Compute, Version::Ga) => "v1",
            (ApiGroup::Compute, Version::Beta) => "beta",
            (ApiGroup::Compute, Version::Alpha) => "alpha",
            (ApiGroup::NetworkServices, Version::Ga) => "v1",
            (ApiGroup::NetworkServices, Version::Beta) => "v1beta1",
            (ApiGroup::NetworkServices, Version::Alpha) => "v1alpha1",
        }
    }

    fn version_from_segment(segment: &str) -> Option<Version> {
        match segment {
            "v1" => Some(Version::Ga),
            "beta" | "v1beta1" => Some(Version::Beta),
            "alpha" | "v1alpha1" => Some(Version::Alpha),
            _ => None,
        }
    }
}

/// Scope class of a resource key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Global,
    Regional,
    Zonal,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Regional => write!(f, "regional"),
            Scope::Zonal => write!(f, "zonal"),
        }
    }
}

/// Location of a resource within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Global { name: String },
    Regional { name: String, region: String },
    Zonal { name: String, zone: String },
}

impl Key {
    pub fn global(name: impl Into<String>) -> Key {
        Key::Global { name: name.into() }
    }

    pub fn regional(name: impl Into<String>, region: impl Into<String>) -> Key {
        Key::Regional {
            name: name.into(),
            region: region.into(),
        }
    }

    pub fn zonal(name: impl Into<String>, zone: impl Into<String>) -> Key {
        Key::Zonal {
            name: name.into(),
            zone: zone.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Key::Global { name } | Key::Regional { name, .. } | Key::Zonal { name, .. } => name,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Key::Global { .. } => Scope::Global,
            Key::Regional { .. } => Scope::Regional,
            Key::Zonal { .. } => Scope::Zonal,
        }
    }

    /// Region or zone, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            Key::Global { .. } => None,
            Key::Regional { region, .. } => Some(region),
            Key::Zonal { zone, .. } => Some(zone),
        }
    }

    /// Scope component of a self-link path, e.g. `global` or `regions/us-east1`.
    fn scope_path(&self) -> String {
        match self {
            Key::Global { .. } => "global".to_string(),
            Key::Regional { region, .. } => format!("regions/{region}"),
            Key::Zonal { zone, .. } => format!("zones/{zone}"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Global { name } => write!(f, "global/{name}"),
            Key::Regional { name, region } => write!(f, "regions/{region}/{name}"),
            Key::Zonal { name, zone } => write!(f, "zones/{zone}/{name}"),
        }
    }
}

/// Identity of one resource: project, collection name, and key.
///
/// This is the node identity in the resource graph and the target of
/// cross-resource references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceID {
    pub project: String,
    /// API collection name, e.g. `backendServices`.
    pub resource: String,
    pub key: Key,
}

impl ResourceID {
    pub fn new(project: impl Into<String>, resource: impl Into<String>, key: Key) -> ResourceID {
        ResourceID {
            project: project.into(),
            resource: resource.into(),
            key,
        }
    }

    pub fn api_group(&self) -> ApiGroup {
        ApiGroup::for_collection(&self.resource)
    }

    /// Relative resource name, e.g.
    /// `projects/p/global/backendServices/bs1` or, for network services
    /// collections, `projects/p/locations/global/meshes/m1`.
    pub fn relative_name(&self) -> String {
        let scope = match self.api_group() {
            ApiGroup::Compute => self.key.scope_path(),
            ApiGroup::NetworkServices => match &self.key {
                Key::Global { .. } => "locations/global".to_string(),
                Key::Regional { region, .. } => format!("locations/{region}"),
                Key::Zonal { zone, .. } => format!("locations/{zone}"),
            },
        };
        format!(
            "projects/{}/{}/{}/{}",
            self.project,
            scope,
            self.resource,
            self.key.name()
        )
    }

    /// Canonical self-link URL at the given version.
    pub fn self_link(&self, version: Version) -> String {
        let group = self.api_group();
        format!(
            "https://{}/{}/{}",
            group.host(),
            group.version_segment(version),
            self.relative_name()
        )
    }

    /// Parse a self-link URL back into a `ResourceID`.
    pub fn parse_self_link(link: &str) -> Result<ResourceID, LinkError> {
        let malformed = |reason: &str| LinkError::Malformed {
            link: link.to_string(),
            reason: reason.to_string(),
        };

        let rest = link
            .strip_prefix("https://")
            .or_else(|| link.strip_prefix("http://"))
            .ok_or_else(|| malformed("missing scheme"))?;
        let mut parts = rest.split('/');

        let host = parts.next().ok_or_else(|| malformed("missing host"))?;
        if host != ApiGroup::Compute.host() && host != ApiGroup::NetworkServices.host() {
            return Err(LinkError::UnknownHost {
                link: link.to_string(),
                host: host.to_string(),
            });
        }

        let version = parts.next().ok_or_else(|| malformed("missing version"))?;
        if ApiGroup::version_from_segment(version).is_none() {
            return Err(malformed("unknown version segment"));
        }

        if parts.next() != Some("projects") {
            return Err(malformed("expected projects segment"));
        }
        let project = parts.next().ok_or_else(|| malformed("missing project"))?;

        // Scope is `global`, `regions/<r>`, `zones/<z>`, or the network
        // services spelling `locations/<l>` where `<l> == global` means a
        // global key.
        enum ScopeTag {
            Global,
            Region(String),
            Zone(String),
        }
        let tag = match parts.next() {
            Some("global") => ScopeTag::Global,
            Some("regions") => {
                let region = parts.next().ok_or_else(|| malformed("missing region"))?;
                ScopeTag::Region(region.to_string())
            }
            Some("zones") => {
                let zone = parts.next().ok_or_else(|| malformed("missing zone"))?;
                ScopeTag::Zone(zone.to_string())
            }
            Some("locations") => {
                let location = parts.next().ok_or_else(|| malformed("missing location"))?;
                if location == "global" {
                    ScopeTag::Global
                } else {
                    ScopeTag::Region(location.to_string())
                }
            }
            _ => return Err(malformed("missing scope")),
        };

        let collection = parts.next().ok_or_else(|| malformed("missing collection"))?;
        let name = parts.next().ok_or_else(|| malformed("missing name"))?;
        if parts.next().is_some() {
            return Err(malformed("trailing segments"));
        }

        let key = match tag {
            ScopeTag::Global => Key::global(name),
            ScopeTag::Region(region) => Key::regional(name, region),
            ScopeTag::Zone(zone) => Key::zonal(name, zone),
        };
        Ok(ResourceID::new(project, collection, key))
    }
}

impl fmt::Display for ResourceID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.resource, self.project, self.key)
    }
}

/// Failure to parse a self-link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("malformed self-link {link:?}: {reason}")]
    Malformed { link: String, reason: String },
    #[error("self-link {link:?} has unknown host {host:?}")]
    UnknownHost { link: String, host: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_link_global() {
        let id = ResourceID::new("proj-1", "backendServices", Key::global("bs1"));
        assert_eq!(
            id.self_link(Version::Ga),
            "https://compute.googleapis.com/v1/projects/proj-1/global/backendServices/bs1"
        );
    }

    #[test]
    fn test_self_link_zonal_alpha() {
        let id = ResourceID::new(
            "proj-1",
            "networkEndpointGroups",
            Key::zonal("neg1", "us-central1-c"),
        );
        assert_eq!(
            id.self_link(Version::Alpha),
            "https://compute.googleapis.com/alpha/projects/proj-1/zones/us-central1-c/networkEndpointGroups/neg1"
        );
    }

    #[test]
    fn test_self_link_network_services() {
        let id = ResourceID::new("proj-1", "meshes", Key::global("mesh1"));
        assert_eq!(
            id.self_link(Version::Alpha),
            "https://networkservices.googleapis.com/v1alpha1/projects/proj-1/locations/global/meshes/mesh1"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let ids = [
            ResourceID::new("p", "backendServices", Key::global("bs")),
            ResourceID::new("p", "forwardingRules", Key::regional("fr", "us-east1")),
            ResourceID::new("p", "networkEndpointGroups", Key::zonal("neg", "us-east1-b")),
            ResourceID::new("p", "tcpRoutes", Key::global("route")),
        ];
        for id in ids {
            for version in [Version::Ga, Version::Beta, Version::Alpha] {
                let link = id.self_link(version);
                assert_eq!(ResourceID::parse_self_link(&link).unwrap(), id, "{link}");
            }
        }
    }

    #[test]
    fn test_parse_mesh_location() {
        let id = ResourceID::parse_self_link(
            "https://networkservices.googleapis.com/v1alpha1/projects/dev/locations/global/meshes/mcs-mesh",
        )
        .unwrap();
        assert_eq!(id, ResourceID::new("dev", "meshes", Key::global("mcs-mesh")));
    }

    #[test]
    fn test_parse_rejects_unknown_host() {
        let err = ResourceID::parse_self_link("https://example.com/v1/projects/p/global/x/y")
            .unwrap_err();
        assert!(matches!(err, LinkError::UnknownHost { .. }));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for link in [
            "not-a-url",
            "https://compute.googleapis.com/v1/projects/p/global/backendServices",
            "https://compute.googleapis.com/v9/projects/p/global/backendServices/bs",
            "https://compute.googleapis.com/v1/p/global/backendServices/bs",
        ] {
            assert!(ResourceID::parse_self_link(link).is_err(), "{link}");
        }
    }
}

//! Version-tagged resource envelopes with checked mutation.
//!
//! Each resource type has three schema variants (GA, beta, alpha). A
//! [`Mutable`] is constructed in one authoritative version, mutated through
//! its `access*` operators, and frozen into an immutable [`Resource`] that
//! exposes conversions to the other versions. Conversions preserve fields
//! common to both versions and fail when a set field would be dropped.

use crate::meta::{self, LinkError, ResourceID, Version};
use crate::path::Path;
use crate::traits::{FieldRole, FieldTraits};
use crate::value::{self, ConversionError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Schema and behavior of one resource type.
///
/// Implementations supply the three version payloads plus the trait table and
/// out-ref extraction; the graph machinery is generic over this.
pub trait ResourceKind: Send + Sync + Sized + 'static {
    type Ga: Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync + fmt::Debug;
    type Beta: Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync + fmt::Debug;
    type Alpha: Serialize
        + DeserializeOwned
        + Default
        + Clone
        + PartialEq
        + Send
        + Sync
        + fmt::Debug;

    /// API collection name, e.g. `backendServices`.
    const KIND: &'static str;

    fn field_traits(version: Version) -> FieldTraits;

    /// Harvest outgoing references from a serialized resource body.
    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, RefError>;
}

/// An outgoing reference: an edge from one resource body to another resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub from: ResourceID,
    /// Path of the field holding the reference.
    pub path: Path,
    pub to: ResourceID,
}

/// Failure to parse a reference field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad reference at {path}: {source}")]
pub struct RefError {
    pub path: Path,
    #[source]
    pub source: LinkError,
}

/// Parse a self-link field into a reference edge.
pub fn link_ref(from: &ResourceID, path: Path, link: &str) -> Result<ResourceRef, RefError> {
    let to = ResourceID::parse_self_link(link).map_err(|source| RefError {
        path: path.clone(),
        source,
    })?;
    Ok(ResourceRef {
        from: from.clone(),
        path,
        to,
    })
}

/// Parse a self-link string field on a serialized body, if set.
pub fn value_str_ref(
    from: &ResourceID,
    body: &Value,
    field: &str,
) -> Result<Option<ResourceRef>, RefError> {
    match body.get(field).and_then(Value::as_str) {
        Some(link) if !link.is_empty() => {
            link_ref(from, Path::root().field(field), link).map(Some)
        }
        _ => Ok(None),
    }
}

/// Parse a list-of-self-links field on a serialized body, one reference per
/// element.
pub fn value_list_refs(
    from: &ResourceID,
    body: &Value,
    field: &str,
) -> Result<Vec<ResourceRef>, RefError> {
    let mut refs = Vec::new();
    if let Some(links) = body.get(field).and_then(Value::as_array) {
        for (i, link) in links.iter().enumerate() {
            if let Some(link) = link.as_str().filter(|l| !l.is_empty()) {
                refs.push(link_ref(from, Path::root().field(field).index(i), link)?);
            }
        }
    }
    Ok(refs)
}

/// Mutable staging form of a resource, fixed to one authoritative version.
#[derive(Debug, Clone)]
pub struct Mutable<K: ResourceKind> {
    id: ResourceID,
    payload: Payload<K>,
}

#[derive(Debug, Clone)]
enum Payload<K: ResourceKind> {
    Ga(K::Ga),
    Beta(K::Beta),
    Alpha(K::Alpha),
}

impl<K: ResourceKind> Payload<K> {
    fn version(&self) -> Version {
        match self {
            Payload::Ga(_) => Version::Ga,
            Payload::Beta(_) => Version::Beta,
            Payload::Alpha(_) => Version::Alpha,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Payload::Ga(x) => serde_json::to_value(x),
            Payload::Beta(x) => serde_json::to_value(x),
            Payload::Alpha(x) => serde_json::to_value(x),
        }
    }
}

impl<K: ResourceKind> Mutable<K> {
    /// New empty resource in the GA version.
    pub fn new(project: &str, key: meta::Key) -> Mutable<K> {
        Mutable::new_in_version(project, key, Version::Ga)
    }

    pub fn new_in_version(project: &str, key: meta::Key, version: Version) -> Mutable<K> {
        let payload = match version {
            Version::Ga => Payload::Ga(K::Ga::default()),
            Version::Beta => Payload::Beta(K::Beta::default()),
            Version::Alpha => Payload::Alpha(K::Alpha::default()),
        };
        Mutable {
            id: ResourceID::new(project, K::KIND, key),
            payload,
        }
    }

    pub fn id(&self) -> &ResourceID {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.payload.version()
    }

    /// Apply a mutation to the GA payload. Fails if the authoritative
    /// version is not GA.
    pub fn access(&mut self, f: impl FnOnce(&mut K::Ga)) -> Result<(), ResourceError> {
        match &mut self.payload {
            Payload::Ga(x) => {
                f(x);
                Ok(())
            }
            other => Err(ResourceError::VersionMismatch {
                id: self.id.clone(),
                have: other.version(),
                want: Version::Ga,
            }),
        }
    }

    pub fn access_beta(&mut self, f: impl FnOnce(&mut K::Beta)) -> Result<(), ResourceError> {
        match &mut self.payload {
            Payload::Beta(x) => {
                f(x);
                Ok(())
            }
            other => Err(ResourceError::VersionMismatch {
                id: self.id.clone(),
                have: other.version(),
                want: Version::Beta,
            }),
        }
    }

    pub fn access_alpha(&mut self, f: impl FnOnce(&mut K::Alpha)) -> Result<(), ResourceError> {
        match &mut self.payload {
            Payload::Alpha(x) => {
                f(x);
                Ok(())
            }
            other => Err(ResourceError::VersionMismatch {
                id: self.id.clone(),
                have: other.version(),
                want: Version::Alpha,
            }),
        }
    }

    /// Validate and return the immutable form.
    ///
    /// Checks that the body name agrees with the key (filling it in when
    /// unset), that no output-only field is set, and that every reference
    /// field parses.
    pub fn freeze(self) -> Result<Resource<K>, ResourceError> {
        let version = self.payload.version();
        let mut body = self.payload.to_value()?;
        if !body.is_object() {
            return Err(ResourceError::NotAnObject { id: self.id });
        }

        let name = self.id.key.name();
        match body.get("name") {
            None | Some(Value::Null) => {
                body["name"] = Value::String(name.to_string());
            }
            Some(Value::String(s)) if s.is_empty() => {
                body["name"] = Value::String(name.to_string());
            }
            Some(Value::String(s)) if s == name => {}
            Some(other) => {
                return Err(ResourceError::NameMismatch {
                    id: self.id,
                    body_name: other.to_string(),
                });
            }
        }

        let traits = K::field_traits(version);
        for path in traits.paths_with_role(FieldRole::OutputOnly) {
            if let Ok(v) = path.resolve(&body)
                && !value::is_zero(v)
            {
                return Err(ResourceError::OutputOnlySet {
                    id: self.id.clone(),
                    path: path.clone(),
                });
            }
        }

        K::out_refs(&self.id, &body)?;

        Ok(Resource {
            id: self.id,
            version,
            body,
            _kind: PhantomData,
        })
    }
}

/// Immutable, version-tagged view of one resource.
pub struct Resource<K: ResourceKind> {
    id: ResourceID,
    version: Version,
    body: Value,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Resource<K> {
    /// Admit a body fetched from the cloud. Output-only fields are
    /// legitimately set here, so this skips the freeze validation.
    pub(crate) fn from_observed(id: ResourceID, version: Version, body: Value) -> Resource<K> {
        Resource {
            id,
            version,
            body,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> &ResourceID {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The serialized body in the authoritative version.
    pub fn value(&self) -> &Value {
        &self.body
    }

    /// The body converted to the given version, failing if a set field would
    /// be dropped.
    pub fn value_in(&self, version: Version) -> Result<Value, ConversionError> {
        if version == self.version {
            return Ok(self.body.clone());
        }
        let converted = match version {
            Version::Ga => serde_json::to_value(value::convert_value::<K::Ga>(&self.body)?),
            Version::Beta => serde_json::to_value(value::convert_value::<K::Beta>(&self.body)?),
            Version::Alpha => serde_json::to_value(value::convert_value::<K::Alpha>(&self.body)?),
        };
        Ok(converted?)
    }

    pub fn to_ga(&self) -> Result<K::Ga, ConversionError> {
        value::convert_value(&self.body)
    }

    pub fn to_beta(&self) -> Result<K::Beta, ConversionError> {
        value::convert_value(&self.body)
    }

    pub fn to_alpha(&self) -> Result<K::Alpha, ConversionError> {
        value::convert_value(&self.body)
    }

    /// Back to the mutable staging form for further edits.
    pub fn to_mutable(&self) -> Result<Mutable<K>, ResourceError> {
        let payload = match self.version {
            Version::Ga => Payload::Ga(serde_json::from_value(self.body.clone())?),
            Version::Beta => Payload::Beta(serde_json::from_value(self.body.clone())?),
            Version::Alpha => Payload::Alpha(serde_json::from_value(self.body.clone())?),
        };
        Ok(Mutable {
            id: self.id.clone(),
            payload,
        })
    }

    pub fn out_refs(&self) -> Result<Vec<ResourceRef>, RefError> {
        K::out_refs(&self.id, &self.body)
    }

    pub fn field_traits(&self) -> FieldTraits {
        K::field_traits(self.version)
    }
}

impl<K: ResourceKind> Clone for Resource<K> {
    fn clone(&self) -> Self {
        Resource {
            id: self.id.clone(),
            version: self.version,
            body: self.body.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> PartialEq for Resource<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version && self.body == other.body
    }
}

impl<K: ResourceKind> fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("body", &self.body)
            .finish()
    }
}

/// Failure to mutate, validate, or convert an envelope.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{id}: resource is {have}, operation requires {want}")]
    VersionMismatch {
        id: ResourceID,
        have: Version,
        want: Version,
    },
    #[error("{id}: body name {body_name:?} does not match key")]
    NameMismatch { id: ResourceID, body_name: String },
    #[error("{id}: output-only field {path} is set")]
    OutputOnlySet { id: ResourceID, path: Path },
    #[error("{id}: body is not an object")]
    NotAnObject { id: ResourceID },
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

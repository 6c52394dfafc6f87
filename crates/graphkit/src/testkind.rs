//! A small resource kind used by tests across the crate.

use crate::meta::{ResourceID, Version};
use crate::path::Path;
use crate::resource::{ResourceKind, ResourceRef, value_str_ref};
use crate::traits::FieldTraits;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Widget {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Changing the shape requires a recreate.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shape: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    /// Self-link of another widget this one depends on.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub backend: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetAlpha {
    #[serde(flatten)]
    pub base: Widget,
    /// Alpha-only field; lost when converting down.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gloss: String,
}

pub enum WidgetKind {}

impl ResourceKind for WidgetKind {
    type Ga = Widget;
    type Beta = Widget;
    type Alpha = WidgetAlpha;

    const KIND: &'static str = "widgets";

    fn field_traits(_version: Version) -> FieldTraits {
        let mut t = FieldTraits::new();
        t.output_only(Path::root().deref().field("selfLink"));
        t.output_only(Path::root().deref().field("fingerprint"));
        t.output_only(Path::root().deref().field("id"));
        t.output_only(Path::root().deref().field("creationTimestamp"));
        t.inherit_value(Path::root().deref().field("fingerprint"));
        t.non_updatable(Path::root().deref().field("shape"));
        t
    }

    fn out_refs(id: &ResourceID, body: &Value) -> Result<Vec<ResourceRef>, crate::RefError> {
        Ok(value_str_ref(id, body, "backend")?.into_iter().collect())
    }
}

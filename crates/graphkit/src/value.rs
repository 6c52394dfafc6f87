//! Generic machinery over serialized resource values.
//!
//! Resource bodies are compared, converted, and inherited as
//! [`serde_json::Value`] trees, with wire-level (omit-empty) conventions:
//! an absent field and a zero field are the same thing unless the trait
//! table says zero is meaningful.

use crate::path::{Path, PathError};
use crate::traits::{FieldRole, FieldTraits};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Whether a value is the zero value of its wire type.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Failure to convert a value between schema versions.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The target version has no place for a field that is set in the source.
    #[error("conversion drops set field at {path}")]
    FieldLost { path: Path },
    #[error("incompatible value: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convert a serialized value into the schema type `D`, failing if any set
/// non-default field of the source has no counterpart in the target.
pub fn convert_value<D>(src: &Value) -> Result<D, ConversionError>
where
    D: DeserializeOwned + Serialize,
{
    let dst: D = serde_json::from_value(src.clone())?;
    let dst_value = serde_json::to_value(&dst)?;
    if let Some(path) = first_lost_path(Path::root(), src, &dst_value) {
        return Err(ConversionError::FieldLost { path });
    }
    Ok(dst)
}

/// First path set in `src` but absent (or no longer equal) in `dst`.
fn first_lost_path(path: Path, src: &Value, dst: &Value) -> Option<Path> {
    match src {
        Value::Object(fields) => {
            let dst_obj = dst.as_object();
            for (name, src_field) in fields {
                if is_zero(src_field) {
                    continue;
                }
                let sub = path.clone().field(name.clone());
                match dst_obj.and_then(|o| o.get(name)) {
                    Some(dst_field) => {
                        if let Some(lost) = first_lost_path(sub, src_field, dst_field) {
                            return Some(lost);
                        }
                    }
                    None => return Some(sub),
                }
            }
            None
        }
        Value::Array(items) => {
            let Some(dst_items) = dst.as_array() else {
                return Some(path);
            };
            if dst_items.len() != items.len() {
                return Some(path);
            }
            for (i, (s, d)) in items.iter().zip(dst_items).enumerate() {
                if let Some(lost) = first_lost_path(path.clone().index(i), s, d) {
                    return Some(lost);
                }
            }
            None
        }
        _ => {
            if src == dst {
                None
            } else {
                Some(path)
            }
        }
    }
}

/// One changed field between a desired and an observed value.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffItem {
    pub path: Path,
    /// Desired-side value, absent if unset.
    pub want: Option<Value>,
    /// Observed-side value, absent if unset.
    pub got: Option<Value>,
}

/// Comparison result for one resource body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffReport {
    pub items: Vec<DiffItem>,
    /// True if any changed path is marked non-updatable.
    pub needs_recreate: bool,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.items.iter().map(|i| &i.path)
    }
}

/// Compare a desired value against an observed one under a trait table.
///
/// Output-only subtrees are excluded. Absent and zero-valued fields compare
/// equal unless the path allows explicit zero values.
pub fn diff(want: &Value, got: &Value, traits: &FieldTraits) -> DiffReport {
    let mut report = DiffReport::default();
    diff_walk(Path::root(), Some(want), Some(got), traits, &mut report);
    report
}

fn diff_walk(
    path: Path,
    want: Option<&Value>,
    got: Option<&Value>,
    traits: &FieldTraits,
    report: &mut DiffReport,
) {
    if traits.is_output_only(&path) {
        return;
    }

    let want_unset = want.is_none_or(is_zero);
    let got_unset = got.is_none_or(is_zero);
    if want_unset && got_unset {
        // Distinguish explicit zero from absent only where the traits say so.
        if traits.allows_zero(&path) && want.is_some() != got.is_some() {
            record(path, want, got, traits, report);
        }
        return;
    }

    match (want, got) {
        (Some(Value::Object(w)), Some(Value::Object(g))) => {
            for (name, want_field) in w {
                diff_walk(
                    path.clone().field(name.clone()),
                    Some(want_field),
                    g.get(name),
                    traits,
                    report,
                );
            }
            for (name, got_field) in g {
                if !w.contains_key(name) {
                    diff_walk(
                        path.clone().field(name.clone()),
                        None,
                        Some(got_field),
                        traits,
                        report,
                    );
                }
            }
        }
        (Some(Value::Array(w)), Some(Value::Array(g))) if w.len() == g.len() => {
            for (i, (want_item, got_item)) in w.iter().zip(g).enumerate() {
                diff_walk(
                    path.clone().index(i),
                    Some(want_item),
                    Some(got_item),
                    traits,
                    report,
                );
            }
        }
        (Some(w), Some(g)) if w == g => {}
        _ => record(path, want, got, traits, report),
    }
}

fn record(
    path: Path,
    want: Option<&Value>,
    got: Option<&Value>,
    traits: &FieldTraits,
    report: &mut DiffReport,
) {
    if traits.is_non_updatable(&path) {
        report.needs_recreate = true;
    }
    report.items.push(DiffItem {
        path,
        want: want.cloned(),
        got: got.cloned(),
    });
}

/// Copy inherited fields from an observed value into a desired one.
///
/// A field is copied only when it is set on the observed side and unset on
/// the desired side; a desired explicit zero counts as set where the path
/// allows zero values. Intermediate owners are created on first set and left
/// untouched when the path resolves to zero on both sides.
pub fn inherit(want: &mut Value, got: &Value, traits: &FieldTraits) -> Result<(), PathError> {
    for path in traits.paths_with_role(FieldRole::Inherited) {
        let observed = match path.resolve(got) {
            Ok(v) if !is_zero(v) => v.clone(),
            _ => continue,
        };
        match path.resolve(want) {
            Ok(v) if !is_zero(v) => continue,
            Ok(_) if traits.allows_zero(path) => continue,
            _ => {}
        }
        path.set(want, observed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase", default)]
    struct Narrow {
        #[serde(skip_serializing_if = "String::is_empty")]
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        port: Option<i64>,
    }

    #[test]
    fn test_is_zero() {
        for v in [json!(null), json!(""), json!(0), json!(false), json!([]), json!({})] {
            assert!(is_zero(&v), "{v}");
        }
        for v in [json!("x"), json!(1), json!(true), json!([0]), json!({"a": 0})] {
            assert!(!is_zero(&v), "{v}");
        }
    }

    #[test]
    fn test_convert_preserves_common_fields() {
        let src = json!({"name": "bs1", "port": 80});
        let narrow: Narrow = convert_value(&src).unwrap();
        assert_eq!(narrow.name, "bs1");
        assert_eq!(narrow.port, Some(80));
    }

    #[test]
    fn test_convert_fails_on_set_extra_field() {
        let src = json!({"name": "bs1", "haPolicy": "ACTIVE"});
        let err = convert_value::<Narrow>(&src).unwrap_err();
        match err {
            ConversionError::FieldLost { path } => {
                assert_eq!(path.to_string(), ".haPolicy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_convert_ignores_unset_extra_field() {
        let src = json!({"name": "bs1", "haPolicy": ""});
        assert!(convert_value::<Narrow>(&src).is_ok());
    }

    #[test]
    fn test_diff_equal_modulo_zero() {
        let traits = FieldTraits::new();
        let want = json!({"name": "a", "description": ""});
        let got = json!({"name": "a"});
        assert!(diff(&want, &got, &traits).is_empty());
    }

    #[test]
    fn test_diff_reports_changed_paths() {
        let traits = FieldTraits::new();
        let want = json!({"name": "a", "protocol": "TCP", "backends": [{"group": "x"}]});
        let got = json!({"name": "a", "protocol": "HTTP", "backends": [{"group": "y"}]});
        let report = diff(&want, &got, &traits);
        let mut paths: Vec<String> = report.paths().map(|p| p.to_string()).collect();
        paths.sort();
        assert_eq!(paths, vec![".backends[0].group", ".protocol"]);
        assert!(!report.needs_recreate);
    }

    #[test]
    fn test_diff_skips_output_only() {
        let mut traits = FieldTraits::new();
        traits.output_only(Path::root().field("selfLink"));
        let want = json!({"name": "a"});
        let got = json!({"name": "a", "selfLink": "https://..."});
        assert!(diff(&want, &got, &traits).is_empty());
    }

    #[test]
    fn test_diff_array_length_change() {
        let traits = FieldTraits::new();
        let want = json!({"checks": ["a", "b"]});
        let got = json!({"checks": ["a"]});
        let report = diff(&want, &got, &traits);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].path.to_string(), ".checks");
    }

    #[test]
    fn test_diff_non_updatable_sets_recreate() {
        let mut traits = FieldTraits::new();
        traits.non_updatable(Path::root().field("scheme"));
        let want = json!({"scheme": "INTERNAL"});
        let got = json!({"scheme": "EXTERNAL"});
        let report = diff(&want, &got, &traits);
        assert!(report.needs_recreate);
    }

    #[test]
    fn test_diff_allow_zero_distinguishes_unset() {
        let mut traits = FieldTraits::new();
        traits.allow_zero_value(Path::root().field("port"));
        let want = json!({"port": 0});
        let got = json!({});
        assert_eq!(diff(&want, &got, &traits).items.len(), 1);

        // Without the trait, explicit zero and unset are the same.
        let traits = FieldTraits::new();
        assert!(diff(&want, &got, &traits).is_empty());
    }

    #[test]
    fn test_inherit_copies_unset_only() {
        let mut traits = FieldTraits::new();
        traits.inherit_value(Path::root().field("fingerprint"));
        let got = json!({"fingerprint": "fp-7", "name": "a"});

        let mut want = json!({"name": "a"});
        inherit(&mut want, &got, &traits).unwrap();
        assert_eq!(want, json!({"name": "a", "fingerprint": "fp-7"}));

        let mut want = json!({"name": "a", "fingerprint": "mine"});
        inherit(&mut want, &got, &traits).unwrap();
        assert_eq!(want["fingerprint"], "mine");
    }

    #[test]
    fn test_inherit_creates_intermediate_owner() {
        let mut traits = FieldTraits::new();
        traits.inherit_value(Path::root().field("iap").deref().field("sha"));
        let got = json!({"iap": {"sha": "abc"}});

        let mut want = json!({});
        inherit(&mut want, &got, &traits).unwrap();
        assert_eq!(want, json!({"iap": {"sha": "abc"}}));

        // Zero on both sides leaves the desired value untouched.
        let mut want = json!({});
        inherit(&mut want, &json!({"iap": null}), &traits).unwrap();
        assert_eq!(want, json!({}));
    }
}

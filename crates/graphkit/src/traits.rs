//! Per-type field trait tables.
//!
//! A [`FieldTraits`] table maps structural paths to roles that steer diffing
//! and writes: output-only fields are ignored on write and excluded from
//! comparison, inherited fields are copied from the observed resource when
//! the desired value is unset, and non-updatable fields force a recreate when
//! they change. Roles apply to the registered path and everything under it.

use crate::path::{Path, Step};

/// Role of a field within its resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Set by the service; ignored on write, excluded from comparison.
    OutputOnly,
    /// Copied from the observed resource when unset in the desired one.
    Inherited,
    /// An explicitly zero value is meaningful and distinct from unset.
    AllowZeroValue,
    /// Changing this field requires deleting and recreating the resource.
    NonUpdatable,
}

/// Trait table for one resource type at one API version.
#[derive(Debug, Clone, Default)]
pub struct FieldTraits {
    entries: Vec<(Path, FieldRole)>,
}

impl FieldTraits {
    pub fn new() -> FieldTraits {
        FieldTraits::default()
    }

    pub fn output_only(&mut self, path: Path) -> &mut Self {
        self.entries.push((path, FieldRole::OutputOnly));
        self
    }

    pub fn inherit_value(&mut self, path: Path) -> &mut Self {
        self.entries.push((path, FieldRole::Inherited));
        self
    }

    pub fn allow_zero_value(&mut self, path: Path) -> &mut Self {
        self.entries.push((path, FieldRole::AllowZeroValue));
        self
    }

    pub fn non_updatable(&mut self, path: Path) -> &mut Self {
        self.entries.push((path, FieldRole::NonUpdatable));
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Path, FieldRole)> {
        self.entries.iter().map(|(p, r)| (p, *r))
    }

    /// Paths registered with the given role.
    pub fn paths_with_role(&self, role: FieldRole) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(move |(_, r)| *r == role)
            .map(|(p, _)| p)
    }

    /// Whether `path` or any of its ancestors carries `role`.
    ///
    /// Pointer derefs are structural, not semantic: `*.selfLink` and
    /// `.selfLink` address the same field, so they are ignored when
    /// matching registered paths against diff paths.
    pub fn has_role(&self, path: &Path, role: FieldRole) -> bool {
        self.entries
            .iter()
            .any(|(p, r)| *r == role && applies(p, path))
    }

    pub fn is_output_only(&self, path: &Path) -> bool {
        self.has_role(path, FieldRole::OutputOnly)
    }

    pub fn is_non_updatable(&self, path: &Path) -> bool {
        self.has_role(path, FieldRole::NonUpdatable)
    }

    pub fn allows_zero(&self, path: &Path) -> bool {
        self.has_role(path, FieldRole::AllowZeroValue)
    }

    /// Rebind every registered path under a new root.
    pub fn clone_with_sub_path(&self, root: &Path) -> FieldTraits {
        FieldTraits {
            entries: self
                .entries
                .iter()
                .map(|(p, r)| (root.join(p), *r))
                .collect(),
        }
    }
}

/// Deref-insensitive prefix match of a registered path against a query.
fn applies(entry: &Path, query: &Path) -> bool {
    let entry: Vec<&Step> = semantic_steps(entry);
    let query: Vec<&Step> = semantic_steps(query);
    entry.len() <= query.len() && query[..entry.len()] == entry[..]
}

fn semantic_steps(path: &Path) -> Vec<&Step> {
    path.steps()
        .iter()
        .filter(|s| !matches!(s, Step::Deref))
        .collect()
}

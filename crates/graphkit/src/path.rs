//! Structural paths into resource values.
//!
//! A [`Path`] is an ordered sequence of steps (pointer deref, named field,
//! slice index, map key) that can be resolved against a [`Value`] or used to
//! assign into one, creating intermediate objects as needed. Field traits are
//! registered against paths, so two paths are comparable by prefix.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One step of a structural path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Dereference a pointer-valued node. On a value tree this passes
    /// through, but resolution fails if the value is unset (`null`).
    Deref,
    /// Named struct field. Names use the wire (camelCase) spelling.
    Field(String),
    /// Slice index.
    Index(usize),
    /// Map key.
    Key(String),
}

/// A structural path: a totally ordered sequence of [`Step`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    /// The empty path, addressing the value itself.
    pub fn root() -> Path {
        Path::default()
    }

    pub fn deref(mut self) -> Path {
        self.steps.push(Step::Deref);
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Path {
        self.steps.push(Step::Field(name.into()));
        self
    }

    pub fn index(mut self, index: usize) -> Path {
        self.steps.push(Step::Index(index));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Path {
        self.steps.push(Step::Key(key.into()));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True iff every step of `prefix` matches this path in order.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.steps.len() <= self.steps.len()
            && self.steps[..prefix.steps.len()] == prefix.steps[..]
    }

    /// This path extended by all steps of `tail`.
    pub fn join(&self, tail: &Path) -> Path {
        let mut steps = self.steps.clone();
        steps.extend(tail.steps.iter().cloned());
        Path { steps }
    }

    /// The first `len` steps of this path.
    fn truncated(&self, len: usize) -> Path {
        Path {
            steps: self.steps[..len].to_vec(),
        }
    }

    /// Resolve this path against a value, yielding the addressed sub-value.
    pub fn resolve<'v>(&self, value: &'v Value) -> Result<&'v Value, PathError> {
        let mut cur = value;
        for (i, step) in self.steps.iter().enumerate() {
            let at = || self.truncated(i + 1);
            match step {
                Step::Deref => {
                    if cur.is_null() {
                        return Err(PathError::Unset { path: at() });
                    }
                }
                Step::Field(name) => {
                    let obj = cur.as_object().ok_or_else(|| PathError::TypeMismatch {
                        path: at(),
                        expected: "object",
                        found: type_name(cur),
                    })?;
                    cur = obj.get(name).ok_or_else(|| PathError::Missing { path: at() })?;
                }
                Step::Index(index) => {
                    let arr = cur.as_array().ok_or_else(|| PathError::TypeMismatch {
                        path: at(),
                        expected: "array",
                        found: type_name(cur),
                    })?;
                    cur = arr.get(*index).ok_or_else(|| PathError::OutOfRange {
                        path: at(),
                        index: *index,
                        len: arr.len(),
                    })?;
                }
                Step::Key(key) => {
                    let obj = cur.as_object().ok_or_else(|| PathError::TypeMismatch {
                        path: at(),
                        expected: "map",
                        found: type_name(cur),
                    })?;
                    cur = obj.get(key).ok_or_else(|| PathError::Missing { path: at() })?;
                }
            }
        }
        Ok(cur)
    }

    /// Assign `new` at this path, creating intermediate objects for unset
    /// pointers and missing fields. Fails on type mismatches and on slice
    /// indices past the end of an existing array.
    pub fn set(&self, value: &mut Value, new: Value) -> Result<(), PathError> {
        let mut cur = value;
        for (i, step) in self.steps.iter().enumerate() {
            let last = i + 1 == self.steps.len();
            let at = || self.truncated(i + 1);
            match step {
                Step::Deref => {
                    if cur.is_null() {
                        *cur = Value::Object(Default::default());
                    }
                    if last {
                        return Err(PathError::TypeMismatch {
                            path: at(),
                            expected: "field, index, or key",
                            found: "deref",
                        });
                    }
                }
                Step::Field(name) | Step::Key(name) => {
                    if cur.is_null() {
                        *cur = Value::Object(Default::default());
                    }
                    let found = type_name(cur);
                    let obj = match cur.as_object_mut() {
                        Some(obj) => obj,
                        None => {
                            return Err(PathError::TypeMismatch {
                                path: at(),
                                expected: "object",
                                found,
                            });
                        }
                    };
                    let slot = obj.entry(name.clone()).or_insert(Value::Null);
                    if last {
                        *slot = new;
                        return Ok(());
                    }
                    cur = slot;
                }
                Step::Index(index) => {
                    let index = *index;
                    let found = type_name(cur);
                    let arr = match cur.as_array_mut() {
                        Some(arr) => arr,
                        None => {
                            return Err(PathError::TypeMismatch {
                                path: at(),
                                expected: "array",
                                found,
                            });
                        }
                    };
                    let len = arr.len();
                    let slot = arr.get_mut(index).ok_or(PathError::OutOfRange {
                        path: at(),
                        index,
                        len,
                    })?;
                    if last {
                        *slot = new;
                        return Ok(());
                    }
                    cur = slot;
                }
            }
        }
        // Root path: replace the value wholesale.
        *cur = new;
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, ".");
        }
        for step in &self.steps {
            match step {
                Step::Deref => write!(f, "*")?,
                Step::Field(name) => write!(f, ".{name}")?,
                Step::Index(index) => write!(f, "[{index}]")?,
                Step::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

/// Failure to resolve or assign through a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path {path} does not resolve: no such element")]
    Missing { path: Path },
    #[error("path {path}: unset pointer")]
    Unset { path: Path },
    #[error("path {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: &'static str,
        found: &'static str,
    },
    #[error("path {path}: index {index} out of range (len {len})")]
    OutOfRange { path: Path, index: usize, len: usize },
}

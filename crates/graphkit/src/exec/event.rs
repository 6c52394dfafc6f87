//! Events connecting producer and consumer actions.
//!
//! The planner is the sole authority that mints events; actions consume and
//! emit them by value. Tests use plain string events.

use crate::meta::ResourceID;
use std::fmt;

/// A dependency token published by one action and awaited by others.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// The resource exists (created, updated, or verified present).
    Exists(ResourceID),
    /// The resource is gone.
    NotExists(ResourceID),
    /// An update removed the reference `from` held to `to`.
    RefDropped { from: ResourceID, to: ResourceID },
    /// The delete half of a recreate finished; the create half may proceed.
    Recreated(ResourceID),
    /// Opaque event for tests and ad-hoc wiring.
    Str(String),
}

impl Event {
    pub fn str(s: impl Into<String>) -> Event {
        Event::Str(s.into())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Exists(id) => write!(f, "exists({id})"),
            Event::NotExists(id) => write!(f, "not-exists({id})"),
            Event::RefDropped { from, to } => write!(f, "ref-dropped({from} -> {to})"),
            Event::Recreated(id) => write!(f, "recreated({id})"),
            Event::Str(s) => write!(f, "{s}"),
        }
    }
}

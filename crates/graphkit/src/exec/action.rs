//! The unit of executor work.
//!
//! An action wraps one cloud RPC with the events it waits for and the events
//! it publishes on success. Received events are recorded idempotently; an
//! action is runnable once every wanted event has been signaled.

use crate::cloud::{CloudClient, CloudError};
use crate::exec::event::Event;
use crate::meta::ResourceID;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

/// Operation class of an action, for traces and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// No cloud call; only publishes events.
    Meta,
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Meta => write!(f, "meta"),
            ActionKind::Create => write!(f, "create"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// Identity and classification of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMetadata {
    pub name: String,
    pub kind: ActionKind,
    pub resource: Option<ResourceID>,
}

impl ActionMetadata {
    pub fn new(kind: ActionKind, resource: ResourceID) -> ActionMetadata {
        ActionMetadata {
            name: format!("{kind}({resource})"),
            kind,
            resource: Some(resource),
        }
    }

    pub fn named(name: impl Into<String>, kind: ActionKind) -> ActionMetadata {
        ActionMetadata {
            name: name.into(),
            kind,
            resource: None,
        }
    }
}

impl fmt::Display for ActionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Error from running one action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Cloud(#[from] CloudError),
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Failed(String),
}

/// A unit of work with event-encoded dependencies.
#[async_trait]
pub trait Action: Send + Sync + fmt::Debug {
    fn metadata(&self) -> &ActionMetadata;

    /// All events this action waits for.
    fn wants(&self) -> Vec<Event>;

    /// Wanted events not yet received.
    fn pending_events(&self) -> Vec<Event>;

    /// Events this action declares it will publish on success. Dry runs and
    /// traces use this without running the action.
    fn emits(&self) -> Vec<Event>;

    /// True once every wanted event has been received.
    fn can_run(&self) -> bool;

    /// Deliver an event. Returns true iff the event was wanted and not
    /// already received.
    fn signal(&self, event: &Event) -> bool;

    async fn run(&self, cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError>;
}

/// Want/received bookkeeping shared by action implementations.
#[derive(Debug, Default)]
pub struct EventWaiter {
    want: Vec<Event>,
    received: Mutex<HashSet<Event>>,
}

impl EventWaiter {
    pub fn new(want: Vec<Event>) -> EventWaiter {
        EventWaiter {
            want,
            received: Mutex::new(HashSet::new()),
        }
    }

    pub fn wants(&self) -> Vec<Event> {
        self.want.clone()
    }

    pub fn can_run(&self) -> bool {
        let received = self.received.lock().unwrap();
        self.want.iter().all(|w| received.contains(w))
    }

    pub fn signal(&self, event: &Event) -> bool {
        if !self.want.contains(event) {
            return false;
        }
        self.received.lock().unwrap().insert(event.clone())
    }

    pub fn pending(&self) -> Vec<Event> {
        let received = self.received.lock().unwrap();
        self.want
            .iter()
            .filter(|w| !received.contains(w))
            .cloned()
            .collect()
    }
}

//! Concrete actions minted by the planner.
//!
//! Each cloud action wraps exactly one RPC; the event action touches nothing
//! and only publishes events, standing in for resources that already satisfy
//! the desired state so that dependents' waits resolve.

use crate::cloud::CloudClient;
use crate::exec::action::{Action, ActionError, ActionKind, ActionMetadata, EventWaiter};
use crate::exec::event::Event;
use crate::meta::{ResourceID, Version};
use async_trait::async_trait;
use serde_json::Value;

/// Publishes events without touching the cloud.
#[derive(Debug)]
pub struct EventAction {
    metadata: ActionMetadata,
    events: Vec<Event>,
}

impl EventAction {
    pub fn new(resource: ResourceID, events: Vec<Event>) -> EventAction {
        EventAction {
            metadata: ActionMetadata::new(ActionKind::Meta, resource),
            events,
        }
    }
}

#[async_trait]
impl Action for EventAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn wants(&self) -> Vec<Event> {
        Vec::new()
    }

    fn pending_events(&self) -> Vec<Event> {
        Vec::new()
    }

    fn emits(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn can_run(&self) -> bool {
        true
    }

    fn signal(&self, _event: &Event) -> bool {
        false
    }

    async fn run(&self, _cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError> {
        Ok(self.events.clone())
    }
}

/// Inserts a resource once its referents exist.
#[derive(Debug)]
pub struct CreateAction {
    metadata: ActionMetadata,
    id: ResourceID,
    version: Version,
    body: Value,
    waiter: EventWaiter,
    events: Vec<Event>,
}

impl CreateAction {
    pub fn new(
        id: ResourceID,
        version: Version,
        body: Value,
        wants: Vec<Event>,
        emits: Vec<Event>,
    ) -> CreateAction {
        CreateAction {
            metadata: ActionMetadata::new(ActionKind::Create, id.clone()),
            id,
            version,
            body,
            waiter: EventWaiter::new(wants),
            events: emits,
        }
    }
}

#[async_trait]
impl Action for CreateAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn wants(&self) -> Vec<Event> {
        self.waiter.wants()
    }

    fn pending_events(&self) -> Vec<Event> {
        self.waiter.pending()
    }

    fn emits(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn can_run(&self) -> bool {
        self.waiter.can_run()
    }

    fn signal(&self, event: &Event) -> bool {
        self.waiter.signal(event)
    }

    async fn run(&self, cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError> {
        cloud.insert(&self.id, self.version, self.body.clone()).await?;
        Ok(self.events.clone())
    }
}

/// Patches a resource in place.
#[derive(Debug)]
pub struct UpdateAction {
    metadata: ActionMetadata,
    id: ResourceID,
    version: Version,
    body: Value,
    waiter: EventWaiter,
    events: Vec<Event>,
}

impl UpdateAction {
    pub fn new(
        id: ResourceID,
        version: Version,
        body: Value,
        wants: Vec<Event>,
        emits: Vec<Event>,
    ) -> UpdateAction {
        UpdateAction {
            metadata: ActionMetadata::new(ActionKind::Update, id.clone()),
            id,
            version,
            body,
            waiter: EventWaiter::new(wants),
            events: emits,
        }
    }
}

#[async_trait]
impl Action for UpdateAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn wants(&self) -> Vec<Event> {
        self.waiter.wants()
    }

    fn pending_events(&self) -> Vec<Event> {
        self.waiter.pending()
    }

    fn emits(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn can_run(&self) -> bool {
        self.waiter.can_run()
    }

    fn signal(&self, event: &Event) -> bool {
        self.waiter.signal(event)
    }

    async fn run(&self, cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError> {
        cloud.patch(&self.id, self.version, self.body.clone()).await?;
        Ok(self.events.clone())
    }
}

/// Deletes a resource once nothing references it anymore.
#[derive(Debug)]
pub struct DeleteAction {
    metadata: ActionMetadata,
    id: ResourceID,
    version: Version,
    waiter: EventWaiter,
    events: Vec<Event>,
}

impl DeleteAction {
    pub fn new(
        id: ResourceID,
        version: Version,
        wants: Vec<Event>,
        emits: Vec<Event>,
    ) -> DeleteAction {
        DeleteAction {
            metadata: ActionMetadata::new(ActionKind::Delete, id.clone()),
            id,
            version,
            waiter: EventWaiter::new(wants),
            events: emits,
        }
    }
}

#[async_trait]
impl Action for DeleteAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    fn wants(&self) -> Vec<Event> {
        self.waiter.wants()
    }

    fn pending_events(&self) -> Vec<Event> {
        self.waiter.pending()
    }

    fn emits(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn can_run(&self) -> bool {
        self.waiter.can_run()
    }

    fn signal(&self, event: &Event) -> bool {
        self.waiter.signal(event)
    }

    async fn run(&self, cloud: &dyn CloudClient) -> Result<Vec<Event>, ActionError> {
        cloud.delete(&self.id, self.version).await?;
        Ok(self.events.clone())
    }
}

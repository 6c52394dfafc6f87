//! Cloud client contract and the in-memory mock used by tests and dry runs.
//!
//! The engine only needs dynamic CRUD per resource identity and version; the
//! generated typed wrappers of a real cloud SDK sit behind this trait. The
//! mock behaves like the service for the aspects the engine cares about:
//! NotFound is distinguishable, output-only fields are populated on insert,
//! and fingerprints rotate on patch.

use crate::meta::{ResourceID, Scope, Version};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Error from a cloud operation.
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    #[error("{0} not found")]
    NotFound(ResourceID),
    #[error("{0} already exists")]
    AlreadyExists(ResourceID),
    #[error("{op} {id}: {message}")]
    Rpc {
        op: &'static str,
        id: ResourceID,
        message: String,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl CloudError {
    /// NotFound is a state observation, not a failure, for Sync.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }
}

/// Dynamic CRUD over cloud resources.
///
/// Implementations must be safe to share across executor workers.
#[async_trait]
pub trait CloudClient: Send + Sync {
    async fn get(&self, id: &ResourceID, version: Version) -> Result<Value, CloudError>;
    async fn insert(&self, id: &ResourceID, version: Version, body: Value)
    -> Result<(), CloudError>;
    async fn patch(&self, id: &ResourceID, version: Version, body: Value)
    -> Result<(), CloudError>;
    async fn delete(&self, id: &ResourceID, version: Version) -> Result<(), CloudError>;
}

/// Maps a service to the project its resources live in.
pub trait ProjectRouter: Send + Sync {
    fn project_id(&self, version: Version, service: &str) -> String;
}

/// Routes every service to one project.
#[derive(Debug, Clone)]
pub struct SingleProjectRouter {
    pub id: String,
}

impl SingleProjectRouter {
    pub fn new(id: impl Into<String>) -> SingleProjectRouter {
        SingleProjectRouter { id: id.into() }
    }
}

impl ProjectRouter for SingleProjectRouter {
    fn project_id(&self, _version: Version, _service: &str) -> String {
        self.id.clone()
    }
}

/// Picks the API version to use per service and scope.
pub trait VersionResolver: Send + Sync {
    fn version(&self, service: &str, scope: Scope) -> Version;
}

/// Resolves every service to one fixed version.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedVersionResolver(pub Version);

impl VersionResolver for FixedVersionResolver {
    fn version(&self, _service: &str, _scope: Scope) -> Version {
        self.0
    }
}

/// Operations that can have errors injected on the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Get,
    Insert,
    Patch,
    Delete,
}

#[derive(Debug, Clone)]
struct MockObject {
    version: Version,
    body: Value,
}

/// Collections whose objects carry a server-managed fingerprint.
const FINGERPRINTED: &[&str] = &[
    "backendServices",
    "forwardingRules",
    "targetHttpProxies",
    "urlMaps",
];

/// In-memory cloud. Concurrency-safe; locks are held only for map access.
#[derive(Debug, Default)]
pub struct MockCloud {
    objects: Mutex<HashMap<ResourceID, MockObject>>,
    injected: Mutex<HashMap<(ResourceID, MockOp), CloudError>>,
    next_id: AtomicU64,
}

impl MockCloud {
    pub fn new() -> MockCloud {
        MockCloud::default()
    }

    /// Store an object verbatim, without touching output-only fields.
    pub fn seed(&self, id: ResourceID, version: Version, body: Value) {
        self.objects
            .lock()
            .unwrap()
            .insert(id, MockObject { version, body });
    }

    /// Arrange for the next `op` on `id` to fail with `error`.
    pub fn inject_error(&self, id: ResourceID, op: MockOp, error: CloudError) {
        self.injected.lock().unwrap().insert((id, op), error);
    }

    /// Current stored body, for assertions.
    pub fn stored(&self, id: &ResourceID) -> Option<Value> {
        self.objects.lock().unwrap().get(id).map(|o| o.body.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    fn take_injected(&self, id: &ResourceID, op: MockOp) -> Option<CloudError> {
        self.injected.lock().unwrap().remove(&(id.clone(), op))
    }

    fn next_fingerprint(&self) -> String {
        format!("fp-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn get(&self, id: &ResourceID, _version: Version) -> Result<Value, CloudError> {
        if let Some(err) = self.take_injected(id, MockOp::Get) {
            return Err(err);
        }
        let objects = self.objects.lock().unwrap();
        objects
            .get(id)
            .map(|o| o.body.clone())
            .ok_or_else(|| CloudError::NotFound(id.clone()))
    }

    async fn insert(
        &self,
        id: &ResourceID,
        version: Version,
        mut body: Value,
    ) -> Result<(), CloudError> {
        if let Some(err) = self.take_injected(id, MockOp::Insert) {
            return Err(err);
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(id) {
            return Err(CloudError::AlreadyExists(id.clone()));
        }
        body["selfLink"] = Value::String(id.self_link(version));
        if id.api_group() == crate::meta::ApiGroup::Compute {
            // Network services resources carry no numeric id.
            body["id"] = Value::from(self.next_id.fetch_add(1, Ordering::Relaxed) + 1000);
        }
        body["creationTimestamp"] = Value::String(chrono::Utc::now().to_rfc3339());
        if FINGERPRINTED.contains(&id.resource.as_str()) {
            body["fingerprint"] = Value::String(self.next_fingerprint());
        }
        objects.insert(id.clone(), MockObject { version, body });
        Ok(())
    }

    async fn patch(
        &self,
        id: &ResourceID,
        version: Version,
        mut body: Value,
    ) -> Result<(), CloudError> {
        if let Some(err) = self.take_injected(id, MockOp::Patch) {
            return Err(err);
        }
        let fingerprint = self.next_fingerprint();
        let mut objects = self.objects.lock().unwrap();
        let old = objects
            .get(id)
            .ok_or_else(|| CloudError::NotFound(id.clone()))?;
        for field in ["selfLink", "id", "creationTimestamp"] {
            if let Some(v) = old.body.get(field) {
                body[field] = v.clone();
            }
        }
        if FINGERPRINTED.contains(&id.resource.as_str()) {
            body["fingerprint"] = Value::String(fingerprint);
        }
        objects.insert(id.clone(), MockObject { version, body });
        Ok(())
    }

    async fn delete(&self, id: &ResourceID, _version: Version) -> Result<(), CloudError> {
        if let Some(err) = self.take_injected(id, MockOp::Delete) {
            return Err(err);
        }
        let mut objects = self.objects.lock().unwrap();
        objects
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CloudError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Key;
    use serde_json::json;

    fn bs(name: &str) -> ResourceID {
        ResourceID::new("proj-1", "backendServices", Key::global(name))
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let cloud = MockCloud::new();
        let err = cloud.get(&bs("missing"), Version::Ga).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_insert_populates_output_only() {
        let cloud = MockCloud::new();
        let id = bs("bs1");
        cloud
            .insert(&id, Version::Ga, json!({"name": "bs1"}))
            .await
            .unwrap();
        let got = cloud.get(&id, Version::Ga).await.unwrap();
        assert_eq!(got["selfLink"], id.self_link(Version::Ga));
        assert!(got["fingerprint"].as_str().is_some());
        assert!(got["creationTimestamp"].as_str().is_some());

        let err = cloud
            .insert(&id, Version::Ga, json!({"name": "bs1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_patch_rotates_fingerprint_and_keeps_identity() {
        let cloud = MockCloud::new();
        let id = bs("bs1");
        cloud
            .insert(&id, Version::Ga, json!({"name": "bs1"}))
            .await
            .unwrap();
        let before = cloud.get(&id, Version::Ga).await.unwrap();
        cloud
            .patch(&id, Version::Ga, json!({"name": "bs1", "protocol": "TCP"}))
            .await
            .unwrap();
        let after = cloud.get(&id, Version::Ga).await.unwrap();
        assert_eq!(after["selfLink"], before["selfLink"]);
        assert_eq!(after["creationTimestamp"], before["creationTimestamp"]);
        assert_ne!(after["fingerprint"], before["fingerprint"]);
        assert_eq!(after["protocol"], "TCP");
    }

    #[tokio::test]
    async fn test_delete_and_injection() {
        let cloud = MockCloud::new();
        let id = bs("bs1");
        cloud
            .insert(&id, Version::Ga, json!({"name": "bs1"}))
            .await
            .unwrap();

        cloud.inject_error(
            id.clone(),
            MockOp::Delete,
            CloudError::Rpc {
                op: "delete",
                id: id.clone(),
                message: "quota".into(),
            },
        );
        assert!(cloud.delete(&id, Version::Ga).await.is_err());
        // Injection is one-shot.
        cloud.delete(&id, Version::Ga).await.unwrap();
        let err = cloud.delete(&id, Version::Ga).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

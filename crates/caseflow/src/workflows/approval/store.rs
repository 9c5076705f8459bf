use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::instance::{WorkflowId, WorkflowInstance};

/// Storage abstraction over the single authoritative instance store.
///
/// `update` is the check-and-set primitive: it only applies when the stored
/// version still equals `expected_version`, so concurrent writers on the same
/// instance serialize and the loser observes [`StoreError::Conflict`].
pub trait InstanceStore: Send + Sync {
    fn insert(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError>;
    fn update(
        &self,
        instance: WorkflowInstance,
        expected_version: u64,
    ) -> Result<WorkflowInstance, StoreError>;
    fn fetch(&self, id: &WorkflowId) -> Result<Option<WorkflowInstance>, StoreError>;
    fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("instance version changed underneath the writer")]
    Conflict,
    #[error("instance not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Mutex-guarded map store used by the service binary and the test suites.
#[derive(Default, Clone)]
pub struct InMemoryInstanceStore {
    records: Arc<Mutex<HashMap<WorkflowId, WorkflowInstance>>>,
}

impl InstanceStore for InMemoryInstanceStore {
    fn insert(&self, instance: WorkflowInstance) -> Result<WorkflowInstance, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&instance.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    fn update(
        &self,
        mut instance: WorkflowInstance,
        expected_version: u64,
    ) -> Result<WorkflowInstance, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let stored = guard.get(&instance.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::Conflict);
        }

        instance.version = expected_version + 1;
        instance.updated_at = Utc::now();
        guard.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    fn fetch(&self, id: &WorkflowId) -> Result<Option<WorkflowInstance>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<WorkflowInstance>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::approval::blueprint;

    fn instance(id: &str) -> WorkflowInstance {
        WorkflowInstance::new(
            WorkflowId(id.to_string()),
            &blueprint::standard_template(),
            "Parcel",
            "u1",
            None,
        )
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let store = InMemoryInstanceStore::default();
        store.insert(instance("wf-000001")).expect("first insert");
        assert!(matches!(
            store.insert(instance("wf-000001")),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn update_bumps_version_on_match() {
        let store = InMemoryInstanceStore::default();
        let stored = store.insert(instance("wf-000001")).expect("insert");
        let updated = store.update(stored.clone(), 0).expect("update applies");
        assert_eq!(updated.version, 1);
    }

    #[test]
    fn stale_writer_observes_conflict() {
        let store = InMemoryInstanceStore::default();
        let stored = store.insert(instance("wf-000001")).expect("insert");

        let first = stored.clone();
        let second = stored;

        store.update(first, 0).expect("first writer wins");
        assert!(matches!(store.update(second, 0), Err(StoreError::Conflict)));
    }

    #[test]
    fn update_of_missing_instance_fails() {
        let store = InMemoryInstanceStore::default();
        assert!(matches!(
            store.update(instance("wf-000404"), 0),
            Err(StoreError::NotFound)
        ));
    }
}

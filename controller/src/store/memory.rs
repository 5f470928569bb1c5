//! An in-memory [`Store`] that behaves like the API server in the ways the reconciler depends on:
//! version tokens, finalizer-gated deletion and owner-reference garbage collection.

use super::error::api_error;
use super::{id_of, kind_of, ResourceId, Store, StoreError, StoreObject, StoreResult};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Key = (String, String, String);

/// One successful mutation, as `(method, kind, name)`.
pub(crate) type WriteRecord = (String, String, String);

#[derive(Default)]
struct Inner {
    objects: BTreeMap<Key, Value>,
    version: u64,
    writes: Vec<WriteRecord>,
    failures: HashSet<(String, String, String)>,
    conflicts: HashMap<(String, String), u32>,
    stalls: HashMap<(String, String), Duration>,
    vanishing: HashSet<(String, String)>,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make every `method` call on the named object fail with a 503.
    pub(crate) fn fail(&self, method: &str, kind: &str, name: &str) {
        self.lock()
            .failures
            .insert((method.into(), kind.into(), name.into()));
    }

    pub(crate) fn heal(&self) {
        let mut inner = self.lock();
        inner.failures.clear();
        inner.stalls.clear();
    }

    /// Make every `get` of the named object wait for `delay` before answering.
    pub(crate) fn stall(&self, kind: &str, name: &str, delay: Duration) {
        self.lock().stalls.insert((kind.into(), name.into()), delay);
    }

    /// Delete the named object right after the next `get` has returned it, as if another client
    /// removed it between our read and our write.
    pub(crate) fn vanish_after_get(&self, kind: &str, name: &str) {
        self.lock().vanishing.insert((kind.into(), name.into()));
    }

    /// Make the next `count` updates of the named object fail with a 409.
    pub(crate) fn inject_conflicts(&self, kind: &str, name: &str, count: u32) {
        self.lock()
            .conflicts
            .insert((kind.into(), name.into()), count);
    }

    pub(crate) fn writes(&self) -> Vec<WriteRecord> {
        self.lock().writes.clone()
    }

    /// Read an object without going through the async interface.
    pub(crate) fn object<K: StoreObject>(&self, id: &ResourceId) -> Option<K> {
        let key = (kind_of::<K>(), id.namespace.clone(), id.name.clone());
        self.lock()
            .objects
            .get(&key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub(crate) fn contains<K: StoreObject>(&self, id: &ResourceId) -> bool {
        let key = (kind_of::<K>(), id.namespace.clone(), id.name.clone());
        self.lock().objects.contains_key(&key)
    }
}

impl Inner {
    fn check_failure(&self, method: &str, kind: &str, id: &ResourceId) -> StoreResult<()> {
        if self
            .failures
            .contains(&(method.to_owned(), kind.to_owned(), id.name.clone()))
        {
            return Err(StoreError::classify(
                api_error(503, "ServiceUnavailable", format!("{} is failing", method)),
                method,
                kind,
                id.to_string(),
            ));
        }
        Ok(())
    }

    fn check_conflict(&mut self, method: &str, kind: &str, id: &ResourceId) -> StoreResult<()> {
        if let Some(remaining) = self.conflicts.get_mut(&(kind.to_owned(), id.name.clone())) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(conflict(method, kind, id));
            }
        }
        Ok(())
    }

    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn record(&mut self, method: &str, kind: &str, id: &ResourceId) {
        self.writes
            .push((method.into(), kind.into(), id.name.clone()));
    }

    /// Remove the object and, transitively, everything it owns.
    fn remove(&mut self, key: &Key) {
        let uid = match self.objects.remove(key) {
            None => return,
            Some(value) => value["metadata"]["uid"].as_str().map(str::to_owned),
        };
        let uid = match uid {
            None => return,
            Some(uid) => uid,
        };
        let owned: Vec<Key> = self
            .objects
            .iter()
            .filter(|(_, value)| owned_by(value, &uid))
            .map(|(key, _)| key.clone())
            .collect();
        for key in owned {
            self.remove(&key);
        }
    }

    fn check_version(
        &self,
        method: &str,
        kind: &str,
        id: &ResourceId,
        stored: &Value,
        incoming: &Value,
    ) -> StoreResult<()> {
        let sent = &incoming["metadata"]["resourceVersion"];
        if !sent.is_null() && sent != &stored["metadata"]["resourceVersion"] {
            return Err(conflict(method, kind, id));
        }
        Ok(())
    }
}

fn owned_by(value: &Value, uid: &str) -> bool {
    value["metadata"]["ownerReferences"]
        .as_array()
        .map(|refs| refs.iter().any(|r| r["uid"].as_str() == Some(uid)))
        .unwrap_or(false)
}

fn has_finalizers(value: &Value) -> bool {
    value["metadata"]["finalizers"]
        .as_array()
        .map(|f| !f.is_empty())
        .unwrap_or(false)
}

fn conflict(method: &str, kind: &str, id: &ResourceId) -> StoreError {
    StoreError::classify(
        api_error(
            409,
            "Conflict",
            format!("the object {} has been modified", id),
        ),
        method,
        kind,
        id.to_string(),
    )
}

fn not_found(method: &str, kind: &str, id: &ResourceId) -> StoreError {
    StoreError::classify(
        api_error(404, "NotFound", format!("{} not found", id)),
        method,
        kind,
        id.to_string(),
    )
}

fn to_value<K: StoreObject>(obj: &K, id: &ResourceId) -> StoreResult<Value> {
    serde_json::to_value(obj).map_err(|source| StoreError::Serialization {
        kind: kind_of::<K>(),
        id: id.to_string(),
        source,
    })
}

fn from_value<K: StoreObject>(value: Value, id: &ResourceId) -> StoreResult<K> {
    serde_json::from_value(value).map_err(|source| StoreError::Serialization {
        kind: kind_of::<K>(),
        id: id.to_string(),
        source,
    })
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<Option<K>> {
        let kind = kind_of::<K>();
        let stall = self
            .lock()
            .stalls
            .get(&(kind.clone(), id.name.clone()))
            .copied();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        let mut inner = self.lock();
        inner.check_failure("get", &kind, id)?;
        let key = (kind.clone(), id.namespace.clone(), id.name.clone());
        let found = inner.objects.get(&key).cloned();
        if found.is_some() && inner.vanishing.remove(&(kind, id.name.clone())) {
            inner.remove(&key);
        }
        found.map(|value| from_value(value, id)).transpose()
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let kind = kind_of::<K>();
        let id = id_of(obj);
        let mut inner = self.lock();
        inner.check_failure("create", &kind, &id)?;
        let key = (kind.clone(), id.namespace.clone(), id.name.clone());
        if inner.objects.contains_key(&key) {
            return Err(conflict("create", &kind, &id));
        }
        let mut value = to_value(obj, &id)?;
        let version = inner.next_version();
        value["metadata"]["uid"] = Value::String(format!("uid-{}", version));
        value["metadata"]["resourceVersion"] = Value::String(version);
        inner.objects.insert(key, value.clone());
        inner.record("create", &kind, &id);
        from_value(value, &id)
    }

    async fn replace<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let kind = kind_of::<K>();
        let id = id_of(obj);
        let mut inner = self.lock();
        inner.check_failure("replace", &kind, &id)?;
        inner.check_conflict("replace", &kind, &id)?;
        let key = (kind.clone(), id.namespace.clone(), id.name.clone());
        let stored = match inner.objects.get(&key) {
            None => return Err(not_found("replace", &kind, &id)),
            Some(stored) => stored.clone(),
        };
        let mut value = to_value(obj, &id)?;
        inner.check_version("replace", &kind, &id, &stored, &value)?;
        for field in ["uid", "deletionTimestamp"] {
            value["metadata"][field] = stored["metadata"][field].clone();
        }
        if let Some(object) = value.as_object_mut() {
            match stored.get("status") {
                Some(status) => {
                    object.insert("status".into(), status.clone());
                }
                None => {
                    object.remove("status");
                }
            }
        }
        value["metadata"]["resourceVersion"] = Value::String(inner.next_version());
        inner.record("replace", &kind, &id);
        if !value["metadata"]["deletionTimestamp"].is_null() && !has_finalizers(&value) {
            inner.remove(&key);
        } else {
            inner.objects.insert(key, value.clone());
        }
        from_value(value, &id)
    }

    async fn replace_status<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let kind = kind_of::<K>();
        let id = id_of(obj);
        let mut inner = self.lock();
        inner.check_failure("replace_status", &kind, &id)?;
        inner.check_conflict("replace_status", &kind, &id)?;
        let key = (kind.clone(), id.namespace.clone(), id.name.clone());
        let mut value = match inner.objects.get(&key) {
            None => return Err(not_found("replace_status", &kind, &id)),
            Some(stored) => stored.clone(),
        };
        let incoming = to_value(obj, &id)?;
        inner.check_version("replace_status", &kind, &id, &value, &incoming)?;
        value["status"] = incoming["status"].clone();
        value["metadata"]["resourceVersion"] = Value::String(inner.next_version());
        inner.objects.insert(key, value.clone());
        inner.record("replace_status", &kind, &id);
        from_value(value, &id)
    }

    async fn delete<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<()> {
        let kind = kind_of::<K>();
        let mut inner = self.lock();
        inner.check_failure("delete", &kind, id)?;
        let key = (kind.clone(), id.namespace.clone(), id.name.clone());
        let mut value = match inner.objects.get(&key) {
            None => return Err(not_found("delete", &kind, id)),
            Some(stored) => stored.clone(),
        };
        inner.record("delete", &kind, id);
        if !has_finalizers(&value) {
            inner.remove(&key);
            return Ok(());
        }
        if value["metadata"]["deletionTimestamp"].is_null() {
            value["metadata"]["deletionTimestamp"] =
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
            value["metadata"]["resourceVersion"] = Value::String(inner.next_version());
            inner.objects.insert(key, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use kube::api::ObjectMeta;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("bots".into()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn stale_version_conflicts() {
        let store = MemoryStore::default();
        let created = store.create(&config_map("a")).await.unwrap();
        store.replace(&created).await.unwrap();
        let err = store.replace(&created).await.unwrap_err();
        assert!(err.is_conflict());
        let err = store.create(&config_map("a")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn finalizers_gate_deletion() {
        let store = MemoryStore::default();
        let mut owner = config_map("owner");
        owner.metadata.finalizers = Some(vec!["eevee.bot/test".into()]);
        let owner = store.create(&owner).await.unwrap();
        let mut child = config_map("child");
        child.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "v1".into(),
            kind: "ConfigMap".into(),
            name: "owner".into(),
            uid: owner.metadata.uid.clone().unwrap(),
            controller: Some(true),
            ..OwnerReference::default()
        }]);
        store.create(&child).await.unwrap();

        let owner_id = ResourceId::new("bots", "owner");
        let child_id = ResourceId::new("bots", "child");
        store.delete::<ConfigMap>(&owner_id).await.unwrap();
        let mut marked: ConfigMap = store.object(&owner_id).unwrap();
        assert!(marked.metadata.deletion_timestamp.is_some());
        assert!(store.contains::<ConfigMap>(&child_id));

        marked.metadata.finalizers = Some(Vec::new());
        store.replace(&marked).await.unwrap();
        assert!(!store.contains::<ConfigMap>(&owner_id));
        assert!(!store.contains::<ConfigMap>(&child_id));
    }
}

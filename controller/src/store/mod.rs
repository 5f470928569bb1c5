//! The object store the reconciler reads and writes through. In production this is the Kubernetes
//! API; tests use an in-memory store with the same version-token and deletion semantics.

mod error;
#[cfg(test)]
pub(crate) mod memory;
mod optimistic;

pub(crate) use error::{StoreError, StoreResult};
pub(crate) use optimistic::{optimistic_update, UpdateTarget};

use eevee_model::CrdExt;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Resource};
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use std::fmt::{Debug, Display, Formatter};

/// The namespace + name identity of an object.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) struct ResourceId {
    pub(crate) namespace: String,
    pub(crate) name: String,
}

impl ResourceId {
    pub(crate) fn new<S1, S2>(namespace: S1, name: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub(crate) fn of<K: CrdExt>(obj: &K) -> Self {
        Self::new(obj.object_namespace(), obj.object_name())
    }

    /// The identity of a sibling object in the same namespace.
    pub(crate) fn sibling<S: Into<String>>(&self, name: S) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Any namespaced object the store can hold.
pub(crate) trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoreObject for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

pub(crate) fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

pub(crate) fn id_of<K: StoreObject>(obj: &K) -> ResourceId {
    let meta = obj.meta();
    ResourceId::new(
        meta.namespace.as_deref().unwrap_or_default(),
        meta.name.as_deref().unwrap_or_default(),
    )
}

/// Get/create/update/delete scoped to namespace + name. `replace` and `replace_status` carry the
/// object's `resourceVersion` and fail with [`StoreError::Conflict`] when it is stale.
#[async_trait::async_trait]
pub(crate) trait Store: Send + Sync + 'static {
    /// Returns `None` if the object does not exist.
    async fn get<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<Option<K>>;

    async fn create<K: StoreObject>(&self, obj: &K) -> StoreResult<K>;

    /// Update everything except `status`.
    async fn replace<K: StoreObject>(&self, obj: &K) -> StoreResult<K>;

    /// Update only `status`.
    async fn replace_status<K: StoreObject>(&self, obj: &K) -> StoreResult<K>;

    /// Request deletion. Objects with finalizers are only marked for deletion; owned objects are
    /// removed by the store once their owner is gone.
    async fn delete<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<()>;
}

/// A [`Store`] backed by the Kubernetes API server.
#[derive(Clone)]
pub(crate) struct KubeStore {
    client: kube::Client,
}

impl KubeStore {
    pub(crate) fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl Store for KubeStore {
    async fn get<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<Option<K>> {
        trace!("getting {} '{}'", kind_of::<K>(), id);
        self.api::<K>(&id.namespace)
            .get_opt(&id.name)
            .await
            .map_err(|e| StoreError::classify(e, "get", kind_of::<K>(), id.to_string()))
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let id = id_of(obj);
        debug!("creating {} '{}'", kind_of::<K>(), id);
        self.api::<K>(&id.namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| StoreError::classify(e, "create", kind_of::<K>(), id.to_string()))
    }

    async fn replace<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let id = id_of(obj);
        debug!("replacing {} '{}'", kind_of::<K>(), id);
        self.api::<K>(&id.namespace)
            .replace(&id.name, &PostParams::default(), obj)
            .await
            .map_err(|e| StoreError::classify(e, "replace", kind_of::<K>(), id.to_string()))
    }

    async fn replace_status<K: StoreObject>(&self, obj: &K) -> StoreResult<K> {
        let id = id_of(obj);
        debug!("replacing status of {} '{}'", kind_of::<K>(), id);
        let data = serde_json::to_vec(obj).context(error::SerializationSnafu {
            kind: kind_of::<K>(),
            id: id.to_string(),
        })?;
        self.api::<K>(&id.namespace)
            .replace_status(&id.name, &PostParams::default(), data)
            .await
            .map_err(|e| {
                StoreError::classify(e, "replace status of", kind_of::<K>(), id.to_string())
            })
    }

    async fn delete<K: StoreObject>(&self, id: &ResourceId) -> StoreResult<()> {
        debug!("deleting {} '{}'", kind_of::<K>(), id);
        let _ = self
            .api::<K>(&id.namespace)
            .delete(&id.name, &DeleteParams::background())
            .await
            .map_err(|e| StoreError::classify(e, "delete", kind_of::<K>(), id.to_string()))?;
        Ok(())
    }
}

use crate::store::{id_of, Store, StoreResult};
use k8s_openapi::api::core::v1::Secret;
use log::debug;

/// What [`ensure_secret`] had to do.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

/// Create `desired` if it does not exist. Otherwise copy its data, labels and owner reference onto
/// the live secret and write it back if any of them differ. A secret deleted between the read and
/// the write is created again.
pub(crate) async fn ensure_secret<St: Store>(
    store: &St,
    desired: &Secret,
) -> StoreResult<OperationResult> {
    let id = id_of(desired);
    let mut live: Secret = match store.get(&id).await? {
        None => {
            store.create(desired).await?;
            debug!("Created secret '{}'", id);
            return Ok(OperationResult::Created);
        }
        Some(live) => live,
    };

    let mut changed = false;
    if live.data != desired.data {
        live.data = desired.data.clone();
        changed = true;
    }
    if live.string_data.is_some() {
        live.string_data = None;
        changed = true;
    }
    if live.metadata.labels != desired.metadata.labels {
        live.metadata.labels = desired.metadata.labels.clone();
        changed = true;
    }
    if live.metadata.owner_references != desired.metadata.owner_references {
        live.metadata.owner_references = desired.metadata.owner_references.clone();
        changed = true;
    }
    if !changed {
        return Ok(OperationResult::Unchanged);
    }

    match store.replace(&live).await {
        Ok(_) => {
            debug!("Updated secret '{}'", id);
            Ok(OperationResult::Updated)
        }
        Err(e) if e.is_not_found() => {
            debug!("Secret '{}' was deleted before it could be updated, recreating", id);
            store.create(desired).await?;
            Ok(OperationResult::Created)
        }
        Err(e) => Err(e),
    }
}

use super::{kind_of, ResourceId, Store, StoreObject, StoreResult};
use log::debug;

/// Which part of the object an [`optimistic_update`] writes.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum UpdateTarget {
    /// Metadata and spec, e.g. finalizers.
    Object,
    Status,
}

/// Fetch the latest copy of the object, apply `mutate` and write it back. When the write loses a
/// version race the whole fetch-mutate-write cycle is retried, up to `attempts` times in total.
///
/// `mutate` returns `false` when the object already looks the way it should, in which case nothing
/// is written. Returns `None` if the object no longer exists.
pub(crate) async fn optimistic_update<K, St, F>(
    store: &St,
    id: &ResourceId,
    target: UpdateTarget,
    attempts: u32,
    mut mutate: F,
) -> StoreResult<Option<K>>
where
    K: StoreObject,
    St: Store,
    F: FnMut(&mut K) -> bool + Send,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let mut obj = match store.get::<K>(id).await? {
            None => return Ok(None),
            Some(obj) => obj,
        };
        if !mutate(&mut obj) {
            return Ok(Some(obj));
        }
        let result = match target {
            UpdateTarget::Object => store.replace(&obj).await,
            UpdateTarget::Status => store.replace_status(&obj).await,
        };
        match result {
            Ok(updated) => return Ok(Some(updated)),
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) if e.is_conflict() && attempt < attempts => {
                debug!(
                    "{} '{}' changed underneath us (attempt {} of {}), retrying: {}",
                    kind_of::<K>(),
                    id,
                    attempt,
                    attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

use crate::config::ReconcileConfig;
use crate::error::{self, Result};
use crate::events::EventSink;
use crate::store::{optimistic_update, ResourceId, Store, UpdateTarget};
use crate::synthesis::KindStrategy;
use eevee_model::{Condition, CrdExt, ManagedResource};
use log::debug;
use snafu::{ensure, ResultExt};
use std::sync::Arc;

/// This is passed by `kube-runtime` to every [`reconcile`](crate::reconcile::reconcile) call. It
/// holds the collaborators a pass needs, so tests can swap in an in-memory store and a recording
/// event sink.
pub(crate) struct Context<S, St> {
    pub(crate) strategy: S,
    pub(crate) store: St,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) config: ReconcileConfig,
}

impl<S, St> Context<S, St>
where
    S: KindStrategy,
    St: Store,
{
    pub(crate) fn new(
        strategy: S,
        store: St,
        events: Arc<dyn EventSink>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            strategy,
            store,
            events,
            config,
        }
    }

    pub(crate) async fn get(&self, id: &ResourceId) -> Result<Option<S::Kind>> {
        self.store.get(id).await.context(error::StoreSnafu {
            operation: "get resource",
            id: id.clone(),
        })
    }

    /// Merge `condition` into the latest copy of the resource's status. Returns `None` if the
    /// resource is gone.
    pub(crate) async fn set_condition(
        &self,
        id: &ResourceId,
        condition: Condition,
    ) -> Result<Option<S::Kind>> {
        debug!(
            "Setting condition {}={} on '{}': {}",
            condition.type_, condition.status, id, condition.message
        );
        optimistic_update(
            &self.store,
            id,
            UpdateTarget::Status,
            self.config.conflict_attempts,
            |obj: &mut S::Kind| obj.set_condition(condition.clone()),
        )
        .await
        .context(error::StoreSnafu {
            operation: "update status",
            id: id.clone(),
        })
    }

    /// Add this kind's finalizer unless the resource is already being deleted.
    pub(crate) async fn add_finalizer(&self, id: &ResourceId) -> Result<Option<S::Kind>> {
        let finalizer = self.strategy.finalizer();
        debug!("Adding finalizer '{}' to '{}'", finalizer, id);
        optimistic_update(
            &self.store,
            id,
            UpdateTarget::Object,
            self.config.conflict_attempts,
            |obj: &mut S::Kind| !obj.is_delete_requested() && obj.add_finalizer(finalizer),
        )
        .await
        .context(error::StoreSnafu {
            operation: "add finalizer",
            id: id.clone(),
        })
    }

    /// Remove this kind's finalizer. It is an error for the finalizer to be missing.
    pub(crate) async fn remove_finalizer(&self, id: &ResourceId) -> Result<Option<S::Kind>> {
        let finalizer = self.strategy.finalizer();
        debug!("Removing finalizer '{}' from '{}'", finalizer, id);
        let mut missing = false;
        let updated = optimistic_update(
            &self.store,
            id,
            UpdateTarget::Object,
            self.config.conflict_attempts,
            |obj: &mut S::Kind| {
                missing = !obj.remove_finalizer(finalizer);
                !missing
            },
        )
        .await
        .context(error::StoreSnafu {
            operation: "remove finalizer",
            id: id.clone(),
        })?;
        ensure!(
            !missing,
            error::MissingFinalizerSnafu {
                id: id.clone(),
                finalizer
            }
        );
        Ok(updated)
    }
}

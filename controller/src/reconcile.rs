use crate::action::{
    child_action, resource_action, Action, ChildAction, CreationAction, DestructionAction,
};
use crate::config::ReconcileConfig;
use crate::constants::{no_requeue, requeue_after, requeue_immediate};
use crate::context::Context;
use crate::error::{self, ReconcileError, Result};
use crate::events::KubeEventSink;
use crate::secret::ensure_secret;
use crate::store::{KubeStore, ResourceId, Store};
use crate::synthesis::{DesiredChildren, DesiredSecret, KindStrategy};
use crate::teardown::run_teardown;
use eevee_model::constants::{
    CONDITION_AVAILABLE, CONDITION_DEGRADED, REASON_FINALIZING, REASON_RECONCILING,
    REASON_RESIZING,
};
use eevee_model::{Condition, ConditionStatus, ManagedResource};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use kube_runtime::controller::Action as RequeueAction;
use kube_runtime::{controller, watcher, Controller};
use log::{debug, error, info, trace};
use snafu::{ensure, ResultExt};
use std::sync::Arc;

/// Watches one managed kind, and the `Deployment` and `Secret` objects it owns, until the process
/// receives a shutdown signal.
pub(crate) async fn run_controller<S>(
    client: Client,
    strategy: S,
    config: ReconcileConfig,
    namespace: Option<String>,
) where
    S: KindStrategy,
{
    let context = Arc::new(Context::new(
        strategy,
        KubeStore::new(client.clone()),
        Arc::new(KubeEventSink::new(client.clone())),
        config,
    ));
    Controller::new(
        scoped_api::<S::Kind>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .owns(
        scoped_api::<Deployment>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .owns(
        scoped_api::<Secret>(&client, namespace.as_deref()),
        watcher::Config::default(),
    )
    .shutdown_on_signal()
    .run(reconcile::<S, KubeStore>, error_policy::<S, KubeStore>, context)
    .for_each(|reconciliation_result| async move {
        match reconciliation_result {
            Ok((obj, _)) => trace!("Reconciled {}", obj),
            Err(controller::Error::ObjectNotFound(obj)) => {
                debug!("Object is gone: {}", obj)
            }
            Err(e) => error!("Error during reconciliation: {}", e),
        }
    })
    .await;
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

/// Called when [`reconcile`] returns an error.
pub(crate) fn error_policy<S, St>(
    obj: Arc<S::Kind>,
    e: &ReconcileError,
    context: Arc<Context<S, St>>,
) -> RequeueAction
where
    S: KindStrategy,
    St: Store,
{
    error!(
        "Reconciliation of '{}' failed: {}",
        ResourceId::of(obj.as_ref()),
        e
    );
    requeue_after(context.config.error_requeue)
}

/// The entrypoint for one pass over one object. The object handed to us by the watcher may be
/// stale, so only its identity is used and the pass works from a fresh read.
pub(crate) async fn reconcile<S, St>(
    obj: Arc<S::Kind>,
    context: Arc<Context<S, St>>,
) -> Result<RequeueAction>
where
    S: KindStrategy,
    St: Store,
{
    let id = ResourceId::of(obj.as_ref());
    let deadline = context.config.pass_deadline;
    match tokio::time::timeout(deadline, reconcile_pass(&id, &context)).await {
        Ok(result) => result,
        Err(_) => error::DeadlineExceededSnafu { id, deadline }.fail(),
    }
}

pub(crate) async fn reconcile_pass<S, St>(
    id: &ResourceId,
    context: &Context<S, St>,
) -> Result<RequeueAction>
where
    S: KindStrategy,
    St: Store,
{
    let obj = match context.get(id).await? {
        None => {
            info!("'{}' no longer exists", id);
            return Ok(no_requeue());
        }
        Some(obj) => obj,
    };

    let action = resource_action(&obj, context.strategy.finalizer());
    trace!("Action for '{}': {:?}", id, action);
    match action {
        Action::Creation(CreationAction::Initialize) => {
            context
                .set_condition(
                    id,
                    Condition::new(
                        CONDITION_AVAILABLE,
                        ConditionStatus::Unknown,
                        REASON_RECONCILING,
                        "Starting reconciliation",
                    ),
                )
                .await?;
            Ok(requeue_immediate())
        }
        Action::Creation(CreationAction::AddFinalizer) => {
            context.add_finalizer(id).await?;
            Ok(requeue_immediate())
        }
        Action::Creation(CreationAction::Converge) => converge(id, &obj, context).await,
        Action::Destruction(DestructionAction::Teardown) => teardown(id, context).await,
        Action::Destruction(DestructionAction::Finalized) => {
            debug!("'{}' is already finalized", id);
            Ok(no_requeue())
        }
    }
}

async fn teardown<S, St>(id: &ResourceId, context: &Context<S, St>) -> Result<RequeueAction>
where
    S: KindStrategy,
    St: Store,
{
    let obj = match context
        .set_condition(
            id,
            Condition::new(
                CONDITION_DEGRADED,
                ConditionStatus::Unknown,
                REASON_FINALIZING,
                format!(
                    "Performing finalizer operations for the custom resource: {}",
                    id.name
                ),
            ),
        )
        .await?
    {
        None => return Ok(no_requeue()),
        Some(obj) => obj,
    };

    run_teardown(context.events.as_ref(), &obj).await;

    let finished = context
        .set_condition(
            id,
            Condition::new(
                CONDITION_DEGRADED,
                ConditionStatus::True,
                REASON_FINALIZING,
                format!(
                    "Finalizer operations for custom resource {} name were successfully accomplished",
                    id.name
                ),
            ),
        )
        .await?;
    if finished.is_some() {
        context.remove_finalizer(id).await?;
    }
    Ok(no_requeue())
}

async fn converge<S, St>(
    id: &ResourceId,
    obj: &S::Kind,
    context: &Context<S, St>,
) -> Result<RequeueAction>
where
    S: KindStrategy,
    St: Store,
{
    let children = match context.strategy.synthesize(obj) {
        Ok(children) => children,
        Err(e) => {
            context
                .set_condition(
                    id,
                    Condition::new(
                        CONDITION_AVAILABLE,
                        ConditionStatus::False,
                        REASON_RECONCILING,
                        format!(
                            "Failed to create Deployment for the custom resource ({}): ({})",
                            id.name, e
                        ),
                    ),
                )
                .await?;
            return Err(e).context(error::SynthesisSnafu { id: id.clone() });
        }
    };

    reconcile_secret(id, &children, context).await?;

    let desired = obj.size().unwrap_or(1);
    let live: Option<Deployment> = context.store.get(id).await.context(error::StoreSnafu {
        operation: "get deployment",
        id: id.clone(),
    })?;

    match (child_action(live.as_ref(), desired), live) {
        (ChildAction::Create, _) | (ChildAction::Resize { .. }, None) => {
            info!("Creating deployment for '{}'", id);
            context
                .store
                .create(&children.deployment)
                .await
                .context(error::StoreSnafu {
                    operation: "create deployment",
                    id: id.clone(),
                })?;
            Ok(requeue_after(context.config.child_recheck))
        }
        (ChildAction::Resize { observed, desired }, Some(mut live)) => {
            info!(
                "Resizing deployment for '{}' from {} to {} replicas",
                id, observed, desired
            );
            live.spec.get_or_insert_with(Default::default).replicas = Some(desired);
            match context.store.replace(&live).await {
                Ok(_) => Ok(requeue_immediate()),
                Err(e) if e.is_not_found() => {
                    // The next pass takes the create path.
                    debug!("Deployment for '{}' is gone, it will be recreated", id);
                    Ok(requeue_immediate())
                }
                Err(e) => {
                    context
                        .set_condition(
                            id,
                            Condition::new(
                                CONDITION_AVAILABLE,
                                ConditionStatus::False,
                                REASON_RESIZING,
                                format!(
                                    "Failed to update the size for the custom resource ({}): ({})",
                                    id.name, e
                                ),
                            ),
                        )
                        .await?;
                    Err(e).context(error::StoreSnafu {
                        operation: "resize deployment",
                        id: id.clone(),
                    })
                }
            }
        }
        (ChildAction::Converged, _) => {
            context
                .set_condition(
                    id,
                    Condition::new(
                        CONDITION_AVAILABLE,
                        ConditionStatus::True,
                        REASON_RECONCILING,
                        format!(
                            "Deployment for custom resource ({}) with {} replicas created successfully",
                            id.name, desired
                        ),
                    ),
                )
                .await?;
            Ok(no_requeue())
        }
    }
}

/// A referenced secret must exist. A generated secret is created or brought back in line with the
/// rendered configuration on every pass.
async fn reconcile_secret<S, St>(
    id: &ResourceId,
    children: &DesiredChildren,
    context: &Context<S, St>,
) -> Result<()>
where
    S: KindStrategy,
    St: Store,
{
    match &children.secret {
        DesiredSecret::None => {}
        DesiredSecret::External(name) => {
            let existing: Option<Secret> = context
                .store
                .get(&id.sibling(name.as_str()))
                .await
                .context(error::StoreSnafu {
                    operation: format!("get secret '{}'", name),
                    id: id.clone(),
                })?;
            ensure!(
                existing.is_some(),
                error::ExistingSecretMissingSnafu {
                    id: id.clone(),
                    secret: name
                }
            );
        }
        DesiredSecret::Generated(secret) => {
            let result = ensure_secret(&context.store, secret)
                .await
                .context(error::StoreSnafu {
                    operation: "ensure configuration secret",
                    id: id.clone(),
                })?;
            debug!("Configuration secret for '{}': {:?}", id, result);
        }
    }
    Ok(())
}

use eevee_model::ManagedResource;
use k8s_openapi::api::apps::v1::Deployment;

/// The action that the controller needs to take in order to reconcile a managed resource. It is
/// derived fresh from the observed object on every pass.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Action {
    Creation(CreationAction),
    Destruction(DestructionAction),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum CreationAction {
    /// No conditions have been written yet.
    Initialize,
    AddFinalizer,
    /// Bring the children in line with the spec.
    Converge,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum DestructionAction {
    /// Our finalizer is still present, run teardown and remove it.
    Teardown,
    /// Our finalizer is already gone, the store will finish the deletion.
    Finalized,
}

/// Deletion is checked first so that a terminating resource never gains a finalizer.
pub(crate) fn resource_action<K: ManagedResource>(obj: &K, finalizer: &str) -> Action {
    if obj.is_delete_requested() {
        return Action::Destruction(if obj.has_finalizer(finalizer) {
            DestructionAction::Teardown
        } else {
            DestructionAction::Finalized
        });
    }
    if obj.conditions().is_empty() {
        return Action::Creation(CreationAction::Initialize);
    }
    if !obj.has_finalizer(finalizer) {
        return Action::Creation(CreationAction::AddFinalizer);
    }
    Action::Creation(CreationAction::Converge)
}

/// What to do about the worker `Deployment`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ChildAction {
    Create,
    /// Only the replica count is corrected; other drift is left alone.
    Resize { observed: i32, desired: i32 },
    Converged,
}

pub(crate) fn child_action(live: Option<&Deployment>, desired: i32) -> ChildAction {
    let live = match live {
        None => return ChildAction::Create,
        Some(live) => live,
    };
    // An unset replica count means one replica.
    let observed = live
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    if observed == desired {
        ChildAction::Converged
    } else {
        ChildAction::Resize { observed, desired }
    }
}

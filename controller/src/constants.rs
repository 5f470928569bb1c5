use kube_runtime::controller::Action;
use std::time::Duration;

/// How long to wait before checking on a child object the controller just created.
pub(crate) const CHILD_RECHECK: Duration = Duration::from_secs(60);

/// The backoff used after a failed reconciliation pass.
pub(crate) const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// The longest a single reconciliation pass may run.
pub(crate) const PASS_DEADLINE: Duration = Duration::from_secs(30);

/// The number of fetch-mutate-write attempts made for a single update before a conflict is
/// reported as an error.
pub(crate) const CONFLICT_ATTEMPTS: u32 = 3;

/// Tell the controller to reconcile the object again after `duration`.
pub(crate) fn requeue_after(duration: Duration) -> Action {
    Action::requeue(duration)
}

/// Reconcile again right away. Used after a pass that persisted one step of progress.
pub(crate) fn requeue_immediate() -> Action {
    Action::requeue(Duration::from_millis(10))
}

/// Do not requeue the object.
pub(crate) fn no_requeue() -> Action {
    Action::await_change()
}

use crate::store::{ResourceId, StoreError};
use crate::synthesis::SynthesisError;
use snafu::Snafu;
use std::time::Duration;

pub(crate) type Result<T> = std::result::Result<T, ReconcileError>;

/// Ends a reconciliation pass. The controller logs it and retries after a delay.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum ReconcileError {
    #[snafu(display("Unable to {} for '{}': {}", operation, id, source))]
    Store {
        operation: String,
        id: ResourceId,
        source: StoreError,
    },

    #[snafu(display("Unable to build the children of '{}': {}", id, source))]
    Synthesis {
        id: ResourceId,
        source: SynthesisError,
    },

    #[snafu(display(
        "Secret '{}' referenced by '{}' does not exist",
        secret,
        id
    ))]
    ExistingSecretMissing { id: ResourceId, secret: String },

    #[snafu(display(
        "Finalizer '{}' cannot be removed from '{}' because it is not present",
        finalizer,
        id
    ))]
    MissingFinalizer { id: ResourceId, finalizer: String },

    #[snafu(display(
        "Reconciliation of '{}' did not finish within {:?}",
        id,
        deadline
    ))]
    DeadlineExceeded { id: ResourceId, deadline: Duration },
}

use crate::condition::{set_condition, Condition};
use crate::CrdExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The observed state shared by every kind the operator manages.
#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedStatus {
    /// Condition types are `Available` and `Degraded`, each appearing at most once.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A declarative object the operator drives a worker `Deployment` (and optionally a configuration
/// `Secret`) for. Both CRD kinds implement this so the controller can treat them uniformly.
pub trait ManagedResource: CrdExt {
    /// The requested replica count, if the user set one.
    fn size(&self) -> Option<i32>;

    /// The requested container image. May be empty.
    fn container_image(&self) -> &str;

    /// The requested pull policy string, exactly as written by the user.
    fn pull_policy(&self) -> &str;

    fn managed_status(&self) -> Option<&ManagedStatus>;

    fn managed_status_mut(&mut self) -> &mut ManagedStatus;

    /// The current conditions, empty when no status has been written.
    fn conditions(&self) -> &[Condition] {
        self.managed_status()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Merge `condition` into the status. Returns `true` if anything changed.
    fn set_condition(&mut self, condition: Condition) -> bool {
        set_condition(&mut self.managed_status_mut().conditions, condition)
    }
}

/// Implements `CrdExt` and `ManagedResource` for a `kube::CustomResource` whose spec has `size`,
/// `container_image` and `pull_policy` fields and whose status is `ManagedStatus`.
macro_rules! impl_managed_resource {
    ($kind:ty) => {
        impl $crate::CrdExt for $kind {
            fn object_meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                kube::Resource::meta(self)
            }

            fn object_meta_mut(
                &mut self,
            ) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                kube::Resource::meta_mut(self)
            }
        }

        impl $crate::ManagedResource for $kind {
            fn size(&self) -> Option<i32> {
                self.spec.size
            }

            fn container_image(&self) -> &str {
                &self.spec.container_image
            }

            fn pull_policy(&self) -> &str {
                &self.spec.pull_policy
            }

            fn managed_status(&self) -> Option<&$crate::ManagedStatus> {
                self.status.as_ref()
            }

            fn managed_status_mut(&mut self) -> &mut $crate::ManagedStatus {
                self.status.get_or_insert_with(Default::default)
            }
        }
    };
}

pub(crate) use impl_managed_resource;

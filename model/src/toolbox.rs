use crate::managed_resource::impl_managed_resource;
use crate::ManagedStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A shell environment with the eevee command line tools, connected to the bot's NATS cluster.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "eevee.bot",
    kind = "Toolbox",
    namespaced,
    plural = "toolboxes",
    singular = "toolbox",
    status = "ManagedStatus",
    version = "v1",
    printcolumn = r#"{"name":"Size", "type":"integer", "jsonPath":".spec.size"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ToolboxSpec {
    /// The number of toolbox instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 3))]
    pub size: Option<i32>,
    /// The container image to run. An empty value selects the default toolbox image.
    #[serde(default)]
    pub container_image: String,
    /// `Always` pulls on every start; anything else means `IfNotPresent`.
    #[serde(default = "crate::schema_utils::default_pull_policy")]
    pub pull_policy: String,
    /// The secret holding the NATS `token` key.
    #[serde(default = "default_nats_auth_secret")]
    pub nats_auth_secret: String,
    /// The namespace the NATS service runs in. Empty means the toolbox's own namespace.
    #[serde(default)]
    pub nats_namespace: String,
    #[serde(default)]
    pub metrics: bool,
}

impl_managed_resource!(Toolbox);

fn default_nats_auth_secret() -> String {
    "nats-auth".to_owned()
}

#[test]
fn deserialize_with_defaults() {
    use crate::ManagedResource;

    let toolbox: Toolbox = serde_json::from_value(serde_json::json!({
        "apiVersion": "eevee.bot/v1",
        "kind": "Toolbox",
        "metadata": { "name": "tools", "namespace": "bots" },
        "spec": { "size": 2 }
    }))
    .unwrap();
    assert_eq!(toolbox.size(), Some(2));
    assert_eq!(toolbox.pull_policy(), "Always");
    assert_eq!(toolbox.spec.nats_auth_secret, "nats-auth");
    assert!(toolbox.conditions().is_empty());
}

/// Helper macro to avoid retyping the base domain-like name of the operator when creating further
/// string constants from it. When given no parameters, this returns the API group. When given a
/// string literal parameter it adds `/parameter` to the end.
macro_rules! eevee {
    () => {
        "eevee.bot"
    };
    ($s:literal) => {
        concat!(eevee!(), "/", $s)
    };
}

// System identifiers
pub const API_GROUP: &str = eevee!();
pub const API_VERSION: &str = eevee!("v1");
pub const OPERATOR: &str = "eevee-operator";

// Names of finalizers used by the controller, one per kind
pub const FINALIZER_CONNECTOR_IRC: &str = eevee!("connectorirc-finalizer");
pub const FINALIZER_TOOLBOX: &str = eevee!("toolbox-finalizer");

// Default worker images
pub const DEFAULT_IMAGE_CONNECTOR_IRC: &str = "ghcr.io/eeveebot/connector-irc:latest";
pub const DEFAULT_IMAGE_TOOLBOX: &str = "ghcr.io/eeveebot/toolbox:latest";

// Standard tags https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
pub const APP_NAME: &str = "app.kubernetes.io/name";
pub const APP_VERSION: &str = "app.kubernetes.io/version";
pub const APP_COMPONENT: &str = "app.kubernetes.io/component";
pub const APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// Condition types
pub const CONDITION_AVAILABLE: &str = "Available";
pub const CONDITION_DEGRADED: &str = "Degraded";

// Condition reasons
pub const REASON_RECONCILING: &str = "Reconciling";
pub const REASON_FINALIZING: &str = "Finalizing";
pub const REASON_RESIZING: &str = "Resizing";

// Image pull policies as understood by the kubelet
pub const PULL_ALWAYS: &str = "Always";
pub const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";

// Generated configuration for `ConnectorIrc`
pub const CONNECTIONS_SECRET_SUFFIX: &str = "connections-config";
pub const CONNECTIONS_DOCUMENT: &str = "connections.yaml";
pub const CONNECTIONS_CONFIG_DIR: &str = "/eevee/etc";

#[test]
fn eevee_constants_macro_test() {
    assert_eq!("eevee.bot", eevee!());
    assert_eq!("eevee.bot/v1", API_VERSION);
    assert_eq!("eevee.bot/foo", eevee!("foo"));
    assert_eq!("eevee.bot/toolbox-finalizer", FINALIZER_TOOLBOX);
}

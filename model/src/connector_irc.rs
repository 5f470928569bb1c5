use crate::error::{self, Result};
use crate::managed_resource::impl_managed_resource;
use crate::ManagedStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// An IRC connector bot. The controller runs it as a `Deployment` and, unless an existing secret
/// is referenced, renders `connections` into a generated configuration `Secret`. The
/// `CustomResource` derive also produces a struct named `ConnectorIrc` which represents the
/// object in the k8s API.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "eevee.bot",
    kind = "ConnectorIrc",
    namespaced,
    plural = "connectorircs",
    singular = "connectorirc",
    status = "ManagedStatus",
    version = "v1",
    printcolumn = r#"{"name":"Size", "type":"integer", "jsonPath":".spec.size"}"#,
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.containerImage"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorIrcSpec {
    /// The number of connector instances. A single connector per object is supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 1))]
    pub size: Option<i32>,
    /// The container image to run. An empty value selects the default connector image.
    #[serde(default)]
    pub container_image: String,
    /// `Always` pulls on every start; anything else means `IfNotPresent`.
    #[serde(default = "crate::schema_utils::default_pull_policy")]
    pub pull_policy: String,
    /// The name of a user-managed secret holding `connections.yaml`. When set, `connections` is
    /// ignored and no secret is generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_secret_ref: Option<String>,
    /// The IRC networks to connect to.
    #[serde(default, deserialize_with = "crate::schema_utils::null_to_default")]
    pub connections: Vec<IrcConnection>,
}

#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IrcConnection {
    /// A unique name for this connection, used to address it from other eevee components.
    pub name: String,
    pub irc: IrcServer,
    pub ident: IrcIdent,
    /// Actions run once the connection is registered, in `sequence` order.
    #[serde(default, deserialize_with = "crate::schema_utils::null_to_default")]
    pub post_connect: Vec<PostConnectAction>,
}

#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IrcServer {
    pub host: String,
    #[serde(default = "default_port")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: i32,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// Milliseconds to wait between reconnect attempts.
    #[serde(default = "default_wait")]
    pub auto_reconnect_wait: i32,
    #[serde(default = "default_retries")]
    pub auto_reconnect_max_retries: i32,
    #[serde(default = "default_true")]
    pub auto_rejoin: bool,
    /// Milliseconds to wait between rejoin attempts.
    #[serde(default = "default_wait")]
    pub auto_rejoin_wait: i32,
    #[serde(default = "default_retries")]
    pub auto_rejoin_max_retries: i32,
}

impl Default for IrcServer {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            ssl: false,
            auto_reconnect: true,
            auto_reconnect_wait: default_wait(),
            auto_reconnect_max_retries: default_retries(),
            auto_rejoin: true,
            auto_rejoin_wait: default_wait(),
            auto_rejoin_max_retries: default_retries(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Eq, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IrcIdent {
    pub nick: String,
    pub username: String,
    #[serde(default)]
    pub gecos: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quit_msg: Option<String>,
}

/// Something the connector does after registering with the server. Actions are ordered by their
/// explicit `sequence` number rather than by list position.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Clone, JsonSchema)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PostConnectAction {
    Join {
        sequence: i32,
        channel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    Message {
        sequence: i32,
        target: String,
        msg: String,
    },
    Mode {
        sequence: i32,
        target: String,
        mode: String,
    },
    Raw {
        sequence: i32,
        raw: String,
    },
}

impl PostConnectAction {
    pub fn sequence(&self) -> i32 {
        match self {
            PostConnectAction::Join { sequence, .. }
            | PostConnectAction::Message { sequence, .. }
            | PostConnectAction::Mode { sequence, .. }
            | PostConnectAction::Raw { sequence, .. } => *sequence,
        }
    }
}

impl ConnectorIrc {
    /// Render the connections list as the YAML document the connector reads at startup. Each
    /// connection's post-connect actions are sorted by `sequence` (ties keep their list order), so
    /// equal specs always render identical documents.
    pub fn connections_document(&self) -> Result<String> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Document<'a> {
            irc_connections: &'a [IrcConnection],
        }

        let connections: Vec<IrcConnection> = self
            .spec
            .connections
            .iter()
            .cloned()
            .map(|mut connection| {
                connection.post_connect.sort_by_key(PostConnectAction::sequence);
                connection
            })
            .collect();

        Ok(serde_yaml::to_string(&Document {
            irc_connections: &connections,
        })
        .context(error::ConnectionsSerializationSnafu {
            name: kube::ResourceExt::name_any(self),
        })?)
    }
}

impl_managed_resource!(ConnectorIrc);

fn default_port() -> i32 {
    6667
}

fn default_true() -> bool {
    true
}

fn default_wait() -> i32 {
    5000
}

fn default_retries() -> i32 {
    10
}

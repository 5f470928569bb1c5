/*!

This library provides the Kubernetes custom resource definitions managed by the eevee operator,
along with the status condition bookkeeping shared by every kind.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use condition::{find_condition, set_condition, Condition, ConditionStatus};
pub use connector_irc::{
    ConnectorIrc, ConnectorIrcSpec, IrcConnection, IrcIdent, IrcServer, PostConnectAction,
};
pub use crd_ext::CrdExt;
pub use error::{Error, Result};
pub use managed_resource::{ManagedResource, ManagedStatus};
pub use toolbox::{Toolbox, ToolboxSpec};

mod condition;
mod connector_irc;
pub mod constants;
mod crd_ext;
mod error;
mod managed_resource;
mod schema_utils;
mod toolbox;

//! Computes the desired children of a managed resource. Nothing in here performs I/O: the same
//! object always produces the same `Deployment` and configuration `Secret`.

mod connector_irc;
mod toolbox;
mod worker_builder;

pub(crate) use connector_irc::ConnectorIrcStrategy;
pub(crate) use toolbox::ToolboxStrategy;
pub(crate) use worker_builder::WorkerBuilder;

use crate::store::StoreObject;
use eevee_model::constants::{
    APP_COMPONENT, APP_MANAGED_BY, APP_NAME, APP_VERSION, OPERATOR, PULL_ALWAYS,
    PULL_IF_NOT_PRESENT,
};
use eevee_model::{CrdExt, ManagedResource};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{EnvVar, Secret, Volume, VolumeMount};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::Resource;
use maplit::btreemap;
use snafu::{OptionExt, Snafu};
use std::collections::BTreeMap;

pub(crate) type SynthesisResult<T> = std::result::Result<T, SynthesisError>;

/// A desired child could not be built from the object as written.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum SynthesisError {
    #[snafu(display("Container image '{}' has no tag", image))]
    InvalidImage { image: String },

    #[snafu(display("'{}' has no uid and cannot own other objects", name))]
    MissingOwnerUid { name: String },

    #[snafu(display("{}", source))]
    ConnectionsDocument { source: eevee_model::Error },
}

/// Where a worker reads its configuration from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum ConfigSource {
    /// The kind has no configuration secret.
    None,
    /// A user-managed secret, used as-is.
    External(String),
    /// A secret the operator renders and owns.
    Generated(ConfigDocument),
}

impl ConfigSource {
    /// The name of the secret the worker mounts, if any.
    pub(crate) fn secret_name(&self) -> Option<&str> {
        match self {
            ConfigSource::None => None,
            ConfigSource::External(name) => Some(name),
            ConfigSource::Generated(document) => Some(&document.secret_name),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ConfigDocument {
    pub(crate) secret_name: String,
    pub(crate) key: String,
    pub(crate) contents: String,
}

/// The kind-specific parts of the worker pod.
#[derive(Debug, Clone, Default)]
pub(crate) struct WorkerTemplate {
    pub(crate) container_name: &'static str,
    pub(crate) env: Vec<EnvVar>,
    pub(crate) volumes: Vec<Volume>,
    pub(crate) volume_mounts: Vec<VolumeMount>,
    pub(crate) pod_user: Option<i64>,
    pub(crate) pod_group: Option<i64>,
    pub(crate) container_user: Option<i64>,
    /// Values for the `kubernetes.io/arch` node affinity.
    pub(crate) architectures: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DesiredSecret {
    None,
    /// Must already exist; the operator never writes it.
    External(String),
    Generated(Secret),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DesiredChildren {
    pub(crate) deployment: Deployment,
    pub(crate) secret: DesiredSecret,
}

/// Everything the generic reconciler needs to know about one custom resource kind.
pub(crate) trait KindStrategy: Send + Sync + 'static {
    type Kind: ManagedResource + StoreObject;

    /// The finalizer this kind's controller owns.
    fn finalizer(&self) -> &str;

    fn default_image(&self) -> &'static str;

    /// Used as the `app.kubernetes.io/component` label.
    fn label_prefix(&self) -> &'static str;

    fn config_source(&self, obj: &Self::Kind) -> SynthesisResult<ConfigSource>;

    fn worker_template(&self, obj: &Self::Kind, config: &ConfigSource) -> WorkerTemplate;

    fn synthesize(&self, obj: &Self::Kind) -> SynthesisResult<DesiredChildren> {
        let name = obj.object_name();
        let image = resolve_image(obj.container_image(), self.default_image());
        let labels = labels(name, image_tag(image)?, self.label_prefix());
        let owner = obj
            .controller_owner_ref(&())
            .context(MissingOwnerUidSnafu { name })?;
        let config = self.config_source(obj)?;
        let template = self.worker_template(obj, &config);

        let deployment = WorkerBuilder {
            name,
            namespace: obj.object_namespace(),
            image,
            pull_policy: resolve_pull_policy(obj.pull_policy()),
            replicas: obj.size().unwrap_or(1),
            labels: &labels,
            owner: &owner,
            template,
        }
        .build();

        let secret = match config {
            ConfigSource::None => DesiredSecret::None,
            ConfigSource::External(name) => DesiredSecret::External(name),
            ConfigSource::Generated(document) => DesiredSecret::Generated(generated_secret(
                document,
                obj.object_namespace(),
                &labels,
                &owner,
            )),
        };

        Ok(DesiredChildren { deployment, secret })
    }
}

/// The spec image if set, otherwise the kind's default.
pub(crate) fn resolve_image<'a>(image: &'a str, default: &'a str) -> &'a str {
    if image.is_empty() {
        default
    } else {
        image
    }
}

/// Only the exact string `Always` pulls every time. Everything else, including typos and the
/// empty string, resolves to `IfNotPresent`.
pub(crate) fn resolve_pull_policy(pull_policy: &str) -> &'static str {
    if pull_policy == PULL_ALWAYS {
        PULL_ALWAYS
    } else {
        PULL_IF_NOT_PRESENT
    }
}

/// The substring after the last `:`.
pub(crate) fn image_tag(image: &str) -> SynthesisResult<&str> {
    match image.rsplit_once(':') {
        Some((_, tag)) if !tag.is_empty() && !tag.contains('/') => Ok(tag),
        _ => InvalidImageSnafu { image }.fail(),
    }
}

fn labels(name: &str, version: &str, component: &str) -> BTreeMap<String, String> {
    btreemap! {
        APP_NAME.to_owned() => name.to_owned(),
        APP_VERSION.to_owned() => version.to_owned(),
        APP_MANAGED_BY.to_owned() => OPERATOR.to_owned(),
        APP_COMPONENT.to_owned() => component.to_owned(),
    }
}

fn generated_secret(
    document: ConfigDocument,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    owner: &OwnerReference,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(document.secret_name),
            namespace: Some(namespace.to_owned()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner.clone()]),
            ..ObjectMeta::default()
        },
        data: Some(btreemap! {
            document.key => ByteString(document.contents.into_bytes()),
        }),
        type_: Some("Opaque".to_owned()),
        ..Secret::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_always_pulls_always() {
        assert_eq!(resolve_pull_policy("Always"), "Always");
        for policy in ["", "Never", "IfNotPresent", "always", "Alway", " Always"] {
            assert_eq!(resolve_pull_policy(policy), "IfNotPresent", "{:?}", policy);
        }
    }

    #[test]
    fn tag_is_after_last_colon() {
        assert_eq!(image_tag("ghcr.io/eeveebot/toolbox:1.2.3").unwrap(), "1.2.3");
        assert_eq!(
            image_tag("registry.local:5000/eeveebot/toolbox:latest").unwrap(),
            "latest"
        );
    }

    #[test]
    fn untagged_images_are_rejected() {
        for image in [
            "ghcr.io/eeveebot/toolbox",
            "toolbox:",
            "registry.local:5000/eeveebot/toolbox",
        ] {
            assert!(
                matches!(image_tag(image), Err(SynthesisError::InvalidImage { .. })),
                "{}",
                image
            );
        }
    }

    #[test]
    fn empty_image_uses_default() {
        assert_eq!(resolve_image("", "default:1"), "default:1");
        assert_eq!(resolve_image("mine:2", "default:1"), "mine:2");
    }
}

use crate::synthesis::{
    ConfigDocument, ConfigSource, ConnectionsDocumentSnafu, KindStrategy, SynthesisResult,
    WorkerTemplate,
};
use eevee_model::constants::{
    CONNECTIONS_CONFIG_DIR, CONNECTIONS_DOCUMENT, CONNECTIONS_SECRET_SUFFIX,
    DEFAULT_IMAGE_CONNECTOR_IRC, FINALIZER_CONNECTOR_IRC,
};
use eevee_model::{ConnectorIrc, CrdExt};
use k8s_openapi::api::core::v1::{EnvVar, SecretVolumeSource, Volume, VolumeMount};
use snafu::ResultExt;

const CONFIG_VOLUME: &str = "connector-irc-config";
const CONFIG_FILE_ENV: &str = "IRC_CONNECTIONS_CONFIG_FILE";

pub(crate) struct ConnectorIrcStrategy {
    finalizer: String,
}

impl ConnectorIrcStrategy {
    pub(crate) fn new<S: Into<String>>(finalizer: S) -> Self {
        Self {
            finalizer: finalizer.into(),
        }
    }
}

impl Default for ConnectorIrcStrategy {
    fn default() -> Self {
        Self::new(FINALIZER_CONNECTOR_IRC)
    }
}

impl KindStrategy for ConnectorIrcStrategy {
    type Kind = ConnectorIrc;

    fn finalizer(&self) -> &str {
        &self.finalizer
    }

    fn default_image(&self) -> &'static str {
        DEFAULT_IMAGE_CONNECTOR_IRC
    }

    fn label_prefix(&self) -> &'static str {
        "connector-irc"
    }

    /// A non-empty `existingSecretRef` wins over `connections`.
    fn config_source(&self, obj: &ConnectorIrc) -> SynthesisResult<ConfigSource> {
        if let Some(existing) = obj
            .spec
            .existing_secret_ref
            .as_deref()
            .filter(|name| !name.is_empty())
        {
            return Ok(ConfigSource::External(existing.to_owned()));
        }
        Ok(ConfigSource::Generated(ConfigDocument {
            secret_name: format!("{}-{}", obj.object_name(), CONNECTIONS_SECRET_SUFFIX),
            key: CONNECTIONS_DOCUMENT.to_owned(),
            contents: obj
                .connections_document()
                .context(ConnectionsDocumentSnafu)?,
        }))
    }

    fn worker_template(&self, _: &ConnectorIrc, config: &ConfigSource) -> WorkerTemplate {
        let config_file = format!("{}/{}", CONNECTIONS_CONFIG_DIR, CONNECTIONS_DOCUMENT);
        let (volumes, volume_mounts) = match config.secret_name() {
            None => (Vec::new(), Vec::new()),
            Some(secret_name) => (
                vec![Volume {
                    name: CONFIG_VOLUME.to_owned(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some(secret_name.to_owned()),
                        ..SecretVolumeSource::default()
                    }),
                    ..Volume::default()
                }],
                vec![VolumeMount {
                    name: CONFIG_VOLUME.to_owned(),
                    mount_path: config_file.clone(),
                    sub_path: Some(CONNECTIONS_DOCUMENT.to_owned()),
                    read_only: Some(true),
                    ..VolumeMount::default()
                }],
            ),
        };
        WorkerTemplate {
            container_name: "connector-irc",
            env: vec![EnvVar {
                name: CONFIG_FILE_ENV.to_owned(),
                value: Some(config_file),
                value_from: None,
            }],
            volumes,
            volume_mounts,
            pod_user: None,
            pod_group: None,
            container_user: Some(1000),
            architectures: &["amd64", "arm64", "ppc64le", "s390x"],
        }
    }
}

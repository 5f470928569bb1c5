use crate::synthesis::{ConfigSource, KindStrategy, SynthesisResult, WorkerTemplate};
use eevee_model::constants::{DEFAULT_IMAGE_TOOLBOX, FINALIZER_TOOLBOX};
use eevee_model::Toolbox;
use k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, SecretKeySelector};

const NATS_TOKEN_ENV: &str = "NATS_TOKEN";
const NATS_TOKEN_KEY: &str = "token";

pub(crate) struct ToolboxStrategy {
    finalizer: String,
}

impl ToolboxStrategy {
    pub(crate) fn new<S: Into<String>>(finalizer: S) -> Self {
        Self {
            finalizer: finalizer.into(),
        }
    }
}

impl Default for ToolboxStrategy {
    fn default() -> Self {
        Self::new(FINALIZER_TOOLBOX)
    }
}

impl KindStrategy for ToolboxStrategy {
    type Kind = Toolbox;

    fn finalizer(&self) -> &str {
        &self.finalizer
    }

    fn default_image(&self) -> &'static str {
        DEFAULT_IMAGE_TOOLBOX
    }

    fn label_prefix(&self) -> &'static str {
        "toolbox"
    }

    fn config_source(&self, _: &Toolbox) -> SynthesisResult<ConfigSource> {
        Ok(ConfigSource::None)
    }

    fn worker_template(&self, obj: &Toolbox, _: &ConfigSource) -> WorkerTemplate {
        WorkerTemplate {
            container_name: "toolbox",
            env: vec![EnvVar {
                name: NATS_TOKEN_ENV.to_owned(),
                value: None,
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: Some(obj.spec.nats_auth_secret.clone()),
                        key: NATS_TOKEN_KEY.to_owned(),
                        optional: None,
                    }),
                    ..EnvVarSource::default()
                }),
            }],
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            pod_user: Some(1000),
            pod_group: Some(1000),
            container_user: None,
            architectures: &["amd64", "arm64"],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::synthesis::DesiredSecret;
    use eevee_model::ToolboxSpec;
    use kube::api::ObjectMeta;

    #[test]
    fn toolbox_deployment() {
        let toolbox = Toolbox {
            metadata: ObjectMeta {
                name: Some("tools".into()),
                namespace: Some("bots".into()),
                uid: Some("uid-7".into()),
                ..ObjectMeta::default()
            },
            spec: ToolboxSpec {
                size: Some(3),
                container_image: "ghcr.io/eeveebot/toolbox:0.4.0".into(),
                pull_policy: "Never".into(),
                nats_auth_secret: "nats-auth".into(),
                ..ToolboxSpec::default()
            },
            status: None,
        };
        let children = ToolboxStrategy::default().synthesize(&toolbox).unwrap();
        assert_eq!(children.secret, DesiredSecret::None);

        let spec = children.deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(3));
        let labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(labels["app.kubernetes.io/component"], "toolbox");
        assert_eq!(labels["app.kubernetes.io/managed-by"], "eevee-operator");
        let pod = spec.template.spec.unwrap();
        let security = pod.security_context.unwrap();
        assert_eq!(security.run_as_user, Some(1000));
        assert_eq!(security.run_as_group, Some(1000));
        assert_eq!(security.seccomp_profile.unwrap().type_, "RuntimeDefault");
        let terms = pod
            .affinity
            .clone()
            .unwrap()
            .node_affinity
            .unwrap()
            .required_during_scheduling_ignored_during_execution
            .unwrap()
            .node_selector_terms;
        let arch = &terms[0].match_expressions.as_ref().unwrap()[0];
        assert_eq!(arch.values, Some(vec!["amd64".into(), "arm64".into()]));

        let container = &pod.containers[0];
        assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
        let context = container.security_context.as_ref().unwrap();
        assert_eq!(context.allow_privilege_escalation, Some(false));
        assert_eq!(
            context.capabilities.as_ref().unwrap().drop,
            Some(vec!["ALL".to_string()])
        );
        let env = &container.env.as_ref().unwrap()[0];
        let selector = env
            .value_from
            .as_ref()
            .unwrap()
            .secret_key_ref
            .as_ref()
            .unwrap();
        assert_eq!(env.name, "NATS_TOKEN");
        assert_eq!(selector.name.as_deref(), Some("nats-auth"));
        assert_eq!(selector.key, "token");
        assert!(pod.volumes.is_none());
    }
}

use crate::synthesis::WorkerTemplate;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Affinity, Capabilities, Container, NodeAffinity, NodeSelector, NodeSelectorRequirement,
    NodeSelectorTerm, PodSecurityContext, PodSpec, PodTemplateSpec, SeccompProfile,
    SecurityContext,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use std::collections::BTreeMap;

const ARCH_LABEL: &str = "kubernetes.io/arch";
const OS_LABEL: &str = "kubernetes.io/os";

/// Assembles the worker `Deployment` for a managed resource. The security posture is fixed:
/// workers run as non-root with the runtime default seccomp profile, no privilege escalation and
/// no capabilities, and only schedule onto linux nodes of the architectures the image supports.
#[derive(Debug, Clone)]
pub(crate) struct WorkerBuilder<'a> {
    pub(crate) name: &'a str,
    pub(crate) namespace: &'a str,
    pub(crate) image: &'a str,
    pub(crate) pull_policy: &'a str,
    pub(crate) replicas: i32,
    pub(crate) labels: &'a BTreeMap<String, String>,
    pub(crate) owner: &'a OwnerReference,
    pub(crate) template: WorkerTemplate,
}

impl WorkerBuilder<'_> {
    pub(crate) fn build(self) -> Deployment {
        let template = self.template;
        Deployment {
            metadata: ObjectMeta {
                name: Some(self.name.to_owned()),
                namespace: Some(self.namespace.to_owned()),
                labels: Some(self.labels.clone()),
                owner_references: Some(vec![self.owner.clone()]),
                ..ObjectMeta::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(self.labels.clone()),
                    ..LabelSelector::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(self.labels.clone()),
                        ..ObjectMeta::default()
                    }),
                    spec: Some(PodSpec {
                        affinity: Some(affinity(template.architectures)),
                        security_context: Some(PodSecurityContext {
                            run_as_non_root: Some(true),
                            run_as_user: template.pod_user,
                            run_as_group: template.pod_group,
                            seccomp_profile: Some(SeccompProfile {
                                type_: "RuntimeDefault".to_owned(),
                                ..SeccompProfile::default()
                            }),
                            ..PodSecurityContext::default()
                        }),
                        volumes: none_if_empty(template.volumes),
                        containers: vec![Container {
                            name: template.container_name.to_owned(),
                            image: Some(self.image.to_owned()),
                            image_pull_policy: Some(self.pull_policy.to_owned()),
                            security_context: Some(SecurityContext {
                                run_as_non_root: Some(true),
                                run_as_user: template.container_user,
                                allow_privilege_escalation: Some(false),
                                capabilities: Some(Capabilities {
                                    drop: Some(vec!["ALL".to_owned()]),
                                    ..Capabilities::default()
                                }),
                                ..SecurityContext::default()
                            }),
                            env: none_if_empty(template.env),
                            volume_mounts: none_if_empty(template.volume_mounts),
                            ..Container::default()
                        }],
                        ..PodSpec::default()
                    }),
                },
                ..DeploymentSpec::default()
            }),
            ..Deployment::default()
        }
    }
}

fn affinity(architectures: &[&str]) -> Affinity {
    Affinity {
        node_affinity: Some(NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: vec![NodeSelectorTerm {
                    match_expressions: Some(vec![
                        requirement(ARCH_LABEL, architectures),
                        requirement(OS_LABEL, &["linux"]),
                    ]),
                    ..NodeSelectorTerm::default()
                }],
            }),
            ..NodeAffinity::default()
        }),
        ..Affinity::default()
    }
}

fn requirement(key: &str, values: &[&str]) -> NodeSelectorRequirement {
    NodeSelectorRequirement {
        key: key.to_owned(),
        operator: "In".to_owned(),
        values: Some(values.iter().map(|&value| value.to_owned()).collect()),
    }
}

fn none_if_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

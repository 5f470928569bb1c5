use crate::events::{EventSink, Severity};
use eevee_model::CrdExt;
use kube::Resource;
use log::info;

const DELETING: &str = "Deleting";

/// Runs before the finalizer is removed from a resource that is being deleted. Children are not
/// touched here: they carry owner references and the store garbage collects them. Safe to run more
/// than once for the same deletion.
pub(crate) async fn run_teardown<K>(events: &dyn EventSink, obj: &K)
where
    K: Resource<DynamicType = ()> + CrdExt,
{
    info!(
        "Running teardown for {} '{}/{}'",
        K::kind(&()),
        obj.object_namespace(),
        obj.object_name()
    );
    events
        .emit(
            &obj.object_ref(&()),
            Severity::Warning,
            DELETING,
            &format!(
                "Custom Resource {} is being deleted from the namespace {}",
                obj.object_name(),
                obj.object_namespace()
            ),
        )
        .await;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::RecordingEventSink;
    use eevee_model::Toolbox;
    use kube::api::ObjectMeta;

    #[tokio::test]
    async fn emits_one_warning() {
        let sink = RecordingEventSink::default();
        let toolbox = Toolbox {
            metadata: ObjectMeta {
                name: Some("tools".into()),
                namespace: Some("bots".into()),
                ..ObjectMeta::default()
            },
            ..Toolbox::default()
        };
        run_teardown(&sink, &toolbox).await;
        assert_eq!(
            sink.events(),
            vec![(
                "tools".to_string(),
                Severity::Warning,
                "Deleting".to_string(),
                "Custom Resource tools is being deleted from the namespace bots".to_string()
            )]
        );
    }
}

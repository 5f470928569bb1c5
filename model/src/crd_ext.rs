use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Provides some conveniences for querying and editing a `kube-rs` object's metadata.
pub trait CrdExt {
    /// Returns this objects `ObjectMeta` information (i.e. the `metadata` field). You implement
    /// this by returning `&self.metadata`. This allows the rest of this trait's functions to be
    /// implemented for you.
    fn object_meta(&self) -> &ObjectMeta;

    /// Mutable access to the `metadata` field.
    fn object_meta_mut(&mut self) -> &mut ObjectMeta;

    /// Returns the object.metadata.name field, unwrapping a potential `None` with `""`. In
    /// practice, an object's name cannot be missing since this is how we `GET` an object in the
    /// first place, so we do away with the `Option` for convenience. This is named `object_name`
    /// to avoid confusion with `ResourceExt`.
    fn object_name(&self) -> &str {
        self.object_meta().name.as_deref().unwrap_or("")
    }

    /// Returns the object.metadata.namespace field, or `""` when missing.
    fn object_namespace(&self) -> &str {
        self.object_meta().namespace.as_deref().unwrap_or("")
    }

    /// Does the object have the given `finalizer`.
    fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizer_position(finalizer).is_some()
    }

    /// Does the object have the given `finalizer`, and in what position.
    fn finalizer_position(&self, finalizer: &str) -> Option<usize> {
        let mut finalizers = match &self.object_meta().finalizers {
            None => return None,
            Some(value) => value.iter(),
        };
        finalizers.position(|item| item == finalizer)
    }

    /// Add `finalizer` to the end of the finalizer list. Duplicate finalizers are problematic, so
    /// this returns `false` and leaves the list alone when it is already present.
    fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.object_meta_mut()
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_owned());
        true
    }

    /// Remove `finalizer`, returning `false` if it was not present.
    fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let position = match self.finalizer_position(finalizer) {
            None => return false,
            Some(position) => position,
        };
        if let Some(finalizers) = self.object_meta_mut().finalizers.as_mut() {
            finalizers.remove(position);
        }
        true
    }

    /// Has someone requested that the object be deleted.
    fn is_delete_requested(&self) -> bool {
        self.object_meta().deletion_timestamp.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Meta(ObjectMeta);

    impl CrdExt for Meta {
        fn object_meta(&self) -> &ObjectMeta {
            &self.0
        }

        fn object_meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.0
        }
    }

    #[test]
    fn finalizers_are_a_set() {
        let mut meta = Meta(ObjectMeta::default());
        assert!(!meta.has_finalizer("a"));
        assert!(meta.add_finalizer("a"));
        assert!(!meta.add_finalizer("a"));
        assert!(meta.add_finalizer("b"));
        assert_eq!(meta.finalizer_position("b"), Some(1));
        assert!(meta.remove_finalizer("a"));
        assert!(!meta.remove_finalizer("a"));
        assert_eq!(meta.0.finalizers, Some(vec!["b".to_string()]));
    }
}

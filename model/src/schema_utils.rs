use serde::{Deserialize, Deserializer};

/// Instead of making new struct model fields `Option`s, we can use this function when deserializing
/// to assign the default value. This makes the structs more ergonomic to use, and makes yaml/json
/// representations backward compatible.
pub(crate) fn null_to_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let opt = Option::deserialize(d)?;
    let val = opt.unwrap_or_default();
    Ok(val)
}

/// The kubebuilder default for `pullPolicy` on every kind.
pub(crate) fn default_pull_policy() -> String {
    crate::constants::PULL_ALWAYS.to_owned()
}

use snafu::Snafu;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Error serializing connections for '{}': {}", name, source))]
    ConnectionsSerialization {
        name: String,
        source: serde_yaml::Error,
    },
}

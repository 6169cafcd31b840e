use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("k8s error: {0}")]
    KubeError(#[source] kube::Error),
    #[error("{kind} cache is unavailable")]
    CacheUnavailable { kind: String },
    #[error("{owner} does not own {kind} {namespace}/{name}")]
    NotOwned {
        owner: String,
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("object missing .metadata.{0}")]
    MissingObjectKey(&'static str),
    #[error("json error: {0}")]
    SerdeJsonError(#[source] serde_json::Error),
    #[error("yaml error: {0}")]
    SerdeYamlError(#[source] serde_yaml::Error),
}

impl From<kube::Error> for Error {
    fn from(v: kube::Error) -> Self {
        Error::KubeError(v)
    }
}

impl From<serde_json::Error> for Error {
    fn from(v: serde_json::Error) -> Self {
        Error::SerdeJsonError(v)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(v: serde_yaml::Error) -> Self {
        Error::SerdeYamlError(v)
    }
}

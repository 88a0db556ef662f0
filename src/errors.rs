use thiserror::Error;

/// Errors surfaced by the HTTP transport layer (see `http` module).
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    #[error("request to {url} failed after retries: {raw_error_message}")]
    RequestFailed { url: String, raw_error_message: String },

    #[error("request to {url} returned status {status}: {raw_error_message}")]
    BadStatus {
        url: String,
        status: u16,
        raw_error_message: String,
    },

    #[error("failed to decode response body from {url}: {raw_error_message}")]
    DecodeError { url: String, raw_error_message: String },
}

/// Errors raised by a registry client implementation.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("login to registry failed: {raw_error_message}")]
    LoginFailed { raw_error_message: String },

    #[error("could not list repositories: {raw_error_message}")]
    ListRepositoriesFailed { raw_error_message: String },

    #[error("could not describe repository `{repository}`: {raw_error_message}")]
    DescribeRepositoryFailed {
        repository: String,
        raw_error_message: String,
    },

    #[error("could not delete image `{digest}` in repository `{repository}`: {raw_error_message}")]
    DeleteImageFailed {
        repository: String,
        digest: String,
        raw_error_message: String,
    },

    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Errors raised while probing Kubernetes clusters for workload image usage.
#[derive(Error, Debug, Clone)]
pub enum K8sProbeError {
    #[error("could not build client for cluster `{cluster}`: {raw_error_message}")]
    ClientBuildFailed { cluster: String, raw_error_message: String },

    #[error("could not list {kind} in cluster `{cluster}`: {raw_error_message}")]
    ListFailed {
        cluster: String,
        kind: String,
        raw_error_message: String,
    },
}

/// Errors raised while resolving or validating the run configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("no registry credentials were provided (set GCR or Dockerhub options)")]
    MissingRegistryIdentity,

    #[error("both GCR and Dockerhub credentials were provided; exactly one registry must be configured")]
    AmbiguousRegistryIdentity,

    #[error("could not parse duration `{raw_value}`: {raw_error_message}")]
    InvalidDuration { raw_value: String, raw_error_message: String },

    #[error("could not read config file `{path}`: {raw_error_message}")]
    ReadFailed { path: String, raw_error_message: String },

    #[error("could not parse config file `{path}`: {raw_error_message}")]
    ParseFailed { path: String, raw_error_message: String },
}

/// Errors raised while serializing or deserializing a plan file.
#[derive(Error, Debug, Clone)]
pub enum PlanError {
    #[error("could not write plan file `{path}`: {raw_error_message}")]
    WriteFailed { path: String, raw_error_message: String },

    #[error("could not read plan file `{path}`: {raw_error_message}")]
    ReadFailed { path: String, raw_error_message: String },

    #[error("could not serialize plan: {raw_error_message}")]
    SerializeFailed { raw_error_message: String },

    #[error("could not deserialize plan: {raw_error_message}")]
    DeserializeFailed { raw_error_message: String },
}

/// Top-level error type returned by the engine's fatal paths.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    K8sProbe(#[from] K8sProbeError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Http(#[from] HttpError),
}

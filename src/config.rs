use crate::cli::CommonArgs;
use crate::errors::ConfigError;
use crate::registry::{DockerHubClient, GcrClient, RegistryClient};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// The policy that drives the filter pipeline: what to keep, and why.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeepPolicy {
    #[serde(default, rename = "youngerThan")]
    pub younger_than: Option<String>,
    #[serde(default, rename = "atLeast")]
    pub at_least: usize,
    #[serde(default)]
    pub clusters: Vec<String>,
    #[serde(default)]
    pub tags: HashSet<String>,
    #[serde(default)]
    pub digests: HashSet<String>,
    #[serde(default)]
    pub repositories: HashSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct GcrConfig {
    #[serde(default)]
    host: String,
    #[serde(default)]
    token: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct DockerhubConfig {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct KeepUsedIn {
    #[serde(default, rename = "kubernetesClusters")]
    kubernetes_clusters: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct KeepImage {
    #[serde(default)]
    tags: HashSet<String>,
    #[serde(default)]
    digests: HashSet<String>,
    #[serde(default)]
    repositories: HashSet<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct KeepSection {
    #[serde(default, rename = "youngerThan")]
    younger_than: Option<String>,
    #[serde(default, rename = "atLeast")]
    at_least: usize,
    #[serde(default, rename = "usedIn")]
    used_in: KeepUsedIn,
    #[serde(default)]
    image: KeepImage,
}

/// On-disk config file schema: `{ GCR, Dockerhub, Keep }`. Whichever of
/// `GCR`/`Dockerhub` is non-empty selects the registry identity implicitly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(rename = "GCR", default)]
    gcr: GcrConfig,
    #[serde(rename = "Dockerhub", default)]
    dockerhub: DockerhubConfig,
    #[serde(rename = "Keep", default)]
    keep: KeepSection,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            raw_error_message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            raw_error_message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            raw_error_message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            raw_error_message: e.to_string(),
        })
    }
}

/// A fully resolved run: which registry to talk to, and what to keep.
pub struct ResolvedConfig {
    pub registry: RegistryClient,
    pub policy: KeepPolicy,
}

fn csv_set(csv: &Option<String>) -> HashSet<String> {
    csv.as_deref()
        .map(|s| s.split(',').filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn csv_vec(csv: &Option<String>) -> Vec<String> {
    csv.as_deref()
        .map(|s| s.split(',').filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Resolves the final policy and registry identity from, in order of
/// precedence, explicit CLI flags, environment variables (already merged
/// into `args` by clap's `env` attribute), the config file, and built-in
/// defaults. Resolution happens here and only here, per the single
/// resolution point design.
pub fn resolve(args: &CommonArgs) -> Result<ResolvedConfig, ConfigError> {
    let file = match &args.config {
        Some(path) => Some(ConfigFile::load(path)?),
        None => None,
    };

    let gcr_host = args
        .registry
        .clone()
        .or_else(|| file.as_ref().map(|f| f.gcr.host.clone()).filter(|s| !s.is_empty()));
    let gcr_token = args
        .password
        .clone()
        .or_else(|| file.as_ref().map(|f| f.gcr.token.clone()).filter(|s| !s.is_empty()));

    let dh_username = args
        .username
        .clone()
        .or_else(|| file.as_ref().map(|f| f.dockerhub.username.clone()).filter(|s| !s.is_empty()));
    let dh_password = args
        .password
        .clone()
        .or_else(|| file.as_ref().map(|f| f.dockerhub.password.clone()).filter(|s| !s.is_empty()));
    let dh_namespace = file.as_ref().map(|f| f.dockerhub.namespace.clone()).unwrap_or_default();

    let has_gcr = gcr_host.is_some();
    let has_dockerhub = dh_username.is_some() && !dh_namespace.is_empty();

    let registry = match (has_gcr, has_dockerhub) {
        (false, false) => return Err(ConfigError::MissingRegistryIdentity),
        (true, true) => return Err(ConfigError::AmbiguousRegistryIdentity),
        (true, false) => RegistryClient::Gcr(GcrClient::new(gcr_host.unwrap(), gcr_token.unwrap_or_default())),
        (false, true) => RegistryClient::DockerHub(DockerHubClient::new(
            dh_username.unwrap(),
            dh_password.unwrap_or_default(),
            dh_namespace,
        )),
    };

    let younger_than = args
        .keep_younger_than
        .clone()
        .or_else(|| file.as_ref().and_then(|f| f.keep.younger_than.clone()));
    if let Some(raw) = &younger_than {
        duration_str::parse(raw).map_err(|e| ConfigError::InvalidDuration {
            raw_value: raw.clone(),
            raw_error_message: e.to_string(),
        })?;
    }

    let at_least = args
        .keep_at_least
        .or_else(|| file.as_ref().map(|f| f.keep.at_least))
        .unwrap_or(0);

    let clusters = if !args.keep_used_in_k8s_csv().is_empty() {
        args.keep_used_in_k8s_csv()
    } else {
        file.as_ref()
            .map(|f| f.keep.used_in.kubernetes_clusters.clone())
            .unwrap_or_default()
    };

    let tags = if !csv_set(&args.keep_image_tags).is_empty() {
        csv_set(&args.keep_image_tags)
    } else {
        file.as_ref().map(|f| f.keep.image.tags.clone()).unwrap_or_default()
    };

    let digests = if !csv_set(&args.keep_image_digests).is_empty() {
        csv_set(&args.keep_image_digests)
    } else {
        file.as_ref().map(|f| f.keep.image.digests.clone()).unwrap_or_default()
    };

    let repositories = if !csv_set(&args.keep_image_repos).is_empty() {
        csv_set(&args.keep_image_repos)
    } else {
        file.as_ref().map(|f| f.keep.image.repositories.clone()).unwrap_or_default()
    };

    Ok(ResolvedConfig {
        registry,
        policy: KeepPolicy {
            younger_than,
            at_least,
            clusters,
            tags,
            digests,
            repositories,
        },
    })
}

impl CommonArgs {
    fn keep_used_in_k8s_csv(&self) -> Vec<String> {
        csv_vec(&self.keep_used_in_k8s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_file() -> ConfigFile {
        ConfigFile {
            gcr: GcrConfig::default(),
            dockerhub: DockerhubConfig {
                username: "file-user".into(),
                password: "file-pass".into(),
                namespace: "file-ns".into(),
            },
            keep: KeepSection {
                used_in: KeepUsedIn {
                    kubernetes_clusters: vec!["k3".into(), "k4".into()],
                },
                ..Default::default()
            },
        }
    }

    #[test]
    fn cli_flag_wins_over_env_and_file() {
        let tmp = NamedTempFile::new().unwrap();
        sample_file().save(tmp.path()).unwrap();

        std::env::set_var("REGISTRY_JANITOR_KEEP_USED_IN_K8S", "k3,k4");

        let args = CommonArgs {
            config: Some(tmp.path().to_path_buf()),
            registry: None,
            username: None,
            password: None,
            keep_younger_than: None,
            keep_at_least: None,
            keep_used_in_k8s: Some("k1,k2".to_string()),
            keep_image_tags: None,
            keep_image_digests: None,
            keep_image_repos: None,
        };

        let resolved = resolve(&args).unwrap();
        assert_eq!(resolved.policy.clusters, vec!["k1".to_string(), "k2".to_string()]);
    }
}

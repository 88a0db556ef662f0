use crate::errors::RegistryError;
use crate::http::{AuthInjector, FailureMode, HttpClient};
use crate::inventory::{Image, Repository};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::InteractWithRegistry;

struct BasicAuth {
    token: String,
}

impl AuthInjector for BasicAuth {
    fn inject(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth("_token", Some(&self.token))
    }
}

/// Google Container Registry client speaking the Docker Registry HTTP API
/// v2 directly (`/v2/_catalog`, `/v2/{repo}/tags/list`,
/// `/v2/{repo}/manifests/{ref}`). Authenticates every request with HTTP
/// basic auth using the literal username `_token`, so `login` is a no-op.
pub struct GcrClient {
    http: HttpClient,
}

impl GcrClient {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = format!("https://{}/v2", host.into());
        let http = HttpClient::new(base_url, Arc::new(BasicAuth { token: token.into() }));
        GcrClient { http }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    repositories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TagsListResponse {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    manifest: HashMap<String, GcrManifest>,
}

#[derive(Debug, Deserialize)]
struct GcrManifest {
    #[serde(default, rename = "tag")]
    tags: Vec<String>,
    #[serde(default, rename = "imageSizeBytes")]
    image_size_bytes: String,
    #[serde(default)]
    created: String,
    #[serde(rename = "timeUploadedMs")]
    time_uploaded_ms: String,
    #[serde(default, rename = "mediaType")]
    media_type: String,
}

#[async_trait]
impl InteractWithRegistry for GcrClient {
    async fn login(&mut self) -> Result<(), RegistryError> {
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        let mut repos = Vec::new();
        let mut next: Option<String> = Some("/_catalog?n=100".to_string());

        while let Some(path) = next {
            let (bytes, link) = self.http.get_with_link(&path, FailureMode::Fatal, false).await?;
            let parsed: CatalogResponse = serde_json::from_slice(&bytes).map_err(|e| {
                RegistryError::ListRepositoriesFailed {
                    raw_error_message: e.to_string(),
                }
            })?;
            repos.extend(parsed.repositories);
            next = link;
        }

        Ok(repos)
    }

    async fn describe_repository(&self, path: &str) -> Result<Repository, RegistryError> {
        let url = format!("/{path}/tags/list");
        let bytes = self.http.get(&url, FailureMode::Fatal, false).await?;
        let parsed: TagsListResponse =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::DescribeRepositoryFailed {
                repository: path.to_string(),
                raw_error_message: e.to_string(),
            })?;

        let mut repository = Repository::new(path);
        for (digest, manifest) in parsed.manifest {
            let mut image = Image::new(digest, manifest.time_uploaded_ms);
            image.created_ms = manifest.created;
            image.media_type = manifest.media_type;
            image.size_bytes = manifest.image_size_bytes.parse().unwrap_or(0);
            for tag in manifest.tags {
                image.tags.insert(tag);
            }
            repository.images.push(image);
        }
        let _ = parsed.tags;

        Ok(repository)
    }

    async fn delete_image(&self, repository: &str, tags: &[String], digest: &str) -> Result<(), RegistryError> {
        for tag in tags {
            let url = format!("/{repository}/manifests/{tag}");
            self.http
                .delete(&url, FailureMode::Soft, true)
                .await
                .map_err(|e| RegistryError::DeleteImageFailed {
                    repository: repository.to_string(),
                    digest: digest.to_string(),
                    raw_error_message: e.to_string(),
                })?;
        }

        let url = format!("/{repository}/manifests/{digest}");
        self.http
            .delete(&url, FailureMode::Soft, true)
            .await
            .map_err(|e| RegistryError::DeleteImageFailed {
                repository: repository.to_string(),
                digest: digest.to_string(),
                raw_error_message: e.to_string(),
            })?;

        Ok(())
    }
}

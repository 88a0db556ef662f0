use crate::errors::RegistryError;
use crate::http::{AuthInjector, FailureMode, HttpClient};
use crate::inventory::{Image, Repository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::{Arc, RwLock};

use super::InteractWithRegistry;

const BASE_URL: &str = "https://hub.docker.com/v2";

struct BearerToken {
    token: RwLock<Option<String>>,
}

impl AuthInjector for BearerToken {
    fn inject(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().expect("token lock poisoned").as_ref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Docker Hub v2 client. Unlike GCR, authentication is a real login step
/// that exchanges a username/password for a bearer token, which is then
/// injected into every subsequent request.
pub struct DockerHubClient {
    username: String,
    password: String,
    namespace: String,
    http: HttpClient,
    token: Arc<BearerToken>,
}

impl DockerHubClient {
    pub fn new(username: impl Into<String>, password: impl Into<String>, namespace: impl Into<String>) -> Self {
        let token = Arc::new(BearerToken { token: RwLock::new(None) });
        let http = HttpClient::new(BASE_URL, token.clone());
        DockerHubClient {
            username: username.into(),
            password: password.into(),
            namespace: namespace.into(),
            http,
            token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ReposPage {
    next: Option<String>,
    results: Vec<ReposPageEntry>,
}

#[derive(Debug, Deserialize)]
struct ReposPageEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsPage {
    next: Option<String>,
    results: Vec<TagsPageEntry>,
}

#[derive(Debug, Deserialize)]
struct TagsPageEntry {
    name: String,
    #[serde(default)]
    full_size: u64,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    images: Vec<TagsPageImage>,
}

#[derive(Debug, Deserialize)]
struct TagsPageImage {
    digest: Option<String>,
    size: Option<u64>,
}

/// Parses Docker Hub's `last_updated` timestamp (RFC3339 with fractional
/// seconds, e.g. `2006-01-02T15:04:05.999999Z`) into milliseconds since the
/// epoch, matching the GCR path's `timeUploadedMs` and the data model's
/// "uploaded-timestamp (ms since epoch as string)" contract. Falls back to
/// the current time when the field is absent or fails to parse, per spec.
fn parse_uploaded_ms(last_updated: &Option<String>) -> String {
    last_updated
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
        .timestamp_millis()
        .to_string()
}

#[async_trait]
impl InteractWithRegistry for DockerHubClient {
    async fn login(&mut self) -> Result<(), RegistryError> {
        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });
        let bytes = self
            .http
            .post_json("/users/login", &body, FailureMode::Fatal, false)
            .await?;
        let parsed: LoginResponse = serde_json::from_slice(&bytes).map_err(|e| RegistryError::LoginFailed {
            raw_error_message: e.to_string(),
        })?;
        *self.token.token.write().expect("token lock poisoned") = Some(parsed.token);
        Ok(())
    }

    async fn list_repositories(&self) -> Result<Vec<String>, RegistryError> {
        let mut repos = Vec::new();
        let mut next: Option<String> = Some(format!("/repositories/{}?page_size=100", self.namespace));

        while let Some(path) = next {
            let bytes = self.http.get(&path, FailureMode::Fatal, false).await?;
            let page: ReposPage = serde_json::from_slice(&bytes).map_err(|e| RegistryError::ListRepositoriesFailed {
                raw_error_message: e.to_string(),
            })?;
            repos.extend(page.results.into_iter().map(|r| format!("{}/{}", self.namespace, r.name)));
            next = page.next;
        }

        Ok(repos)
    }

    async fn describe_repository(&self, path: &str) -> Result<Repository, RegistryError> {
        let mut repository = Repository::new(path);
        let mut next: Option<String> = Some(format!("/repositories/{path}/tags?page_size=100"));

        while let Some(url) = next {
            let bytes = self.http.get(&url, FailureMode::Fatal, false).await?;
            let page: TagsPage =
                serde_json::from_slice(&bytes).map_err(|e| RegistryError::DescribeRepositoryFailed {
                    repository: path.to_string(),
                    raw_error_message: e.to_string(),
                })?;

            for entry in page.results {
                let digests: Vec<String> = entry
                    .images
                    .iter()
                    .filter_map(|i| i.digest.clone())
                    .chain(entry.digest.clone())
                    .collect();
                let size = entry
                    .images
                    .iter()
                    .filter_map(|i| i.size)
                    .max()
                    .unwrap_or(entry.full_size);
                let uploaded = parse_uploaded_ms(&entry.last_updated);

                for digest in if digests.is_empty() { vec![String::new()] } else { digests } {
                    if let Some(image) = repository.images.iter_mut().find(|i| i.digest == digest) {
                        image.tags.insert(entry.name.clone());
                    } else {
                        let mut image = Image::new(digest, uploaded.clone());
                        image.size_bytes = size;
                        image.tags.insert(entry.name.clone());
                        repository.images.push(image);
                    }
                }
            }

            next = page.next;
        }

        Ok(repository)
    }

    async fn delete_image(&self, repository: &str, tags: &[String], _digest: &str) -> Result<(), RegistryError> {
        // Docker Hub's tag-delete endpoint already detaches the manifest
        // reference; there is no separate digest-delete call in its public
        // v2 API, unlike GCR's `/manifests/{digest}`.
        for tag in tags {
            let url = format!("/repositories/{repository}/tags/{tag}/");
            self.http
                .delete(&url, FailureMode::Soft, true)
                .await
                .map_err(|e| RegistryError::DeleteImageFailed {
                    repository: repository.to_string(),
                    digest: tag.clone(),
                    raw_error_message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

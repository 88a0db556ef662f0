use crate::errors::HttpError;
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 4;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// What to do once every retry attempt has been exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Propagate the last error to the caller.
    Soft,
    /// Abort the whole process: a partial crawl cannot be trusted.
    Fatal,
}

/// Hook invoked before every outgoing request so the caller can inject
/// authentication headers. Implementations may rotate a bearer token after
/// a prior `login` call (see `registry::dockerhub`).
pub trait AuthInjector: Send + Sync {
    fn inject(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder;
}

/// No-op injector for registries that authenticate per-request with static
/// credentials baked into the client (e.g. GCR basic auth).
pub struct NoAuth;

impl AuthInjector for NoAuth {
    fn inject(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
    }
}

/// Retrying JSON HTTP client shared (cheaply cloneable) across crawl and
/// delete workers. Wraps GET/POST/DELETE with a fixed 1-second backoff, up
/// to 3 retries, and a fatal/soft failure mode per call site.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth: Arc<dyn AuthInjector>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn AuthInjector>) -> Self {
        HttpClient {
            client: Client::new(),
            base_url: base_url.into(),
            auth,
        }
    }

    fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        }
    }

    pub async fn get(&self, path_or_url: &str, mode: FailureMode, silent: bool) -> Result<bytes::Bytes, HttpError> {
        self.execute(Method::GET, path_or_url, None, mode, silent).await.map(|(b, _)| b)
    }

    /// Like `get`, but also returns the response's `Link` header value (used
    /// by GCR's `_catalog` pagination, which points at the next page as a
    /// relative path rather than embedding it in the JSON body).
    pub async fn get_with_link(
        &self,
        path_or_url: &str,
        mode: FailureMode,
        silent: bool,
    ) -> Result<(bytes::Bytes, Option<String>), HttpError> {
        let (body, headers) = self.execute(Method::GET, path_or_url, None, mode, silent).await?;
        let link = headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(parse_link_header);
        Ok((body, link))
    }

    pub async fn post_json(
        &self,
        path_or_url: &str,
        body: &serde_json::Value,
        mode: FailureMode,
        silent: bool,
    ) -> Result<bytes::Bytes, HttpError> {
        self.execute(Method::POST, path_or_url, Some(body.clone()), mode, silent)
            .await
            .map(|(b, _)| b)
    }

    pub async fn delete(&self, path_or_url: &str, mode: FailureMode, silent: bool) -> Result<bytes::Bytes, HttpError> {
        self.execute(Method::DELETE, path_or_url, None, mode, silent).await.map(|(b, _)| b)
    }

    async fn execute(
        &self,
        method: Method,
        path_or_url: &str,
        json_body: Option<serde_json::Value>,
        mode: FailureMode,
        silent: bool,
    ) -> Result<(bytes::Bytes, reqwest::header::HeaderMap), HttpError> {
        let url = self.resolve(path_or_url);
        let mut last_err: Option<HttpError> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut builder = self.client.request(method.clone(), &url);
            builder = self.auth.inject(builder);
            if let Some(body) = &json_body {
                builder = builder.json(body);
            }

            let outcome = builder.send().await;
            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let headers = response.headers().clone();
                        let body = response.bytes().await.map_err(|e| HttpError::DecodeError {
                            url: url.clone(),
                            raw_error_message: e.to_string(),
                        })?;
                        return Ok((body, headers));
                    }
                    let raw_error_message = response.text().await.unwrap_or_default();
                    last_err = Some(HttpError::BadStatus {
                        url: url.clone(),
                        status: status.as_u16(),
                        raw_error_message,
                    });
                }
                Err(e) => {
                    last_err = Some(HttpError::RequestFailed {
                        url: url.clone(),
                        raw_error_message: e.to_string(),
                    });
                }
            }

            if attempt < MAX_ATTEMPTS {
                if !silent {
                    tracing::warn!(url = %url, attempt, "request failed, retrying in 1s");
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        let err = last_err.expect("at least one attempt always runs");
        match mode {
            FailureMode::Fatal => {
                tracing::error!(url = %url, error = %err, "fatal request failure, aborting run");
                std::process::exit(1);
            }
            FailureMode::Soft => Err(err),
        }
    }
}

/// Extracts the URL from a single-entry RFC 5988 `Link` header, e.g.
/// `</v2/_catalog?last=foo&n=100>; rel="next"`.
fn parse_link_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('<')
        .split('>')
        .next()
        .unwrap_or(raw)
        .to_string()
}

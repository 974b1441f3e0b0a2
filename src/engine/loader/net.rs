//! HTTP transport for the resource loader.
//!
//! Site assets are usually referenced by site-relative path
//! (`/assets/images/backgrounds/hero-1.jpg`). Those are resolved against the
//! page's `asset_base_url`; absolute URLs are used as-is.

use super::{ResourceFetcher, ResourceId};
use crate::engine::config::{ConfigError, PageConfig};
use crate::engine::errors::ResourceFetchFailure;
use futures::future::BoxFuture;
use futures::FutureExt;
use ::http::HeaderMap;
use url::Url;

/// Fully buffered HTTP response.
#[derive(Debug)]
pub struct Response {
    /// Final URL of the response (after redirects, if any).
    pub url: Url,
    /// Numeric HTTP status code (e.g., `200`, `404`).
    pub status: u16,
    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

// Loads an URL and returns the response. Non-2xx statuses are returned, not raised.
pub async fn fetch(client: &reqwest::Client, url: Url) -> anyhow::Result<Response> {
    let res = client.get(url).send().await?;

    let final_url = res.url().clone();
    let status = res.status().as_u16();
    let headers = res.headers().clone();

    // We don't do streaming
    let body = res.bytes().await?.to_vec();

    Ok(Response {
        url: final_url,
        status,
        headers,
        body,
    })
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Option<Url>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpFetcher {
    pub fn new(base: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
        }
    }

    pub fn from_config(config: &PageConfig) -> Result<Self, ConfigError> {
        let base = match &config.asset_base_url {
            Some(raw) => Some(Url::parse(raw).map_err(|_| ConfigError::InvalidBaseUrl(raw.clone()))?),
            None => None,
        };
        Ok(Self::new(base))
    }

    /// Absolute URL for `id`.
    pub fn resolve(&self, id: &ResourceId) -> Result<Url, ResourceFetchFailure> {
        if let Ok(url) = Url::parse(id.as_str()) {
            return Ok(url);
        }

        match &self.base {
            Some(base) => base
                .join(id.as_str())
                .map_err(|_| ResourceFetchFailure::Unresolvable(id.to_string())),
            None => Err(ResourceFetchFailure::Unresolvable(id.to_string())),
        }
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, id: &ResourceId) -> BoxFuture<'static, Result<Vec<u8>, ResourceFetchFailure>> {
        let resolved = self.resolve(id);
        let client = self.client.clone();

        async move {
            let url = resolved?;
            let response = fetch(&client, url.clone())
                .await
                .map_err(|e| ResourceFetchFailure::Network(format!("{e:#}")))?;

            if !(200..300).contains(&response.status) {
                return Err(ResourceFetchFailure::Status {
                    url: response.url.to_string(),
                    status: response.status,
                });
            }

            log::debug!(
                "fetched {} ({} bytes, {})",
                response.url,
                response.body.len(),
                response
                    .headers
                    .get(::http::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown type")
            );
            Ok(response.body)
        }
        .boxed()
    }
}

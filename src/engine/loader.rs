//! Concurrent, failure-tolerant resource loading.
//!
//! A [`ResourceLoader`] fetches every requested resource at once through a
//! [`ResourceFetcher`] and folds the outcomes into a [`LoadSet`]. The returned
//! future always resolves to a settled set; individual failures are recorded,
//! never raised. Deciding what a partial failure means is up to the caller.
//!
//! # Fetchers
//!
//! - [`HttpFetcher`]: `reqwest` based, resolves relative paths against a base URL.
//! - [`InMemoryFetcher`]: fixed payloads and failures, with optional latency.

use crate::engine::errors::ResourceFetchFailure;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::sync::Arc;

pub mod net;
pub mod in_memory;
pub mod load_set;

pub use net::HttpFetcher;
pub use in_memory::InMemoryFetcher;
pub use load_set::LoadSet;

/// Opaque resource identifier (URI or site-relative path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for absolute http(s) locations.
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Decoded body of a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Payload {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(v) => Some(v),
            Payload::Bytes(_) => None,
        }
    }
}

/// How fetched bytes are turned into a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decode {
    /// Keep the bytes as-is (images and other binary assets).
    #[default]
    Raw,
    /// Parse the body as JSON (vector animation documents).
    Json,
}

impl Decode {
    pub fn apply(self, body: Vec<u8>) -> Result<Payload, ResourceFetchFailure> {
        match self {
            Decode::Raw => Ok(Payload::Bytes(body)),
            Decode::Json => serde_json::from_slice(&body)
                .map(Payload::Json)
                .map_err(|e| ResourceFetchFailure::Decode(e.to_string())),
        }
    }
}

/// Transport collaborator. Implementations must not block; all work happens in the returned future.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, id: &ResourceId) -> BoxFuture<'static, Result<Vec<u8>, ResourceFetchFailure>>;
}

#[derive(Clone)]
pub struct ResourceLoader {
    fetcher: Arc<dyn ResourceFetcher>,
    decode: Decode,
}

impl Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader").field("decode", &self.decode).finish_non_exhaustive()
    }
}

impl ResourceLoader {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, decode: Decode) -> Self {
        Self { fetcher, decode }
    }

    /// Fetch and decode all `ids` concurrently. Resolves to a settled [`LoadSet`]; never fails.
    pub fn load(&self, ids: impl IntoIterator<Item = ResourceId>) -> BoxFuture<'static, LoadSet> {
        let mut set = LoadSet::new(ids);
        let decode = self.decode;

        let requests: Vec<_> = set
            .requested()
            .iter()
            .cloned()
            .map(|id| {
                let fetch = self.fetcher.fetch(&id);
                async move {
                    let outcome = fetch.await.and_then(|body| decode.apply(body));
                    (id, outcome)
                }
            })
            .collect();

        async move {
            for (id, outcome) in join_all(requests).await {
                match outcome {
                    Ok(payload) => {
                        log::debug!("resource loaded: {id}");
                        set.record_success(id, payload);
                    }
                    Err(e) => {
                        log::warn!("resource failed: {id}: {e}");
                        set.record_failure(id, e);
                    }
                }
            }
            set
        }
        .boxed()
    }
}

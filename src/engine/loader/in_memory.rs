use super::{ResourceFetcher, ResourceId};
use crate::engine::errors::ResourceFetchFailure;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    outcome: Result<Vec<u8>, ResourceFetchFailure>,
    latency: Duration,
}

/// In‑memory fetcher (no network). Used for offline hosts and tests.
///
/// Unknown ids fail with [`ResourceFetchFailure::NotFound`].
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    entries: Mutex<HashMap<ResourceId, Entry>>,
    fetches: AtomicUsize,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, id: impl Into<ResourceId>, body: Vec<u8>) -> Self {
        self.with_latency(id, body, Duration::ZERO)
    }

    pub fn with_latency(self, id: impl Into<ResourceId>, body: Vec<u8>, latency: Duration) -> Self {
        self.insert(id.into(), Ok(body), latency);
        self
    }

    pub fn with_failure(self, id: impl Into<ResourceId>, failure: ResourceFetchFailure) -> Self {
        self.with_failure_latency(id, failure, Duration::ZERO)
    }

    pub fn with_failure_latency(
        self,
        id: impl Into<ResourceId>,
        failure: ResourceFetchFailure,
        latency: Duration,
    ) -> Self {
        self.insert(id.into(), Err(failure), latency);
        self
    }

    pub fn insert(&self, id: ResourceId, outcome: Result<Vec<u8>, ResourceFetchFailure>, latency: Duration) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Entry { outcome, latency });
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ResourceFetcher for InMemoryFetcher {
    fn fetch(&self, id: &ResourceId) -> BoxFuture<'static, Result<Vec<u8>, ResourceFetchFailure>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let entry = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .unwrap_or_else(|| Entry {
                outcome: Err(ResourceFetchFailure::NotFound(id.to_string())),
                latency: Duration::ZERO,
            });

        async move {
            if !entry.latency.is_zero() {
                tokio::time::sleep(entry.latency).await;
            }
            entry.outcome
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_outcomes() {
        let fetcher = InMemoryFetcher::new()
            .with("a", vec![1, 2, 3])
            .with_failure("b", ResourceFetchFailure::Network("offline".into()));

        assert_eq!(fetcher.fetch(&"a".into()).await, Ok(vec![1, 2, 3]));
        assert_eq!(
            fetcher.fetch(&"b".into()).await,
            Err(ResourceFetchFailure::Network("offline".into()))
        );
        assert!(matches!(fetcher.fetch(&"c".into()).await, Err(ResourceFetchFailure::NotFound(_))));
        assert_eq!(fetcher.fetch_count(), 3);
    }

    #[test]
    fn zero_latency_fetches_need_no_runtime() {
        let fetcher = InMemoryFetcher::new().with("a", vec![7]);
        assert_eq!(futures::executor::block_on(fetcher.fetch(&"a".into())), Ok(vec![7]));
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied() {
        let fetcher = InMemoryFetcher::new().with_latency("slow", vec![], Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        fetcher.fetch(&"slow".into()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}

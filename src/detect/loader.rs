//! Memoized detector loading
//!
//! Model assets are loaded at most once per backend kind per process
//! lifetime. The cache coordinates concurrent first loads through
//! `tokio::sync::OnceCell`: one caller runs the load, others wait on the
//! same cell. A failed load leaves the cell empty, so the next request
//! retries instead of observing a permanently cached failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::DetectorLoadError;

use super::backend::{BackendKind, Detector};

/// Port for constructing detector backends
///
/// Implementations own the model asset locations (configuration values) and
/// perform the actual load, which may fetch or parse assets and therefore
/// suspends.
#[async_trait]
pub trait DetectorProvider: Send + Sync {
    /// Load a backend of the given kind
    async fn load(&self, kind: BackendKind) -> Result<Arc<dyn Detector>, DetectorLoadError>;
}

type DetectorCell = Arc<OnceCell<Arc<dyn Detector>>>;

/// Process-wide cache of loaded detector backends
///
/// The only cross-camera shared resource in the pipeline: read-mostly after
/// first load, with load coordination per backend kind.
pub struct DetectorCache {
    provider: Arc<dyn DetectorProvider>,
    cells: Mutex<HashMap<BackendKind, DetectorCell>>,
}

impl DetectorCache {
    /// Create a cache backed by the given provider
    pub fn new(provider: Arc<dyn DetectorProvider>) -> Self {
        Self {
            provider,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Get the loaded backend for a kind, loading it on first use
    pub async fn acquire(&self, kind: BackendKind) -> Result<Arc<dyn Detector>, DetectorLoadError> {
        let cell = {
            let mut cells = self.cells.lock().expect("detector cache lock poisoned");
            Arc::clone(cells.entry(kind).or_default())
        };

        if cell.get().is_none() {
            tracing::debug!(backend = %kind, "Detector backend not yet loaded");
        }

        let detector = cell
            .get_or_try_init(|| async {
                tracing::info!(backend = %kind, "Loading detector backend");
                let detector = self.provider.load(kind).await.map_err(|e| {
                    tracing::warn!(backend = %kind, error = %e, "Detector backend load failed");
                    e
                })?;
                tracing::info!(backend = %kind, "Detector backend ready");
                Ok::<_, DetectorLoadError>(detector)
            })
            .await?;

        Ok(Arc::clone(detector))
    }

    /// Whether a backend kind has finished loading
    pub fn is_ready(&self, kind: BackendKind) -> bool {
        let cells = self.cells.lock().expect("detector cache lock poisoned");
        cells
            .get(&kind)
            .map(|cell| cell.get().is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::stub::StubProvider;

    #[tokio::test]
    async fn test_load_is_memoized() {
        let provider = Arc::new(StubProvider::new());
        let cache = DetectorCache::new(provider.clone());

        let a = cache.acquire(BackendKind::Object).await.unwrap();
        let b = cache.acquire(BackendKind::Object).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.load_count(BackendKind::Object), 1);
    }

    #[tokio::test]
    async fn test_kinds_load_independently() {
        let provider = Arc::new(StubProvider::new());
        let cache = DetectorCache::new(provider.clone());

        cache.acquire(BackendKind::Object).await.unwrap();
        assert!(cache.is_ready(BackendKind::Object));
        assert!(!cache.is_ready(BackendKind::FaceLandmark));

        cache.acquire(BackendKind::FaceLandmark).await.unwrap();
        assert_eq!(provider.load_count(BackendKind::FaceLandmark), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_load_is_single_flight() {
        let provider = Arc::new(StubProvider::new());
        let cache = Arc::new(DetectorCache::new(provider.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.acquire(BackendKind::Object).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(provider.load_count(BackendKind::Object), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_not_cached() {
        let provider = Arc::new(StubProvider::new().fail_first_loads(1));
        let cache = DetectorCache::new(provider.clone());

        let err = cache.acquire(BackendKind::Object).await.unwrap_err();
        assert!(matches!(err, DetectorLoadError::AssetUnavailable(_)));
        assert!(!cache.is_ready(BackendKind::Object));

        // Next fresh request retries and succeeds
        cache.acquire(BackendKind::Object).await.unwrap();
        assert!(cache.is_ready(BackendKind::Object));
        assert_eq!(provider.load_count(BackendKind::Object), 2);
    }
}

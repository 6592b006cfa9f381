//! Cached fetch: data/loading/error state for one request source.
//!
//! A [`CachedFetch`] is seeded from the shared [`ResponseCache`] when it is
//! created, performs its initial fetch on [`CachedFetch::mount`] (unless
//! disabled), and allows at most one request in flight per instance: a
//! [`CachedFetch::refetch`] issued while loading is dropped.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use ytmp3_core::{AppError, AppResult};

use crate::cache::{CacheKey, ResponseCache};
use crate::report::log_error;

pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, AppResult<T>> + Send + Sync>;

/// Wrap an async closure as a [`Fetcher`].
pub fn fetcher<T, F, Fut>(f: F) -> Fetcher<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<T>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as BoxFuture<'static, AppResult<T>>)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Fetch automatically on mount and on key change
    pub enabled: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observable state of a [`CachedFetch`].
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<AppError>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchOutcome {
    Fetched,
    Failed,
    /// Another request was already in flight; nothing was sent
    Skipped,
    /// The key changed during the request and the instance is disabled, so
    /// the response only went to the old key's cache entry
    Superseded,
}

struct Source<T> {
    key: CacheKey,
    fetcher: Fetcher<T>,
}

struct Inner<T> {
    source: RwLock<Source<T>>,
    generation: AtomicU64,
    cache: ResponseCache,
    options: FetchOptions,
    in_flight: AtomicBool,
    state: watch::Sender<FetchState<T>>,
}

/// Cloneable handle; clones share state and the in-flight flag.
pub struct CachedFetch<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CachedFetch<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for CachedFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFetch")
            .field("key", &self.key())
            .field("in_flight", &self.inner.in_flight.load(Ordering::Acquire))
            .finish()
    }
}

/// Clears the in-flight flag even if the refetch future is dropped mid-request.
struct InFlightGuard<'a, T> {
    inner: &'a Inner<T>,
    completed: bool,
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let in_flight = &self.inner.in_flight;
        self.inner.state.send_if_modified(|state| {
            in_flight.store(false, Ordering::Release);
            let was_loading = state.is_loading;
            state.is_loading = false;
            was_loading
        });
    }
}

impl<T> CachedFetch<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create an instance; `data` is seeded synchronously from `cache`.
    pub fn new(
        key: CacheKey,
        fetcher: Fetcher<T>,
        cache: ResponseCache,
        options: FetchOptions,
    ) -> Self {
        let seeded = FetchState {
            data: cache.get(&key),
            ..FetchState::default()
        };
        let (state, _) = watch::channel(seeded);

        Self {
            inner: Arc::new(Inner {
                source: RwLock::new(Source { key, fetcher }),
                generation: AtomicU64::new(0),
                cache,
                options,
                in_flight: AtomicBool::new(false),
                state,
            }),
        }
    }

    /// Initial automatic fetch. Does nothing when the instance is disabled.
    pub async fn mount(&self) -> Option<RefetchOutcome> {
        if !self.inner.options.enabled {
            return None;
        }
        Some(self.refetch().await)
    }

    /// Point the instance at a new request source.
    ///
    /// State is re-seeded from the cache entry of the new key; when enabled,
    /// the new source is fetched. A request still in flight for the old key
    /// completes into the cache under the old key only.
    pub async fn set_key(&self, key: CacheKey, fetcher: Fetcher<T>) -> Option<RefetchOutcome> {
        let seeded: Option<T> = self.inner.cache.get(&key);
        {
            let mut source = self.inner.source.write().unwrap_or_else(|e| e.into_inner());
            if source.key == key {
                return None;
            }
            source.key = key;
            source.fetcher = fetcher;
            self.inner.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.inner.state.send_modify(|state| {
            state.data = seeded;
            state.error = None;
        });
        self.mount().await
    }

    /// Fetch now, unless a request is already in flight for this instance.
    pub async fn refetch(&self) -> RefetchOutcome {
        if self.inner.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(key = %self.key(), "Fetch already in flight, ignoring refetch");
            return RefetchOutcome::Skipped;
        }
        let mut guard = InFlightGuard {
            inner: &*self.inner,
            completed: false,
        };
        self.inner.state.send_modify(|state| state.is_loading = true);

        loop {
            let (generation, key, fetcher) = self.current_source();
            let result = fetcher().await;

            if self.inner.generation.load(Ordering::Acquire) != generation {
                // Key changed while waiting; keep the response for its own key.
                if let Ok(value) = &result {
                    self.write_cache(&key, value);
                }
                if self.inner.options.enabled {
                    continue;
                }
                guard.completed = true;
                self.settle(|_| {});
                return RefetchOutcome::Superseded;
            }

            guard.completed = true;
            return self.apply(&key, result);
        }
    }

    /// Publish the final state of a request and release the in-flight flag.
    ///
    /// The flag is cleared under the state lock, so a subscriber that sees
    /// `is_loading == false` can always start a new request.
    fn settle(&self, update: impl FnOnce(&mut FetchState<T>)) {
        let in_flight = &self.inner.in_flight;
        self.inner.state.send_modify(|state| {
            update(state);
            state.is_loading = false;
            in_flight.store(false, Ordering::Release);
        });
    }

    fn current_source(&self) -> (u64, CacheKey, Fetcher<T>) {
        let source = self.inner.source.read().unwrap_or_else(|e| e.into_inner());
        (
            self.inner.generation.load(Ordering::Acquire),
            source.key.clone(),
            Arc::clone(&source.fetcher),
        )
    }

    fn write_cache(&self, key: &CacheKey, value: &T) {
        if let Err(e) = self.inner.cache.set(key, value) {
            tracing::warn!(key = %key, error = %e, "Failed to write response to cache");
        }
    }

    fn apply(&self, key: &CacheKey, result: AppResult<T>) -> RefetchOutcome {
        match result {
            Ok(value) => {
                self.write_cache(key, &value);
                self.settle(|state| {
                    state.data = Some(value);
                    state.error = None;
                });
                RefetchOutcome::Fetched
            }
            Err(err) => {
                log_error(&err, &format!("Fetch of {} failed", key));
                self.settle(|state| {
                    state.data = None;
                    state.error = Some(err);
                });
                RefetchOutcome::Failed
            }
        }
    }
}

impl<T> CachedFetch<T> {
    pub fn key(&self) -> CacheKey {
        self.inner
            .source
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .key
            .clone()
    }
}

impl<T: Clone> CachedFetch<T> {
    pub fn snapshot(&self) -> FetchState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<AppError> {
        self.inner.state.borrow().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.inner.state.subscribe()
    }
}

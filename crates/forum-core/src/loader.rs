//! Request-scoped batched entity loader.
//!
//! A [`BatchLoader`] turns many single-key lookups into one batched store
//! query. It lives exactly as long as one request and is never shared
//! between requests.
//!
//! # Batch windows
//!
//! [`BatchLoader::load`] registers its key synchronously, at call time, and
//! returns a future. The first of those futures to be polled flushes every
//! key registered so far through a single [`BatchFetch::fetch`] call and
//! fans the rows back out by key. Building all field futures for a page
//! before awaiting any of them (`join_all`, `tokio::join!`) therefore
//! coalesces the whole page into one round trip. Keys registered after a
//! flush form the next window. [`BatchLoader::dispatch`] flushes explicitly.
//!
//! # Cache
//!
//! Every key resolves at most once per loader. A later `load` of the same
//! key, in the same window or a later one, shares the first request's
//! result without touching the store. A failed window is evicted so a later
//! `load` retries it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::watch;

use forum_types::{UserId, VoteKey};

use crate::error::{LoadError, StoreError};

/// A key a loader can cache under.
pub trait LoaderKey: Clone + Send + Sync + 'static {
    /// Canonical string form used as the cache index. Composite keys must
    /// serialize every component.
    fn canonical(&self) -> String;
}

impl LoaderKey for UserId {
    fn canonical(&self) -> String {
        self.to_string()
    }
}

impl LoaderKey for VoteKey {
    /// `userId|postId`
    fn canonical(&self) -> String {
        self.to_string()
    }
}

/// The batched query behind a [`BatchLoader`].
pub trait BatchFetch: Send + Sync {
    /// Lookup key type.
    type Key: LoaderKey;
    /// Row type returned by the store.
    type Value: Clone + Send + Sync + 'static;

    /// Loader name used in log fields.
    const NAME: &'static str;

    /// Fetch every row matching `keys` in one store call. Rows may come
    /// back in any order; missing keys are simply absent.
    fn fetch(
        &self,
        keys: &[Self::Key],
    ) -> impl Future<Output = Result<Vec<Self::Value>, StoreError>> + Send;

    /// The key a returned row answers.
    fn key_of(value: &Self::Value) -> Self::Key;
}

/// The resolved result of one key.
pub type LoadResult<V> = Result<Option<V>, LoadError>;

type Slot<V> = watch::Receiver<Option<LoadResult<V>>>;
type Resolver<V> = watch::Sender<Option<LoadResult<V>>>;

/// Mutable loader state: every key seen so far and the open window.
struct LoaderState<K, V> {
    slots: HashMap<String, Slot<V>>,
    pending: Vec<(K, Resolver<V>)>,
}

/// Per-request cache and key-coalescing fetch engine.
pub struct BatchLoader<F: BatchFetch> {
    fetcher: F,
    state: Mutex<LoaderState<F::Key, F::Value>>,
}

impl<F: BatchFetch> BatchLoader<F> {
    /// Create an empty loader over `fetcher`.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: Mutex::new(LoaderState {
                slots: HashMap::new(),
                pending: Vec::new(),
            }),
        }
    }

    /// Load one key.
    ///
    /// The key joins the current batch window immediately; the returned
    /// future resolves to `Ok(None)` when the store has no row for it.
    pub fn load(&self, key: F::Key) -> impl Future<Output = LoadResult<F::Value>> + Send + '_ {
        let slot = self.register(key);
        async move {
            self.dispatch().await;
            resolve(slot).await
        }
    }

    /// Load several keys as one window, preserving input order.
    pub fn load_many<I>(&self, keys: I) -> impl Future<Output = Vec<LoadResult<F::Value>>> + Send + '_
    where
        I: IntoIterator<Item = F::Key>,
    {
        join_all(keys.into_iter().map(|key| self.load(key)))
    }

    /// Flush the open window through one batched fetch.
    ///
    /// A no-op when no keys are waiting. On failure every caller in the
    /// window receives the same [`LoadError::Fetch`].
    pub async fn dispatch(&self) {
        let batch = std::mem::take(&mut self.lock().pending);
        if batch.is_empty() {
            return;
        }

        let keys: Vec<F::Key> = batch.iter().map(|(key, _)| key.clone()).collect();
        tracing::debug!(loader = F::NAME, keys = keys.len(), "Dispatching batch");

        match self.fetcher.fetch(&keys).await {
            Ok(rows) => {
                let mut by_key: HashMap<String, F::Value> = rows
                    .into_iter()
                    .map(|row| (F::key_of(&row).canonical(), row))
                    .collect();
                for (key, resolver) in batch {
                    resolver.send_replace(Some(Ok(by_key.remove(&key.canonical()))));
                }
            }
            Err(error) => {
                tracing::warn!(loader = F::NAME, keys = keys.len(), %error, "Batch fetch failed");
                let failure = LoadError::Fetch(Arc::new(error));
                let mut state = self.lock();
                for (key, resolver) in batch {
                    state.slots.remove(&key.canonical());
                    resolver.send_replace(Some(Err(failure.clone())));
                }
            }
        }
    }

    /// Attach `key` to its cached slot, or open a new one in the current
    /// window.
    fn register(&self, key: F::Key) -> Slot<F::Value> {
        let canonical = key.canonical();
        let mut state = self.lock();

        if let Some(slot) = state.slots.get(&canonical) {
            // A window dropped mid-fetch leaves a closed, empty slot behind.
            let live = slot.borrow().is_some() || slot.has_changed().is_ok();
            if live {
                tracing::trace!(loader = F::NAME, key = %canonical, "Loader cache hit");
                return slot.clone();
            }
        }

        let (resolver, slot) = watch::channel(None);
        state.slots.insert(canonical, slot.clone());
        state.pending.push((key, resolver));
        slot
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<F::Key, F::Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wait for a slot to be filled and clone its result out.
async fn resolve<V: Clone>(mut slot: Slot<V>) -> LoadResult<V> {
    let filled = slot.wait_for(Option::is_some).await?;
    (*filled).clone().unwrap_or(Err(LoadError::Abandoned))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    impl LoaderKey for u32 {
        fn canonical(&self) -> String {
            self.to_string()
        }
    }

    /// Records every batch it is asked for and answers in reverse order.
    /// Key 404 never has a row.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Vec<u32>>>>,
        fail_next: Arc<AtomicBool>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Vec<u32>> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl BatchFetch for Recorder {
        type Key = u32;
        type Value = (u32, String);

        const NAME: &'static str = "recorder";

        async fn fetch(&self, keys: &[u32]) -> Result<Vec<(u32, String)>, StoreError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(keys.to_vec());
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Backend("connection reset".into()));
            }
            Ok(keys
                .iter()
                .rev()
                .filter(|key| **key != 404)
                .map(|key| (*key, format!("row-{key}")))
                .collect())
        }

        fn key_of(value: &(u32, String)) -> u32 {
            value.0
        }
    }

    fn row(key: u32) -> Option<(u32, String)> {
        Some((key, format!("row-{key}")))
    }

    #[tokio::test]
    async fn same_turn_loads_share_one_fetch() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        let (a, b, c) = tokio::join!(loader.load(1), loader.load(2), loader.load(3));

        assert_eq!(a.ok(), Some(row(1)));
        assert_eq!(b.ok(), Some(row(2)));
        assert_eq!(c.ok(), Some(row(3)));
        assert_eq!(recorder.calls(), vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn missing_rows_resolve_to_none() {
        let loader = BatchLoader::new(Recorder::default());
        let (found, missing) = tokio::join!(loader.load(7), loader.load(404));
        assert_eq!(found.ok(), Some(row(7)));
        assert_eq!(missing.ok(), Some(None));
    }

    #[tokio::test]
    async fn repeated_keys_hit_the_cache() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        let (first, second) = tokio::join!(loader.load(5), loader.load(5));
        assert_eq!(first.ok(), Some(row(5)));
        assert_eq!(second.ok(), Some(row(5)));

        let later = loader.load(5).await;
        assert_eq!(later.ok(), Some(row(5)));
        assert_eq!(recorder.calls(), vec![vec![5]]);
    }

    #[tokio::test]
    async fn later_turns_form_new_windows() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        assert!(loader.load(1).await.is_ok());
        assert!(loader.load(2).await.is_ok());
        assert_eq!(recorder.calls(), vec![vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn load_many_preserves_input_order() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        let results: Vec<_> = loader
            .load_many([9, 404, 3])
            .await
            .into_iter()
            .map(Result::ok)
            .collect();
        assert_eq!(results, vec![Some(row(9)), Some(None), Some(row(3))]);
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn explicit_dispatch_flushes_registered_keys() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        let a = loader.load(10);
        let b = loader.load(11);
        loader.dispatch().await;
        assert_eq!(recorder.calls(), vec![vec![10, 11]]);

        assert_eq!(a.await.ok(), Some(row(10)));
        assert_eq!(b.await.ok(), Some(row(11)));
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_batch_fails_every_caller_then_retries() {
        let recorder = Recorder::default();
        recorder.fail_next.store(true, Ordering::SeqCst);
        let loader = BatchLoader::new(recorder.clone());

        let (a, b) = tokio::join!(loader.load(1), loader.load(2));
        assert!(matches!(a, Err(LoadError::Fetch(_))));
        assert!(matches!(b, Err(LoadError::Fetch(_))));

        let retried = loader.load(1).await;
        assert_eq!(retried.ok(), Some(row(1)));
        assert_eq!(recorder.calls(), vec![vec![1, 2], vec![1]]);
    }

    #[tokio::test]
    async fn dropped_caller_does_not_strand_its_key() {
        let recorder = Recorder::default();
        let loader = BatchLoader::new(recorder.clone());

        drop(loader.load(8));
        let result = loader.load(8).await;
        assert_eq!(result.ok(), Some(row(8)));
        assert_eq!(recorder.calls(), vec![vec![8]]);
    }
}

//! Keyed query cache with coalesced fetches.
//!
//! A [`QueryCache`] owns one cached value, the function that fetches it and
//! the policy deciding when it is stale. All fetches for a key go through a
//! single shared future, so at most one request per key is in flight.
//!
//! Calls that arrive before a fetch has dispatched its request join that
//! fetch. An `invalidate()` that arrives after dispatch queues exactly one
//! follow-up fetch, which all later invalidations share, so a response that
//! may predate a mutation is never the last word.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clinic_api::{with_retry, ApiError, AppointmentApi, Client, RetryConfig};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::event::{transform_all, CalendarEvent};

pub const CALENDAR_EVENTS_KEY: &str = "calendarEvents";
pub const CLIENTS_KEY: &str = "clients";

/// Fetch function of a query. Called once per network attempt.
pub type QueryFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

type SharedFetch = Shared<BoxFuture<'static, Result<(), ApiError>>>;

/// When a query considers its data stale and what triggers a refetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Age after which data is stale. Zero means stale as soon as it lands.
    pub stale_time: Duration,
    pub refetch_on_mount: bool,
    pub refetch_on_window_focus: bool,
    pub retry: RetryConfig,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            refetch_on_mount: true,
            refetch_on_window_focus: false,
            retry: RetryConfig::default(),
        }
    }
}

/// Snapshot of a query as seen by consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    /// Fetching with nothing to show yet.
    pub is_loading: bool,
    /// Any fetch in progress, including background refetches.
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetching: false,
            is_error: false,
            error: None,
            updated_at: None,
        }
    }
}

#[derive(Default)]
struct FetchSlot {
    current: Option<SharedFetch>,
    /// The current fetch has issued its request.
    dispatched: bool,
    /// Run one more fetch after the current one.
    rerun: bool,
}

struct QueryInner<T> {
    key: &'static str,
    query_fn: QueryFn<T>,
    options: QueryOptions,
    state: watch::Sender<QueryState<T>>,
    slot: Mutex<FetchSlot>,
    fetched_at: Mutex<Option<Instant>>,
    invalidated: AtomicBool,
    fetch_count: AtomicU64,
}

/// Cached, observable result of one query function.
pub struct QueryCache<T> {
    inner: Arc<QueryInner<T>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("key", &self.inner.key)
            .field("options", &self.inner.options)
            .field("fetch_count", &self.inner.fetch_count.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(key: &'static str, options: QueryOptions, query_fn: QueryFn<T>) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            inner: Arc::new(QueryInner {
                key,
                query_fn,
                options,
                state,
                slot: Mutex::new(FetchSlot::default()),
                fetched_at: Mutex::new(None),
                invalidated: AtomicBool::new(false),
                fetch_count: AtomicU64::new(0),
            }),
        }
    }

    pub fn key(&self) -> &'static str {
        self.inner.key
    }

    pub fn options(&self) -> &QueryOptions {
        &self.inner.options
    }

    pub fn state(&self) -> QueryState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.inner.state.borrow().data.clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.inner.state.subscribe()
    }

    /// Number of fetches actually run, retries not counted.
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetch_count.load(Ordering::SeqCst)
    }

    pub fn is_stale(&self) -> bool {
        if self.inner.invalidated.load(Ordering::SeqCst) {
            return true;
        }
        match *self.inner.fetched_at.lock() {
            Some(at) => at.elapsed() >= self.inner.options.stale_time,
            None => true,
        }
    }

    /// Fetch now, or join the fetch already in flight.
    pub async fn refetch(&self) -> Result<(), ApiError> {
        self.start(false).await
    }

    /// Mark the data stale and refetch.
    pub async fn invalidate(&self) -> Result<(), ApiError> {
        self.inner.invalidated.store(true, Ordering::SeqCst);
        self.start(true).await
    }

    /// Called when a consumer mounts. Refetches stale or missing data.
    pub async fn mount(&self) -> Result<(), ApiError> {
        let has_data = self.inner.state.borrow().data.is_some();
        if !has_data || (self.inner.options.refetch_on_mount && self.is_stale()) {
            self.refetch().await
        } else {
            Ok(())
        }
    }

    /// Called when the window regains focus.
    pub async fn on_window_focus(&self) -> Result<(), ApiError> {
        if !self.inner.options.refetch_on_window_focus {
            tracing::trace!(key = self.inner.key, "Focus refetch disabled");
            return Ok(());
        }
        if self.is_stale() {
            self.refetch().await
        } else {
            Ok(())
        }
    }

    fn start(&self, rerun_if_dispatched: bool) -> SharedFetch {
        let mut slot = self.inner.slot.lock();
        if let Some(current) = slot.current.clone() {
            if slot.dispatched && rerun_if_dispatched {
                tracing::debug!(key = self.inner.key, "Queued refetch behind in-flight fetch");
                slot.rerun = true;
            } else {
                tracing::debug!(key = self.inner.key, "Joined in-flight fetch");
            }
            return current;
        }

        let inner = Arc::clone(&self.inner);
        let fetch = async move { inner.run().await }.boxed().shared();
        slot.current = Some(fetch.clone());
        slot.dispatched = false;
        slot.rerun = false;
        fetch
    }
}

impl<T> QueryInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run(self: Arc<Self>) -> Result<(), ApiError> {
        // Callers in the same tick join this fetch instead of queueing another.
        tokio::task::yield_now().await;

        loop {
            {
                let mut slot = self.slot.lock();
                slot.dispatched = true;
                slot.rerun = false;
            }
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            self.state.send_modify(|s| {
                s.is_fetching = true;
                s.is_loading = s.data.is_none();
            });
            tracing::debug!(key = self.key, "Fetching");

            let result = with_retry(&self.options.retry, || (self.query_fn)()).await;

            let mut slot = self.slot.lock();
            if slot.rerun {
                tracing::debug!(key = self.key, "Discarding superseded response");
                continue;
            }
            self.apply(&result);
            slot.current = None;
            slot.dispatched = false;
            return result.map(|_| ());
        }
    }

    fn apply(&self, result: &Result<T, ApiError>) {
        match result {
            Ok(data) => {
                *self.fetched_at.lock() = Some(Instant::now());
                self.invalidated.store(false, Ordering::SeqCst);
                self.state.send_modify(|s| {
                    s.data = Some(data.clone());
                    s.is_loading = false;
                    s.is_fetching = false;
                    s.is_error = false;
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                });
            }
            Err(e) => {
                tracing::warn!(key = self.key, "Query failed: {}", e);
                // Previous data stays visible behind the error.
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.is_fetching = false;
                    s.is_error = true;
                    s.error = Some(e.clone());
                });
            }
        }
    }
}

/// The `"calendarEvents"` query: every appointment, projected for the widget.
///
/// Stale immediately and never refetched on focus, so a background refresh
/// cannot land in the middle of a drag.
pub fn calendar_events_query(
    api: Arc<dyn AppointmentApi>,
    retry: RetryConfig,
) -> QueryCache<Vec<CalendarEvent>> {
    let query_fn: QueryFn<Vec<CalendarEvent>> = Arc::new(move || {
        let api = Arc::clone(&api);
        async move {
            let appointments = api.list_appointments().await?;
            Ok(transform_all(&appointments))
        }
        .boxed()
    });

    QueryCache::new(
        CALENDAR_EVENTS_KEY,
        QueryOptions {
            stale_time: Duration::ZERO,
            refetch_on_mount: true,
            refetch_on_window_focus: false,
            retry,
        },
        query_fn,
    )
}

/// The `"clients"` query used for patient selection.
pub fn clients_query(
    api: Arc<dyn AppointmentApi>,
    retry: RetryConfig,
    stale_time: Duration,
) -> QueryCache<Vec<Client>> {
    let query_fn: QueryFn<Vec<Client>> = Arc::new(move || {
        let api = Arc::clone(&api);
        async move { api.list_clients().await }.boxed()
    });

    QueryCache::new(
        CLIENTS_KEY,
        QueryOptions {
            stale_time,
            refetch_on_mount: true,
            refetch_on_window_focus: false,
            retry,
        },
        query_fn,
    )
}

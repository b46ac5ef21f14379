//! Explicit load state for data fetched from the database.

use std::{
    fmt::Display,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use backon::{ExponentialBuilder, Retryable};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum LoadState<T> {
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Success(data) => Some(data),
            _ => None,
        }
    }
}

/// Backoff for transient fetch errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_times: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            max_times: 3,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_times)
            .with_jitter()
    }
}

/// `Idle → Loading → Success | Error`, observable through a watch channel.
///
/// Each call to [`Loader::load`] starts a new generation. A fetch that
/// finishes after a newer one started is discarded.
pub struct Loader<T> {
    name: &'static str,
    state: watch::Sender<LoadState<T>>,
    generation: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Loader<T> {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self {
            name,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> LoadState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState<T>> {
        self.state.subscribe()
    }

    /// Runs `fetch` once. Returns false when the result was superseded.
    pub async fn load<F, Fut, E>(&self, fetch: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let generation = self.begin();
        let result = fetch().await;
        self.finish(generation, result)
    }

    /// Like [`Loader::load`], retrying errors for which `transient` holds.
    pub async fn load_with_retry<F, Fut, E, P>(
        &self,
        policy: RetryPolicy,
        fetch: F,
        transient: P,
    ) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: FnMut(&E) -> bool,
    {
        let generation = self.begin();
        let name = self.name;
        let result = fetch
            .retry(policy.backoff())
            .when(transient)
            .notify(|e: &E, dur: Duration| {
                warn!(
                    loader = name,
                    "Load failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await;
        self.finish(generation, result)
    }

    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(LoadState::Loading);
        generation
    }

    fn finish<E: Display>(&self, generation: u64, result: Result<T, E>) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(loader = self.name, generation, "Discarding superseded load");
            return false;
        }
        let next = match result {
            Ok(data) => LoadState::Success(data),
            Err(e) => {
                warn!(loader = self.name, error = %e, "Load failed");
                LoadState::Error(e.to_string())
            }
        };
        self.state.send_replace(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn moves_from_idle_to_success() {
        let loader: Loader<Vec<u32>> = Loader::new("numbers");
        assert_eq!(loader.state(), LoadState::Idle);
        assert!(loader.load(|| async { Ok::<_, String>(vec![1, 2]) }).await);
        assert_eq!(loader.state(), LoadState::Success(vec![1, 2]));
    }

    #[tokio::test]
    async fn failure_is_recorded_as_error() {
        let loader: Loader<u32> = Loader::new("failing");
        loader.load(|| async { Err::<u32, _>("connection refused") }).await;
        assert_eq!(loader.state(), LoadState::Error("connection refused".into()));
    }

    #[tokio::test]
    async fn superseded_result_is_discarded() {
        let loader: Loader<&'static str> = Loader::new("race");
        let (release, gate) = oneshot::channel::<()>();

        let slow = loader.load(|| async move {
            let _ = gate.await;
            Ok::<_, String>("stale")
        });
        let fast = async {
            let applied = loader.load(|| async { Ok::<_, String>("fresh") }).await;
            let _ = release.send(());
            applied
        };

        let (slow_applied, fast_applied) = tokio::join!(slow, fast);
        assert!(!slow_applied);
        assert!(fast_applied);
        assert_eq!(loader.state(), LoadState::Success("fresh"));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let loader: Loader<u32> = Loader::new("flaky");
        let attempts = Arc::new(AtomicUsize::new(0));
        let policy = RetryPolicy {
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_times: 3,
        };

        let counter = attempts.clone();
        loader
            .load_with_retry(
                policy,
                move || {
                    let counter = counter.clone();
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err("busy".to_string())
                        } else {
                            Ok(7)
                        }
                    }
                },
                |e: &String| e == "busy",
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(loader.state(), LoadState::Success(7));
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let loader: Loader<u32> = Loader::new("broken");
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        loader
            .load_with_retry(
                RetryPolicy::default(),
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>("schema mismatch".to_string())
                },
                |_| false,
            )
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(loader.state(), LoadState::Error(_)));
    }
}

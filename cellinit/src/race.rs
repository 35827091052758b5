//! Datasource selection race.
//!
//! Every candidate datasource is polled by its own task with independent
//! exponential backoff. The first one to report itself available wins; the
//! rest are cancelled and joined before the race returns, so no polling task
//! outlives the call.
//!
//! ```text
//!            ┌─ poll(ec2)     ── sleep 100ms ── sleep 200ms ── ... ─┐
//! select ────┼─ poll(gce)     ── available! ── set winner ──────────┼──→ winner / None
//!            └─ poll(waagent) ── (cancelled) ───────────────────────┘
//!                     supervisor: winner | all done | timeout
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::datasource::SharedDatasource;

/// Timing parameters for [`select_datasource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceConfig {
    /// First delay between probes of a single datasource.
    pub initial_interval: Duration,
    /// Ceiling for the per-datasource delay.
    pub max_interval: Duration,
    /// Deadline for the whole race.
    pub timeout: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Exponential backoff, doubling up to a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Return the delay to wait now and grow the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

/// Pick the first datasource that becomes available.
///
/// Returns `None` when `config.timeout` elapses first or when every
/// datasource is permanently unavailable. That is a normal outcome (e.g.
/// booting outside any recognized cloud), not an error.
///
/// If several datasources become available at the same moment, whichever
/// records itself first wins. The choice is intentionally non-deterministic;
/// callers must not rely on a particular datasource winning a tie.
///
/// The race only probes. It never calls `fetch_userdata`; that is left to the
/// caller, on the winner alone.
pub async fn select_datasource(
    sources: Vec<SharedDatasource>,
    config: RaceConfig,
) -> Option<SharedDatasource> {
    if sources.is_empty() {
        return None;
    }

    let winner: Arc<OnceLock<SharedDatasource>> = Arc::new(OnceLock::new());
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    for source in sources {
        let winner = Arc::clone(&winner);
        let cancel = cancel.clone();
        tasks.spawn(poll_datasource(source, config, winner, cancel));
    }

    // Wait for a winner, for every poller to give up, or for the deadline.
    let supervise = async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Datasource polling task failed");
            }
            if winner.get().is_some() {
                return;
            }
        }
    };
    if tokio::time::timeout(config.timeout, supervise).await.is_err() {
        tracing::warn!(
            timeout_ms = config.timeout.as_millis() as u64,
            "No datasource became available in time"
        );
    }

    // Stop the stragglers and wait for them before returning.
    cancel.cancel();
    tasks.shutdown().await;

    match winner.get() {
        Some(source) => {
            tracing::info!(source = %source.kind(), "Selected datasource");
            Some(Arc::clone(source))
        }
        None => {
            tracing::info!("No datasource available");
            None
        }
    }
}

/// Poll one datasource until it is available, retires, or is cancelled.
async fn poll_datasource(
    source: SharedDatasource,
    config: RaceConfig,
    winner: Arc<OnceLock<SharedDatasource>>,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(config.initial_interval, config.max_interval);

    loop {
        tracing::debug!(source = %source.kind(), "Checking datasource availability");

        let available = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            available = source.is_available() => available,
        };

        if available {
            if cancel.is_cancelled() {
                return;
            }
            if winner.set(Arc::clone(&source)).is_ok() {
                cancel.cancel();
            } else {
                tracing::debug!(source = %source.kind(), "Datasource available but lost the race");
            }
            return;
        }

        if !source.availability_changes() {
            tracing::debug!(source = %source.kind(), "Datasource permanently unavailable");
            return;
        }

        let delay = backoff.next_delay();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::Datasource;
    use async_trait::async_trait;
    use cellinit_shared::errors::CellinitResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Becomes available after `available_after` failed probes (never if `None`).
    struct MockSource {
        name: &'static str,
        available_after: Option<usize>,
        changes: bool,
        probes: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl MockSource {
        fn new(name: &'static str, available_after: Option<usize>, changes: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                available_after,
                changes,
                probes: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
            })
        }

        fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Datasource for MockSource {
        fn kind(&self) -> &str {
            self.name
        }

        async fn is_available(&self) -> bool {
            let n = self.probes.fetch_add(1, Ordering::SeqCst);
            matches!(self.available_after, Some(after) if n >= after)
        }

        fn availability_changes(&self) -> bool {
            self.changes
        }

        async fn fetch_userdata(&self) -> CellinitResult<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.name.as_bytes().to_vec())
        }
    }

    fn shared(list: &[&Arc<MockSource>]) -> Vec<SharedDatasource> {
        list.iter()
            .map(|s| Arc::clone(s) as SharedDatasource)
            .collect()
    }

    fn config() -> RaceConfig {
        RaceConfig {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let max = Duration::from_secs(1);
        let mut backoff = Backoff::new(Duration::from_millis(100), max);

        let delays: Vec<_> = (0..10).map(|_| backoff.next_delay()).collect();
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[2], Duration::from_millis(400));
        assert_eq!(delays[3], Duration::from_millis(800));
        assert_eq!(delays[4], max);
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(delays.iter().all(|d| *d <= max));
    }

    #[test]
    fn test_backoff_initial_above_max_is_capped() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediately_available_source_wins() {
        let dead = MockSource::new("dead", None, true);
        let ready = MockSource::new("ready", Some(0), true);
        let start = Instant::now();

        let winner = select_datasource(shared(&[&dead, &ready]), config())
            .await
            .expect("a winner");

        assert_eq!(winner.kind(), "ready");
        assert!(start.elapsed() <= config().initial_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_available_after_retries() {
        let late = MockSource::new("late", Some(3), true);
        let start = Instant::now();

        let winner = select_datasource(shared(&[&late]), config()).await.unwrap();

        assert_eq!(winner.kind(), "late");
        assert_eq!(late.probes(), 4);
        // Three sleeps: 100ms + 200ms + 400ms.
        assert!(start.elapsed() >= Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_available_times_out() {
        let a = MockSource::new("a", None, true);
        let b = MockSource::new("b", None, true);
        let cfg = RaceConfig {
            timeout: Duration::from_secs(5),
            ..config()
        };
        let start = Instant::now();

        let winner = select_datasource(shared(&[&a, &b]), cfg).await;

        assert!(winner.is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= cfg.timeout);
        assert!(elapsed <= cfg.timeout + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_permanently_unavailable_returns_early() {
        let a = MockSource::new("a", None, false);
        let b = MockSource::new("b", None, false);
        let start = Instant::now();

        let winner = select_datasource(shared(&[&a, &b]), config()).await;

        assert!(winner.is_none());
        assert_eq!(a.probes(), 1);
        assert_eq!(b.probes(), 1);
        assert!(start.elapsed() < config().initial_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_source_list() {
        assert!(select_datasource(Vec::new(), config()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_losers_stop_after_race_returns() {
        let slow = MockSource::new("slow", None, true);
        let other = MockSource::new("other", None, true);
        let ready = MockSource::new("ready", Some(2), true);

        let winner = select_datasource(shared(&[&slow, &other, &ready]), config())
            .await
            .unwrap();
        assert_eq!(winner.kind(), "ready");

        let probes_at_return = (slow.probes(), other.probes(), ready.probes());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            (slow.probes(), other.probes(), ready.probes()),
            probes_at_return
        );
        assert_eq!(slow.fetches(), 0);
        assert_eq!(other.fetches(), 0);
        assert_eq!(ready.fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_winners_pick_exactly_one() {
        let a = MockSource::new("a", Some(0), true);
        let b = MockSource::new("b", Some(0), true);

        let winner = select_datasource(shared(&[&a, &b]), config())
            .await
            .unwrap();

        assert!(winner.kind() == "a" || winner.kind() == "b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_race_on_multi_thread_runtime() {
        let sources: Vec<SharedDatasource> = (0..8)
            .map(|i| {
                let after = if i == 5 { Some(1) } else { None };
                MockSource::new("mock", after, true) as SharedDatasource
            })
            .collect();
        let cfg = RaceConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            timeout: Duration::from_secs(10),
        };

        assert!(select_datasource(sources, cfg).await.is_some());
    }
}

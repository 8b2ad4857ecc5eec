mod bucket;
mod event;
mod observer;
mod summary;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use tracing::warn;

pub use bucket::{BucketKey, TestBucket};
pub use event::{EventKind, Hit, ResultEvent, RunStatus};
pub use observer::{Observer, ObserverError};
pub use summary::RunSummary;

use crate::error::{Error, Result};

/// The reporting surface a scenario sees.
///
/// Each invocation calls `start_test`, exactly one of `add_success` / `add_failure` /
/// `add_error`, then `stop_test`. Hits and socket telemetry are independent of that bracket.
pub trait Reporter: Send + Sync {
    fn start_test(&self, test: &str, status: RunStatus, worker_id: Option<&str>);
    fn stop_test(&self, test: &str, status: RunStatus, worker_id: Option<&str>);
    fn add_success(&self, test: &str, status: RunStatus, worker_id: Option<&str>);
    fn add_failure(&self, test: &str, exc_info: &str, status: RunStatus, worker_id: Option<&str>);
    fn add_error(&self, test: &str, exc_info: &str, status: RunStatus, worker_id: Option<&str>);
    fn add_hit(&self, hit: Hit);
    fn socket_open(&self, status: RunStatus, worker_id: Option<&str>);
    fn socket_close(&self, status: RunStatus, worker_id: Option<&str>);
    fn socket_message(&self, status: RunStatus, size: u64, worker_id: Option<&str>);
}

/// Aggregates lifecycle and timing events and answers statistics over them.
///
/// Every mutation goes through [`ResultSink::apply`]: the event is committed under the sink lock
/// and then pushed to each observer in registration order, still under the lock, so
/// notification order always equals commit order.
#[derive(Default)]
pub struct ResultSink {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    hits: Vec<Hit>,
    tests: Vec<TestBucket>,
    index: AHashMap<BucketKey, usize>,
    sockets: i64,
    socket_bytes_received: u64,
    started: Option<Instant>,
    stopped: Option<Instant>,
    observers: Vec<Arc<dyn Observer>>,
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResultSink")
            .field("tests", &inner.tests.len())
            .field("hits", &inner.hits.len())
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        self.inner.lock().observers.push(observer);
    }

    /// Commits `event`, then notifies observers.
    pub fn apply(&self, event: ResultEvent) {
        let mut inner = self.inner.lock();
        inner.commit(&event);
        inner.notify(&event);
    }

    /// Notifies observers without touching the aggregated state.
    pub fn forward(&self, event: &ResultEvent) {
        self.inner.lock().notify(event);
    }

    pub fn start_test_run(&self, worker_id: Option<&str>) {
        self.apply(ResultEvent::StartTestRun {
            worker_id: worker_id.map(str::to_string),
        });
    }

    pub fn stop_test_run(&self, worker_id: Option<&str>) {
        self.apply(ResultEvent::StopTestRun {
            worker_id: worker_id.map(str::to_string),
        });
    }

    pub fn nb_finished_tests(&self) -> u64 {
        let inner = self.inner.lock();
        inner.tests.iter().filter(|t| t.finished()).count() as u64
    }

    pub fn nb_hits(&self) -> u64 {
        self.inner.lock().hits.len() as u64
    }

    pub fn nb_tests(&self) -> u64 {
        self.inner.lock().tests.len() as u64
    }

    pub fn urls(&self) -> BTreeSet<String> {
        self.inner.lock().urls()
    }

    /// Whole seconds between run start and run stop (or now, while running).
    pub fn duration(&self) -> Result<u64> {
        self.inner.lock().elapsed().map(|d| d.as_secs())
    }

    pub fn nb_failures(&self, name: Option<&str>, cycle: Option<u64>) -> u64 {
        let inner = self.inner.lock();
        inner
            .tests_matching(name, cycle)
            .map(|t| t.failures.len() as u64)
            .sum()
    }

    pub fn nb_errors(&self, name: Option<&str>, cycle: Option<u64>) -> u64 {
        let inner = self.inner.lock();
        inner
            .tests_matching(name, cycle)
            .map(|t| t.errors.len() as u64)
            .sum()
    }

    pub fn nb_success(&self, name: Option<&str>, cycle: Option<u64>) -> u64 {
        let inner = self.inner.lock();
        inner.tests_matching(name, cycle).map(|t| t.success).sum()
    }

    pub fn failures(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .tests
            .iter()
            .flat_map(|t| t.failures.iter().cloned())
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .tests
            .iter()
            .flat_map(|t| t.errors.iter().cloned())
            .collect()
    }

    pub fn tests(&self, name: Option<&str>, cycle: Option<u64>) -> Vec<TestBucket> {
        let inner = self.inner.lock();
        inner.tests_matching(name, cycle).cloned().collect()
    }

    pub fn hits(&self, url: Option<&str>, cycle: Option<u64>) -> Vec<Hit> {
        let inner = self.inner.lock();
        inner.hits_matching(url, cycle).cloned().collect()
    }

    /// Mean elapsed seconds of the matching hits, `0.0` without hits.
    pub fn average_request_time(&self, url: Option<&str>, cycle: Option<u64>) -> f64 {
        self.inner.lock().average_request_time(url, cycle)
    }

    /// Fraction of matching hits with a 2xx/3xx status, `0.0` without hits.
    pub fn hits_success_rate(&self, url: Option<&str>, cycle: Option<u64>) -> f64 {
        self.inner.lock().hits_success_rate(url, cycle)
    }

    /// Elapsed time in milliseconds at `quantile` (0..=1) over the matching hits.
    pub fn request_time_percentile(
        &self,
        url: Option<&str>,
        cycle: Option<u64>,
        quantile: f64,
    ) -> Option<f64> {
        let inner = self.inner.lock();
        inner
            .request_time_histogram(url, cycle)
            .map(|h| h.value_at_quantile(quantile) as f64 / 1000.0)
    }

    pub fn tests_per_second(&self) -> Result<f64> {
        let inner = self.inner.lock();
        Ok(per_second(inner.tests.len() as u64, inner.elapsed()?))
    }

    pub fn requests_per_second(&self) -> Result<f64> {
        let inner = self.inner.lock();
        Ok(per_second(inner.hits.len() as u64, inner.elapsed()?))
    }

    /// Mean duration in seconds of the matching finished tests.
    pub fn average_test_duration(&self, name: Option<&str>, cycle: Option<u64>) -> Option<f64> {
        self.inner.lock().average_test_duration(name, cycle)
    }

    /// Mean per-test success ratio over the matching tests that reported an outcome.
    pub fn test_success_rate(&self, name: Option<&str>, cycle: Option<u64>) -> Option<f64> {
        self.inner.lock().test_success_rate(name, cycle)
    }

    pub fn sockets(&self) -> i64 {
        self.inner.lock().sockets
    }

    pub fn socket_bytes_received(&self) -> u64 {
        self.inner.lock().socket_bytes_received
    }

    pub fn summary(&self) -> RunSummary {
        let inner = self.inner.lock();
        let elapsed = inner.elapsed().unwrap_or(Duration::ZERO);
        let histogram = inner.request_time_histogram(None, None);
        let percentile =
            |q: f64| histogram.as_ref().map(|h| h.value_at_quantile(q) as f64 / 1000.0);

        RunSummary {
            duration_secs: elapsed.as_secs(),
            tests_total: inner.tests.len() as u64,
            tests_finished: inner.tests.iter().filter(|t| t.finished()).count() as u64,
            success_total: inner.tests.iter().map(|t| t.success).sum(),
            failures_total: inner.tests.iter().map(|t| t.failures.len() as u64).sum(),
            errors_total: inner.tests.iter().map(|t| t.errors.len() as u64).sum(),
            hits_total: inner.hits.len() as u64,
            urls: inner.urls().into_iter().collect(),
            tests_per_sec: per_second(inner.tests.len() as u64, elapsed),
            requests_per_sec: per_second(inner.hits.len() as u64, elapsed),
            average_request_time_secs: inner.average_request_time(None, None),
            hits_success_rate: inner.hits_success_rate(None, None),
            test_success_rate: inner.test_success_rate(None, None),
            average_test_duration_secs: inner.average_test_duration(None, None),
            request_time_p50_ms: percentile(0.50),
            request_time_p90_ms: percentile(0.90),
            request_time_p99_ms: percentile(0.99),
            sockets_open: inner.sockets,
            socket_bytes_received: inner.socket_bytes_received,
        }
    }
}

impl Reporter for ResultSink {
    fn start_test(&self, test: &str, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::StartTest {
            test: test.to_string(),
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn stop_test(&self, test: &str, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::StopTest {
            test: test.to_string(),
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn add_success(&self, test: &str, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::AddSuccess {
            test: test.to_string(),
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn add_failure(&self, test: &str, exc_info: &str, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::AddFailure {
            test: test.to_string(),
            exc_info: exc_info.to_string(),
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn add_error(&self, test: &str, exc_info: &str, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::AddError {
            test: test.to_string(),
            exc_info: exc_info.to_string(),
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn add_hit(&self, hit: Hit) {
        self.apply(ResultEvent::AddHit(hit));
    }

    fn socket_open(&self, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::SocketOpen {
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn socket_close(&self, status: RunStatus, worker_id: Option<&str>) {
        self.apply(ResultEvent::SocketClose {
            status,
            worker_id: worker_id.map(str::to_string),
        });
    }

    fn socket_message(&self, status: RunStatus, size: u64, worker_id: Option<&str>) {
        self.apply(ResultEvent::SocketMessage {
            status,
            size,
            worker_id: worker_id.map(str::to_string),
        });
    }
}

impl Inner {
    fn notify(&self, event: &ResultEvent) {
        for observer in &self.observers {
            if let Err(err) = observer.push(event) {
                warn!(event = %event.kind(), error = %err, "observer failed");
            }
        }
    }

    fn commit(&mut self, event: &ResultEvent) {
        match event {
            ResultEvent::StartTestRun { worker_id } => {
                if self.started.is_some() {
                    warn!(?worker_id, "test run started twice; overwriting start time");
                }
                self.started = Some(Instant::now());
            }
            ResultEvent::StopTestRun { worker_id } => {
                if self.stopped.is_some() {
                    warn!(?worker_id, "test run stopped twice; overwriting stop time");
                }
                self.stopped = Some(Instant::now());
            }
            ResultEvent::StartTest {
                test,
                status,
                worker_id,
            } => {
                self.bucket(test, status, worker_id.as_deref());
            }
            ResultEvent::StopTest {
                test,
                status,
                worker_id,
            } => {
                self.bucket(test, status, worker_id.as_deref()).end = Some(Instant::now());
            }
            ResultEvent::AddError {
                test,
                exc_info,
                status,
                worker_id,
            } => {
                self.bucket(test, status, worker_id.as_deref())
                    .errors
                    .push(exc_info.clone());
            }
            ResultEvent::AddFailure {
                test,
                exc_info,
                status,
                worker_id,
            } => {
                self.bucket(test, status, worker_id.as_deref())
                    .failures
                    .push(exc_info.clone());
            }
            ResultEvent::AddSuccess {
                test,
                status,
                worker_id,
            } => {
                let bucket = self.bucket(test, status, worker_id.as_deref());
                bucket.success = bucket.success.saturating_add(1);
            }
            ResultEvent::AddHit(hit) => self.hits.push(hit.clone()),
            ResultEvent::SocketOpen { .. } => self.sockets = self.sockets.saturating_add(1),
            ResultEvent::SocketClose { .. } => self.sockets = self.sockets.saturating_sub(1),
            ResultEvent::SocketMessage { size, .. } => {
                self.socket_bytes_received = self.socket_bytes_received.saturating_add(*size);
            }
        }
    }

    fn bucket(
        &mut self,
        test: &str,
        status: &RunStatus,
        worker_id: Option<&str>,
    ) -> &mut TestBucket {
        let key = BucketKey::new(test, status, worker_id);
        let idx = match self.index.get(&key).copied() {
            Some(idx) => idx,
            None => {
                let idx = self.tests.len();
                self.tests.push(TestBucket::new(&key));
                self.index.insert(key, idx);
                idx
            }
        };
        &mut self.tests[idx]
    }

    fn elapsed(&self) -> Result<Duration> {
        let started = self.started.ok_or(Error::RunNotStarted)?;
        let end = self.stopped.unwrap_or_else(Instant::now);
        Ok(end.saturating_duration_since(started))
    }

    fn urls(&self) -> BTreeSet<String> {
        self.hits.iter().map(|h| h.url.clone()).collect()
    }

    fn hits_matching<'a>(
        &'a self,
        url: Option<&'a str>,
        cycle: Option<u64>,
    ) -> impl Iterator<Item = &'a Hit> + 'a {
        self.hits.iter().filter(move |h| {
            url.is_none_or(|u| h.url == u) && cycle.is_none_or(|c| h.status.current_cycle == c)
        })
    }

    fn tests_matching<'a>(
        &'a self,
        name: Option<&'a str>,
        cycle: Option<u64>,
    ) -> impl Iterator<Item = &'a TestBucket> + 'a {
        self.tests.iter().filter(move |t| t.matches(name, cycle))
    }

    fn average_request_time(&self, url: Option<&str>, cycle: Option<u64>) -> f64 {
        mean(self.hits_matching(url, cycle).map(|h| h.elapsed.as_secs_f64())).unwrap_or(0.0)
    }

    fn hits_success_rate(&self, url: Option<&str>, cycle: Option<u64>) -> f64 {
        mean(
            self.hits_matching(url, cycle)
                .map(|h| if h.is_success() { 1.0 } else { 0.0 }),
        )
        .unwrap_or(0.0)
    }

    fn average_test_duration(&self, name: Option<&str>, cycle: Option<u64>) -> Option<f64> {
        mean(
            self.tests_matching(name, cycle)
                .filter_map(|t| t.duration().map(|d| d.as_secs_f64())),
        )
    }

    fn test_success_rate(&self, name: Option<&str>, cycle: Option<u64>) -> Option<f64> {
        mean(self.tests_matching(name, cycle).filter_map(TestBucket::success_rate))
    }

    fn request_time_histogram(&self, url: Option<&str>, cycle: Option<u64>) -> Option<Histogram<u64>> {
        // Microseconds, up to 60s with 3 significant figures.
        let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).ok()?;
        for hit in self.hits_matching(url, cycle) {
            let us = u64::try_from(hit.elapsed.as_micros()).unwrap_or(u64::MAX);
            hist.saturating_record(us.max(1));
        }
        (hist.len() > 0).then_some(hist)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0f64, 0u64), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn status(current_cycle: u64, current_user: u64) -> RunStatus {
        RunStatus {
            cycle: 1,
            user: 1,
            current_cycle,
            current_user,
        }
    }

    fn hit(url: &str, http_status: u16, elapsed_ms: u64, current_cycle: u64) -> Hit {
        Hit {
            url: url.to_string(),
            method: "GET".to_string(),
            http_status,
            started: UNIX_EPOCH + Duration::from_secs(1),
            elapsed: Duration::from_millis(elapsed_ms),
            status: status(current_cycle, 1),
            worker_id: None,
        }
    }

    fn invoke(sink: &ResultSink, test: &str, st: RunStatus, outcome: &str) {
        sink.start_test(test, st, None);
        match outcome {
            "success" => sink.add_success(test, st, None),
            "failure" => sink.add_failure(test, "assertion failed", st, None),
            _ => sink.add_error(test, "unexpected error", st, None),
        }
        sink.stop_test(test, st, None);
    }

    #[test]
    fn outcomes_are_counted_per_bucket_and_in_total() {
        let sink = ResultSink::new();
        sink.start_test_run(None);
        invoke(&sink, "login", status(1, 1), "success");
        invoke(&sink, "login", status(1, 1), "failure");
        invoke(&sink, "login", status(2, 1), "error");
        invoke(&sink, "browse", status(2, 1), "success");
        sink.stop_test_run(None);

        assert_eq!(sink.nb_tests(), 3);
        assert_eq!(sink.nb_finished_tests(), 3);
        assert_eq!(sink.nb_success(None, None), 2);
        assert_eq!(sink.nb_failures(None, None), 1);
        assert_eq!(sink.nb_errors(None, None), 1);
        assert_eq!(sink.nb_success(Some("login"), None), 1);
        assert_eq!(sink.nb_errors(Some("login"), Some(2)), 1);
        assert_eq!(sink.failures(), vec!["assertion failed".to_string()]);
        assert_eq!(sink.errors(), vec!["unexpected error".to_string()]);
        assert_eq!(sink.test_success_rate(Some("login"), Some(1)), Some(0.5));
        assert_eq!(sink.test_success_rate(Some("missing"), None), None);
        assert!(sink.average_test_duration(None, None).is_some());
    }

    #[test]
    fn outcome_without_start_creates_the_bucket() {
        let sink = ResultSink::new();
        sink.add_success("t", status(1, 1), Some("w1"));
        assert_eq!(sink.nb_tests(), 1);
        assert_eq!(sink.nb_finished_tests(), 0);
        assert_eq!(sink.average_test_duration(None, None), None);
    }

    #[test]
    fn request_time_is_zero_without_hits() {
        let sink = ResultSink::new();
        assert_eq!(sink.average_request_time(None, None), 0.0);
        assert_eq!(sink.hits_success_rate(None, None), 0.0);
        assert_eq!(sink.request_time_percentile(None, None, 0.5), None);
    }

    #[test]
    fn request_time_and_success_rate_follow_filters() {
        let sink = ResultSink::new();
        sink.add_hit(hit("http://a/", 200, 100, 1));
        sink.add_hit(hit("http://a/", 302, 300, 1));
        sink.add_hit(hit("http://b/", 500, 1000, 2));

        assert!((sink.average_request_time(Some("http://a/"), None) - 0.2).abs() < 1e-9);
        assert_eq!(sink.hits_success_rate(Some("http://a/"), None), 1.0);
        assert_eq!(sink.hits_success_rate(Some("http://b/"), None), 0.0);
        assert!((sink.hits_success_rate(None, None) - 2.0 / 3.0).abs() < 1e-9);

        let p = sink
            .request_time_percentile(Some("http://b/"), None, 0.99)
            .unwrap_or_default();
        assert!((p - 1000.0).abs() < 2.0, "p99={p}");
    }

    #[test]
    fn hit_filters_select_exact_url_and_cycle() {
        let sink = ResultSink::new();
        sink.add_hit(hit("http://a/", 200, 10, 1));
        sink.add_hit(hit("http://a/x", 200, 10, 1));
        sink.add_hit(hit("http://a/", 200, 10, 2));

        let a = sink.hits(Some("http://a/"), None);
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|h| h.url == "http://a/"));
        assert_eq!(sink.hits(Some("http://a/"), Some(2)).len(), 1);
        assert!(sink.hits(None, Some(9)).is_empty());
        assert_eq!(sink.nb_hits(), 3);
        assert_eq!(
            sink.urls().into_iter().collect::<Vec<_>>(),
            vec!["http://a/".to_string(), "http://a/x".to_string()]
        );
    }

    #[test]
    fn duration_requires_a_started_run() {
        let sink = ResultSink::new();
        assert!(matches!(sink.duration(), Err(Error::RunNotStarted)));
        assert!(matches!(sink.tests_per_second(), Err(Error::RunNotStarted)));

        sink.start_test_run(None);
        let mut last = 0;
        for _ in 0..100 {
            let d = sink
                .duration()
                .unwrap_or_else(|err| panic!("duration failed: {err}"));
            assert!(d >= last);
            last = d;
        }
        sink.stop_test_run(None);
        assert!(sink.requests_per_second().is_ok());
    }

    #[test]
    fn socket_gauge_and_bytes() {
        let sink = ResultSink::new();
        sink.socket_open(status(1, 1), None);
        sink.socket_open(status(1, 1), None);
        sink.socket_message(status(1, 1), 100, None);
        sink.socket_message(status(1, 1), 28, None);
        sink.socket_close(status(1, 1), None);
        assert_eq!(sink.sockets(), 1);
        assert_eq!(sink.socket_bytes_received(), 128);
    }

    #[test]
    fn observers_see_every_mutation_in_call_order() {
        let seen: Arc<Mutex<Vec<(usize, EventKind)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = ResultSink::new();
        for id in 0..2 {
            let seen = seen.clone();
            sink.add_observer(Arc::new(move |e: &ResultEvent| -> std::result::Result<(), ObserverError> {
                seen.lock().push((id, e.kind()));
                Ok(())
            }));
        }

        let st = status(1, 1);
        sink.start_test_run(None);
        sink.start_test("t", st, None);
        sink.add_error("t", "e", st, None);
        sink.add_failure("t", "f", st, None);
        sink.add_success("t", st, None);
        sink.stop_test("t", st, None);
        sink.add_hit(hit("http://a/", 200, 1, 1));
        sink.socket_open(st, None);
        sink.socket_message(st, 5, None);
        sink.socket_close(st, None);
        sink.stop_test_run(None);

        let expected = [
            EventKind::StartTestRun,
            EventKind::StartTest,
            EventKind::AddError,
            EventKind::AddFailure,
            EventKind::AddSuccess,
            EventKind::StopTest,
            EventKind::AddHit,
            EventKind::SocketOpen,
            EventKind::SocketMessage,
            EventKind::SocketClose,
            EventKind::StopTestRun,
        ];
        let want: Vec<(usize, EventKind)> = expected
            .iter()
            .flat_map(|k| [(0, *k), (1, *k)])
            .collect();
        assert_eq!(*seen.lock(), want);
    }

    #[test]
    fn failing_observer_does_not_stop_the_others() {
        let count = Arc::new(Mutex::new(0u32));
        let sink = ResultSink::new();
        sink.add_observer(Arc::new(|_: &ResultEvent| -> std::result::Result<(), ObserverError> {
            Err("broken pipe".into())
        }));
        {
            let count = count.clone();
            sink.add_observer(Arc::new(move |_: &ResultEvent| -> std::result::Result<(), ObserverError> {
                *count.lock() += 1;
                Ok(())
            }));
        }

        sink.add_success("t", status(1, 1), None);
        sink.add_success("t", status(1, 1), None);
        assert_eq!(*count.lock(), 2);
        assert_eq!(sink.nb_success(None, None), 2);
    }

    #[test]
    fn summary_snapshots_the_queries() {
        let sink = ResultSink::new();
        sink.start_test_run(None);
        invoke(&sink, "t", status(1, 1), "success");
        invoke(&sink, "t", status(1, 1), "failure");
        sink.add_hit(Hit {
            started: SystemTime::now(),
            ..hit("http://a/", 200, 40, 1)
        });
        sink.stop_test_run(None);

        let s = sink.summary();
        assert_eq!(s.tests_total, 1);
        assert_eq!(s.success_total, 1);
        assert_eq!(s.failures_total, 1);
        assert_eq!(s.hits_total, 1);
        assert_eq!(s.urls, vec!["http://a/".to_string()]);
        assert_eq!(s.test_success_rate, Some(0.5));
        assert!(s.has_problems());
        assert!(s.request_time_p50_ms.is_some());
    }
}

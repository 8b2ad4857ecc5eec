use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::{CloseFuture, ResultStream};
use crate::sink::{Observer, ObserverError, ResultEvent};

/// Console echo: a progress bar on stderr that advances once per finished invocation.
pub struct StdoutStream {
    pb: ProgressBar,
    success: AtomicU64,
    failures: AtomicU64,
    errors: AtomicU64,
    hits: AtomicU64,
}

impl StdoutStream {
    pub fn new(total: Option<u64>, progress: bool) -> Self {
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(bar_style());
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(spinner_style());
                pb
            }
        };

        if progress {
            pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
            if total.is_none() {
                pb.enable_steady_tick(Duration::from_millis(120));
            }
        } else {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }

        Self {
            pb,
            success: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Invocations seen finishing so far.
    pub fn completed(&self) -> u64 {
        self.pb.position()
    }

    fn refresh_message(&self) {
        self.pb.set_message(format!(
            "ok={} failures={} errors={} hits={}",
            self.success.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
        ));
    }
}

impl Observer for StdoutStream {
    fn push(&self, event: &ResultEvent) -> Result<(), ObserverError> {
        match event {
            ResultEvent::AddSuccess { .. } => {
                self.success.fetch_add(1, Ordering::Relaxed);
            }
            ResultEvent::AddFailure { .. } => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            ResultEvent::AddError { .. } => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            ResultEvent::AddHit(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
            }
            ResultEvent::StopTest { .. } => {
                self.refresh_message();
                self.pb.inc(1);
            }
            _ => {}
        }
        Ok(())
    }
}

impl ResultStream for StdoutStream {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn close(&self) -> CloseFuture<'_> {
        Box::pin(async move {
            self.refresh_message();
            self.pb.finish_and_clear();
            Ok(())
        })
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{elapsed_precise} [{wide_bar}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {elapsed_precise} {pos} done {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RunStatus;

    #[test]
    fn advances_once_per_finished_invocation() {
        let stream = StdoutStream::new(Some(2), false);
        let status = RunStatus::from((1, 1, 1, 1));
        let events = [
            ResultEvent::StartTest {
                test: "t".into(),
                status,
                worker_id: None,
            },
            ResultEvent::AddFailure {
                test: "t".into(),
                exc_info: "nope".into(),
                status,
                worker_id: None,
            },
            ResultEvent::StopTest {
                test: "t".into(),
                status,
                worker_id: None,
            },
        ];
        for e in &events {
            assert!(stream.push(e).is_ok());
        }

        assert_eq!(stream.completed(), 1);
        assert_eq!(stream.failures.load(Ordering::Relaxed), 1);
    }
}

use std::time::{Duration, Instant};

use super::event::RunStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub test: String,
    pub current_user: u64,
    pub current_cycle: u64,
    pub worker_id: Option<String>,
}

impl BucketKey {
    pub fn new(test: &str, status: &RunStatus, worker_id: Option<&str>) -> Self {
        Self {
            test: test.to_string(),
            current_user: status.current_user,
            current_cycle: status.current_cycle,
            worker_id: worker_id.map(str::to_string),
        }
    }
}

/// Outcomes recorded for one test at one user tier and cycle size.
#[derive(Debug, Clone)]
pub struct TestBucket {
    pub name: String,
    pub start: Instant,
    pub end: Option<Instant>,
    pub current_cycle: u64,
    pub user: u64,
    pub success: u64,
    pub failures: Vec<String>,
    pub errors: Vec<String>,
}

impl TestBucket {
    pub(super) fn new(key: &BucketKey) -> Self {
        Self {
            name: key.test.clone(),
            start: Instant::now(),
            end: None,
            current_cycle: key.current_cycle,
            user: key.current_user,
            success: 0,
            failures: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn finished(&self) -> bool {
        self.end.is_some()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(self.start))
    }

    pub fn outcomes(&self) -> u64 {
        self.success
            .saturating_add(self.failures.len() as u64)
            .saturating_add(self.errors.len() as u64)
    }

    pub fn success_rate(&self) -> Option<f64> {
        match self.outcomes() {
            0 => None,
            total => Some(self.success as f64 / total as f64),
        }
    }

    pub(super) fn matches(&self, name: Option<&str>, cycle: Option<u64>) -> bool {
        name.is_none_or(|n| self.name == n) && cycle.is_none_or(|c| self.current_cycle == c)
    }
}

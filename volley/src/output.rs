use serde::Serialize;
use volley_core::{DistributedReport, RunSummary, WorkloadPlan};

use crate::cli::OutputFormat;

mod human;
mod json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Topology {
    Local,
    Distributed,
}

/// What is about to run.
pub(crate) struct RunHeader<'a> {
    pub scenario: &'a str,
    pub plan: &'a WorkloadPlan,
    pub topology: Topology,
    pub expected_total: u64,
}

/// Coordinator-side counters of a distributed run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AgentTally {
    pub workers: Vec<String>,
    pub received: u64,
    pub completed: u64,
    pub dropped: u64,
}

pub(crate) struct RunReport {
    pub summary: RunSummary,
    pub agents: Option<AgentTally>,
}

impl From<RunSummary> for RunReport {
    fn from(summary: RunSummary) -> Self {
        Self {
            summary,
            agents: None,
        }
    }
}

impl From<DistributedReport> for RunReport {
    fn from(report: DistributedReport) -> Self {
        Self {
            summary: report.summary,
            agents: Some(AgentTally {
                workers: report.workers,
                received: report.received,
                completed: report.completed,
                dropped: report.dropped,
            }),
        }
    }
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, header: &RunHeader<'_>);
    fn print_summary(&self, header: &RunHeader<'_>, report: &RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}

use serde::Serialize;
use std::io::Write as _;

use volley_core::RunSummary;

use super::{AgentTally, OutputFormatter, RunHeader, RunReport, Topology};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _header: &RunHeader<'_>) {}

    fn print_summary(&self, header: &RunHeader<'_>, report: &RunReport) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(header, report))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine<'a> {
    pub kind: &'static str,
    pub scenario: &'a str,
    pub topology: Topology,
    pub users: String,
    pub cycles: String,
    pub agents: Option<u64>,
    pub expected_total: u64,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributed: Option<&'a AgentTally>,
}

fn build_summary_line<'a>(header: &RunHeader<'a>, report: &'a RunReport) -> JsonSummaryLine<'a> {
    JsonSummaryLine {
        kind: "summary",
        scenario: header.scenario,
        topology: header.topology,
        users: header.plan.users_spec(),
        cycles: header.plan.cycles_spec(),
        agents: header.plan.agents(),
        expected_total: header.expected_total,
        summary: &report.summary,
        distributed: report.agents.as_ref(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, line)?;
    writeln!(out)?;
    Ok(())
}

use std::fmt::Write as _;

mod format;

use format::{format_bytes, format_ms_opt, format_percent, format_rate, format_secs};

use super::{OutputFormatter, RunHeader, RunReport, Topology};

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, header: &RunHeader<'_>) {
        print!("{}", render_header(header));
    }

    fn print_summary(&self, _header: &RunHeader<'_>, report: &RunReport) -> anyhow::Result<()> {
        print!("{}", render_summary(report));
        Ok(())
    }
}

fn render_header(header: &RunHeader<'_>) -> String {
    let mut out = String::new();
    writeln!(out, "scenario: {}", header.scenario).ok();
    let agents = match (header.topology, header.plan.agents()) {
        (Topology::Distributed, Some(agents)) => format!(" agents={agents}"),
        _ => String::new(),
    };
    writeln!(
        out,
        "users={} cycles={}{agents} expected={}",
        header.plan.users_spec(),
        header.plan.cycles_spec(),
        header.expected_total
    )
    .ok();
    out.push('\n');
    out
}

fn render_summary(report: &RunReport) -> String {
    let s = &report.summary;
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        out,
        "  tests: {} finished of {} started ({}/s)",
        s.tests_finished,
        s.tests_total,
        format_rate(s.tests_per_sec)
    )
    .ok();
    writeln!(
        out,
        "  outcomes: success={} failures={} errors={}",
        s.success_total, s.failures_total, s.errors_total
    )
    .ok();
    if let Some(rate) = s.test_success_rate {
        writeln!(out, "  success rate: {}", format_percent(rate)).ok();
    }
    if let Some(avg) = s.average_test_duration_secs {
        writeln!(out, "  test duration: avg={}", format_secs(avg)).ok();
    }
    writeln!(out, "  duration: {}s", s.duration_secs).ok();

    if s.hits_total > 0 {
        writeln!(
            out,
            "  hits: {} ({}/s, {} ok)",
            s.hits_total,
            format_rate(s.requests_per_sec),
            format_percent(s.hits_success_rate)
        )
        .ok();
        writeln!(
            out,
            "  latency: avg={} p50={} p90={} p99={}",
            format_secs(s.average_request_time_secs),
            format_ms_opt(s.request_time_p50_ms),
            format_ms_opt(s.request_time_p90_ms),
            format_ms_opt(s.request_time_p99_ms)
        )
        .ok();
        writeln!(
            out,
            "  received: {} over {} url(s)",
            format_bytes(s.socket_bytes_received),
            s.urls.len()
        )
        .ok();
    }

    if let Some(agents) = &report.agents {
        writeln!(
            out,
            "  agents: {} [{}] events={} dropped={}",
            agents.workers.len(),
            agents.workers.join(", "),
            agents.received,
            agents.dropped
        )
        .ok();
    }

    out
}

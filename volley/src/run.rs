use tracing::{info, warn};
use volley_core::{
    CoordinatorConfig, Endpoint, Error, RunContext, ScenarioRegistry, StreamKind, TcpBroker,
    WorkloadPlan, build_stream, run_distributed, run_local,
};

use crate::cli::Invocation;
use crate::exit_codes::ExitCode;
use crate::output::{self, OutputFormatter, RunHeader, RunReport, Topology};
use crate::run_error::RunError;
use crate::scenarios;

/// Endpoint the coordinator listens on when `--stream-remote-endpoint` is not given.
const DEFAULT_COLLECT_ENDPOINT: &str = "tcp://127.0.0.1:7781";

pub async fn run(inv: Invocation) -> Result<ExitCode, RunError> {
    let Some(scenario) = inv.cli.scenario.clone() else {
        return Err(RunError::InvalidInput(anyhow::anyhow!("missing scenario")));
    };

    let plan = WorkloadPlan::parse(&inv.cli.users, &inv.cli.cycles, inv.cli.agents)?;
    let registry = scenarios::registry();
    let out = output::formatter(inv.cli.output);

    if plan.agents().is_some() {
        run_coordinator(&inv, &scenario, plan, &registry, out.as_ref()).await
    } else {
        run_in_process(&inv, &scenario, plan, &registry, out.as_ref()).await
    }
}

async fn run_in_process(
    inv: &Invocation,
    scenario_id: &str,
    plan: WorkloadPlan,
    registry: &ScenarioRegistry,
    out: &dyn OutputFormatter,
) -> Result<ExitCode, RunError> {
    if inv.cli.deadline.is_some() {
        warn!("--deadline only applies to distributed runs; ignoring it");
    }

    let scenario = registry.resolve(scenario_id)?;
    let kind = StreamKind::lookup(&inv.cli.stream)?;
    let expected_total = plan.expected_total()?;

    let mut config = inv.stream_config(kind);
    if kind == StreamKind::Stdout {
        config.set("total", expected_total.to_string());
    }
    let stream = build_stream(kind, &config).await?;
    let ctx = RunContext::new(stream, inv.cli.worker_id.clone());

    let header = RunHeader {
        scenario: scenario_id,
        plan: &plan,
        topology: Topology::Local,
        expected_total,
    };
    out.print_header(&header);

    info!(scenario = scenario_id, stream = %kind, expected_total, "starting local run");
    let summary = run_local(&ctx, &plan, scenario).await?;
    let code = ExitCode::from_summary(&summary);

    out.print_summary(&header, &RunReport::from(summary))
        .map_err(RunError::RuntimeError)?;
    Ok(code)
}

async fn run_coordinator(
    inv: &Invocation,
    scenario_id: &str,
    plan: WorkloadPlan,
    registry: &ScenarioRegistry,
    out: &dyn OutputFormatter,
) -> Result<ExitCode, RunError> {
    if !registry.contains(scenario_id) {
        return Err(Error::UnknownScenario(scenario_id.to_string()).into());
    }

    let broker = TcpBroker::new(inv.cli.broker.parse::<Endpoint>()?);
    let endpoint = match inv
        .stream_config(StreamKind::Remote)
        .endpoint(StreamKind::Remote, "endpoint")?
    {
        Some(endpoint) => endpoint,
        None => DEFAULT_COLLECT_ENDPOINT.parse()?,
    };
    let progress = inv
        .stream_config(StreamKind::Stdout)
        .bool(StreamKind::Stdout, "progress")?
        .unwrap_or(true);
    let expected_total = plan.expected_total()?;

    let header = RunHeader {
        scenario: scenario_id,
        plan: &plan,
        topology: Topology::Distributed,
        expected_total,
    };
    out.print_header(&header);

    info!(
        scenario = scenario_id,
        broker = %broker.endpoint(),
        %endpoint,
        expected_total,
        "starting distributed run"
    );
    let config = CoordinatorConfig {
        scenario: scenario_id.to_string(),
        plan: plan.clone(),
        endpoint,
        deadline: inv.cli.deadline,
        progress,
    };
    let report = run_distributed(config, &broker).await?;
    let code = ExitCode::from_summary(&report.summary);

    out.print_summary(&header, &RunReport::from(report))
        .map_err(RunError::RuntimeError)?;
    Ok(code)
}

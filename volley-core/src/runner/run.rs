use std::sync::Arc;

use tracing::debug;

use super::context::RunContext;
use super::scenario::{InvocationContext, Scenario};
use crate::error::{Error, Result};
use crate::plan::WorkloadPlan;
use crate::sink::{Reporter, RunStatus, RunSummary};

/// Runs `plan` in-process against `scenario`, tier after tier.
///
/// Each tier of `u` users spawns `u` tasks that all walk every cycle size in order. The next tier
/// starts only once every task of the current one has returned.
pub async fn run_local(
    ctx: &RunContext,
    plan: &WorkloadPlan,
    scenario: Arc<dyn Scenario>,
) -> Result<RunSummary> {
    let sink = ctx.sink().clone();
    let cycles: Arc<[u64]> = Arc::from(plan.cycles());

    sink.start_test_run(ctx.worker_id());
    debug!(
        scenario = scenario.name(),
        users = %plan.users_spec(),
        cycles = %plan.cycles_spec(),
        "local run started"
    );

    let mut invocations = 0u64;
    let mut join_error = None;

    for &tier in plan.users() {
        let mut handles = Vec::with_capacity(usize::try_from(tier).unwrap_or(0));
        for user in 1..=tier {
            let scenario = scenario.clone();
            let reporter: Arc<dyn Reporter> = sink.clone();
            let cycles = cycles.clone();
            let worker_id = ctx.shared_worker_id();
            handles.push(tokio::spawn(async move {
                virtual_user(scenario, reporter, &cycles, tier, user, worker_id).await
            }));
        }

        // Every sibling finishes before a panic is surfaced.
        for h in handles {
            match h.await {
                Ok(n) => invocations += n,
                Err(err) => {
                    join_error.get_or_insert(err);
                }
            }
        }
        if join_error.is_some() {
            break;
        }
        debug!(tier, "tier finished");
    }

    sink.stop_test_run(ctx.worker_id());
    let closed = ctx.close().await;

    if let Some(err) = join_error {
        return Err(Error::Join(err));
    }
    closed?;

    debug!(invocations, "local run finished");
    Ok(sink.summary())
}

async fn virtual_user(
    scenario: Arc<dyn Scenario>,
    reporter: Arc<dyn Reporter>,
    cycles: &[u64],
    tier: u64,
    user: u64,
    worker_id: Option<Arc<str>>,
) -> u64 {
    let mut done = 0;
    for &cycle_size in cycles {
        for cycle in 1..=cycle_size {
            let ctx = InvocationContext {
                status: RunStatus {
                    cycle,
                    user,
                    current_cycle: cycle_size,
                    current_user: tier,
                },
                worker_id: worker_id.clone(),
            };
            scenario.invoke(ctx, reporter.clone()).await;
            done += 1;
            tokio::task::yield_now().await;
        }
    }
    done
}

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::broker::{Broker, DispatchRequest};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::plan::WorkloadPlan;
use crate::runner::RunContext;
use crate::sink::{ResultEvent, ResultSink, RunSummary};
use crate::stream::StdoutStream;

const CHANNEL_CAPACITY: usize = 1024;

/// How long agents get to send their trailing events and hang up once the run is complete.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub scenario: String,
    pub plan: WorkloadPlan,
    /// Where agents stream their results. Port `0` picks a free port.
    pub endpoint: Endpoint,
    pub deadline: Option<Duration>,
    pub progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveTally {
    /// Non-empty lines read from agents.
    pub received: u64,
    /// `stopTest` events applied.
    pub completed: u64,
    /// Lines that did not decode as an event.
    pub dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributedReport {
    pub summary: RunSummary,
    pub received: u64,
    pub completed: u64,
    pub dropped: u64,
    pub workers: Vec<String>,
}

/// Dispatches `config.scenario` through `broker` and aggregates what the agents send back until
/// every expected invocation has completed.
pub async fn run_distributed(
    config: CoordinatorConfig,
    broker: &dyn Broker,
) -> Result<DistributedReport> {
    let expected = config.plan.expected_total()?;

    let listener = TcpListener::bind(config.endpoint.authority())
        .await
        .map_err(|source| Error::Bind {
            endpoint: config.endpoint.to_string(),
            source,
        })?;
    let endpoint = config.endpoint.with_port(listener.local_addr()?.port());
    debug!(%endpoint, expected, "coordinator listening");

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (stop_tx, stop_rx) = oneshot::channel();
    let acceptor = tokio::spawn(accept_agents(listener, tx, stop_rx));

    let echo = StdoutStream::new(Some(expected), config.progress);
    let ctx = RunContext::new(Arc::new(echo), None);

    let request = DispatchRequest {
        scenario: config.scenario.clone(),
        plan: config.plan.clone(),
        endpoint: endpoint.to_string(),
    };
    let workers = match broker.dispatch(request).await {
        Ok(workers) => workers,
        Err(err) => {
            acceptor.abort();
            return Err(err);
        }
    };

    ctx.sink().start_test_run(None);
    let mut tally = ReceiveTally::default();
    let received =
        receive_events(ctx.sink(), &mut rx, expected, config.deadline, &mut tally).await;
    ctx.sink().stop_test_run(None);
    if received.is_ok() {
        let _ = stop_tx.send(());
        drain_agents(ctx.sink(), &mut rx, DRAIN_GRACE, &mut tally).await;
    }
    acceptor.abort();
    ctx.close().await?;
    received?;

    debug!(?tally, "distributed run finished");
    Ok(DistributedReport {
        summary: ctx.sink().summary(),
        received: tally.received,
        completed: tally.completed,
        dropped: tally.dropped,
        workers,
    })
}

/// Applies inbound event lines to `sink` until `expected` invocations have completed.
///
/// Agents' run start/stop events are only forwarded to observers; the run timestamps belong to
/// the caller. `tally` stays readable after a deadline or a closed channel.
pub async fn receive_events(
    sink: &ResultSink,
    rx: &mut mpsc::Receiver<String>,
    expected: u64,
    deadline: Option<Duration>,
    tally: &mut ReceiveTally,
) -> Result<()> {
    let Some(deadline) = deadline else {
        return consume(sink, rx, expected, tally).await;
    };

    let res = tokio::time::timeout(deadline, consume(sink, rx, expected, tally)).await;
    match res {
        Ok(res) => res,
        Err(_) => Err(Error::DeadlineExceeded {
            completed: tally.completed,
            expected,
        }),
    }
}

async fn consume(
    sink: &ResultSink,
    rx: &mut mpsc::Receiver<String>,
    expected: u64,
    tally: &mut ReceiveTally,
) -> Result<()> {
    while tally.completed < expected {
        let Some(line) = rx.recv().await else {
            return Err(Error::StreamClosed {
                completed: tally.completed,
                expected,
            });
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tally.received += 1;

        let event = match ResultEvent::from_json(line) {
            Ok(event) => event,
            Err(err) => {
                tally.dropped += 1;
                warn!(error = %err, line, "dropping malformed event");
                continue;
            }
        };

        match event {
            ResultEvent::StartTestRun { .. } | ResultEvent::StopTestRun { .. } => {
                sink.forward(&event);
            }
            ResultEvent::StopTest { .. } => {
                sink.apply(event);
                tally.completed += 1;
            }
            event => sink.apply(event),
        }
    }
    Ok(())
}

/// Reads what agents still send after the last completion until every connection is closed or
/// `grace` runs out. Agent run events still reach observers; anything else is counted and ignored.
async fn drain_agents(
    sink: &ResultSink,
    rx: &mut mpsc::Receiver<String>,
    grace: Duration,
    tally: &mut ReceiveTally,
) {
    let drain = async {
        while let Some(line) = rx.recv().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tally.received += 1;
            match ResultEvent::from_json(line) {
                Ok(event) => match event {
                    ResultEvent::StartTestRun { .. } | ResultEvent::StopTestRun { .. } => {
                        sink.forward(&event);
                    }
                    _ => debug!(event = %event.kind(), "ignoring event after completion"),
                },
                Err(err) => {
                    tally.dropped += 1;
                    warn!(error = %err, line, "dropping malformed event");
                }
            }
        }
    };
    if tokio::time::timeout(grace, drain).await.is_err() {
        debug!(?grace, "agents still connected after the grace period");
    }
}

async fn accept_agents(
    listener: TcpListener,
    tx: mpsc::Sender<String>,
    mut stop: oneshot::Receiver<()>,
) {
    // Dropping the set when this task is aborted also aborts every reader.
    let mut readers = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    debug!(%peer, "agent connected");
                    readers.spawn(read_lines(socket, tx.clone()));
                }
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    break;
                }
            },
            Some(_) = readers.join_next(), if !readers.is_empty() => {}
        }
    }
    drop(tx);
    while readers.join_next().await.is_some() {}
}

async fn read_lines(socket: TcpStream, tx: mpsc::Sender<String>) {
    let peer = socket.peer_addr().ok();
    let mut lines = BufReader::new(socket).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!(?peer, "agent disconnected");
                break;
            }
            Err(err) => {
                warn!(?peer, error = %err, "agent connection failed");
                break;
            }
        }
    }
}

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};
use volley_core::Endpoint;
use volley_core::distributed::{BrokerReply, DispatchRequest};

/// What the broker does with a dispatch request.
#[derive(Debug, Clone)]
pub enum BrokerMode {
    /// Spawn one agent process per requested agent.
    Spawn { exe: PathBuf },
    /// Refuse every request with this reason.
    Reject(String),
}

#[derive(Default)]
struct Shared {
    requests: Vec<DispatchRequest>,
    agents: Vec<Child>,
}

/// A local broker speaking the one-line JSON dispatch protocol.
pub struct TestBroker {
    endpoint: Endpoint,
    shared: Arc<Mutex<Shared>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestBroker {
    pub async fn start(mode: BrokerMode) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = Endpoint::from(listener.local_addr()?);
        let shared = Arc::new(Mutex::new(Shared::default()));

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = {
            let shared = shared.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        accepted = listener.accept() => match accepted {
                            Ok((socket, _)) => {
                                if let Err(err) = serve(socket, &mode, &shared).await {
                                    warn!(error = %err, "dispatch connection failed");
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "broker accept failed");
                                break;
                            }
                        },
                    }
                }
            })
        };

        Ok(Self {
            endpoint,
            shared,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub async fn spawning(exe: impl Into<PathBuf>) -> std::io::Result<Self> {
        Self::start(BrokerMode::Spawn { exe: exe.into() }).await
    }

    pub async fn rejecting(reason: impl Into<String>) -> std::io::Result<Self> {
        Self::start(BrokerMode::Reject(reason.into())).await
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<DispatchRequest> {
        self.shared.lock().await.requests.clone()
    }

    /// Waits for every spawned agent to exit.
    pub async fn wait_agents(&self) -> std::io::Result<Vec<ExitStatus>> {
        let agents = std::mem::take(&mut self.shared.lock().await.agents);
        let mut statuses = Vec::with_capacity(agents.len());
        for mut agent in agents {
            statuses.push(agent.wait().await?);
        }
        Ok(statuses)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}

async fn serve(
    socket: TcpStream,
    mode: &BrokerMode,
    shared: &Mutex<Shared>,
) -> anyhow::Result<()> {
    let (read, mut write) = socket.into_split();
    let mut line = String::new();
    BufReader::new(read).read_line(&mut line).await?;

    let reply = match serde_json::from_str::<DispatchRequest>(line.trim()) {
        Ok(request) => dispatch(request, mode, shared).await,
        Err(err) => BrokerReply::Rejected {
            reason: format!("invalid request: {err}"),
        },
    };

    let mut out = serde_json::to_string(&reply)?;
    out.push('\n');
    write.write_all(out.as_bytes()).await?;
    write.shutdown().await?;
    Ok(())
}

async fn dispatch(
    request: DispatchRequest,
    mode: &BrokerMode,
    shared: &Mutex<Shared>,
) -> BrokerReply {
    let mut shared = shared.lock().await;
    shared.requests.push(request.clone());

    let exe = match mode {
        BrokerMode::Reject(reason) => {
            return BrokerReply::Rejected {
                reason: reason.clone(),
            };
        }
        BrokerMode::Spawn { exe } => exe,
    };

    let agents = request.plan.agents().unwrap_or(1);
    let mut workers = Vec::new();
    for n in 1..=agents {
        let worker_id = format!("agent-{n}");
        let spawned = Command::new(exe)
            .arg(&request.scenario)
            .args(["-u", request.plan.users_spec().as_str()])
            .args(["-c", request.plan.cycles_spec().as_str()])
            .args(["--stream", "remote"])
            .args(["--stream-remote-endpoint", request.endpoint.as_str()])
            .args(["--stream-remote-connect-timeout", "10s"])
            .args(["--worker-id", worker_id.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                debug!(%worker_id, scenario = %request.scenario, "agent spawned");
                shared.agents.push(child);
                workers.push(worker_id);
            }
            Err(err) => {
                return BrokerReply::Rejected {
                    reason: format!("failed to spawn {}: {err}", exe.display()),
                };
            }
        }
    }

    BrokerReply::Dispatched { workers }
}

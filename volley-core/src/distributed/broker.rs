use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::plan::WorkloadPlan;

/// Asks the broker to start `plan.agents()` agents running `scenario` and streaming results to
/// `endpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub scenario: String,
    pub plan: WorkloadPlan,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum BrokerReply {
    Dispatched { workers: Vec<String> },
    Rejected { reason: String },
}

impl BrokerReply {
    pub fn into_workers(self) -> Result<Vec<String>> {
        match self {
            Self::Dispatched { workers } => Ok(workers),
            Self::Rejected { reason } => Err(Error::BrokerRejected(reason)),
        }
    }
}

pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

/// Fans a scenario out to agents. Returns the dispatched worker ids.
pub trait Broker: Send + Sync {
    fn dispatch(&self, request: DispatchRequest) -> DispatchFuture<'_>;
}

/// A broker reached over TCP: one JSON request line, one JSON reply line.
#[derive(Debug, Clone)]
pub struct TcpBroker {
    endpoint: Endpoint,
    timeout: Duration,
}

impl TcpBroker {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn exchange(&self, request: &DispatchRequest) -> Result<BrokerReply> {
        let unreachable = |source| Error::BrokerUnreachable {
            endpoint: self.endpoint.to_string(),
            source,
        };

        let socket = TcpStream::connect(self.endpoint.authority())
            .await
            .map_err(unreachable)?;
        let (read, mut write) = socket.into_split();

        let mut line = serde_json::to_string(request)
            .map_err(|err| Error::BrokerProtocol(format!("encode request: {err}")))?;
        line.push('\n');
        write.write_all(line.as_bytes()).await.map_err(unreachable)?;
        write.flush().await.map_err(unreachable)?;

        let mut reply = String::new();
        let n = BufReader::new(read)
            .read_line(&mut reply)
            .await
            .map_err(unreachable)?;
        if n == 0 {
            return Err(Error::BrokerProtocol(
                "connection closed without a reply".to_string(),
            ));
        }

        serde_json::from_str(reply.trim())
            .map_err(|err| Error::BrokerProtocol(format!("{err}: `{}`", reply.trim())))
    }
}

impl Broker for TcpBroker {
    fn dispatch(&self, request: DispatchRequest) -> DispatchFuture<'_> {
        Box::pin(async move {
            debug!(broker = %self.endpoint, scenario = %request.scenario, "dispatching run");
            let reply = match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
                Ok(reply) => reply?,
                Err(_) => {
                    return Err(Error::BrokerUnreachable {
                        endpoint: self.endpoint.to_string(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("no reply after {:?}", self.timeout),
                        ),
                    });
                }
            };
            let workers = reply.into_workers()?;
            debug!(workers = workers.len(), "run dispatched");
            Ok(workers)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn request() -> DispatchRequest {
        let plan = match WorkloadPlan::new(vec![1], vec![2], Some(2)) {
            Ok(plan) => plan,
            Err(err) => panic!("plan: {err}"),
        };
        DispatchRequest {
            scenario: "noop".to_string(),
            plan,
            endpoint: "tcp://127.0.0.1:7781".to_string(),
        }
    }

    type Seen = tokio::task::JoinHandle<anyhow::Result<DispatchRequest>>;

    async fn one_shot_broker(reply: &'static str) -> anyhow::Result<(Endpoint, Seen)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = Endpoint::from(listener.local_addr()?);
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await?;
            let (read, mut write) = socket.into_split();
            let mut line = String::new();
            BufReader::new(read).read_line(&mut line).await?;
            write.write_all(reply.as_bytes()).await?;
            Ok(serde_json::from_str(line.trim())?)
        });
        Ok((endpoint, handle))
    }

    #[test]
    fn reply_wire_shape() -> anyhow::Result<()> {
        let ok: BrokerReply =
            serde_json::from_str(r#"{"result":"dispatched","workers":["a","b"]}"#)?;
        assert_eq!(ok.into_workers()?, vec!["a".to_string(), "b".to_string()]);

        let rejected: BrokerReply =
            serde_json::from_str(r#"{"result":"rejected","reason":"no agents"}"#)?;
        assert!(matches!(
            rejected.into_workers(),
            Err(Error::BrokerRejected(reason)) if reason == "no agents"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn dispatch_sends_request_and_returns_workers() -> anyhow::Result<()> {
        let (endpoint, broker) =
            one_shot_broker("{\"result\":\"dispatched\",\"workers\":[\"agent-1\"]}\n").await?;
        let workers = TcpBroker::new(endpoint).dispatch(request()).await?;
        assert_eq!(workers, vec!["agent-1".to_string()]);

        let seen = broker.await??;
        assert_eq!(seen, request());
        Ok(())
    }

    #[tokio::test]
    async fn rejected_and_garbled_replies_are_errors() -> anyhow::Result<()> {
        let (endpoint, _broker) =
            one_shot_broker("{\"result\":\"rejected\",\"reason\":\"busy\"}\n").await?;
        let res = TcpBroker::new(endpoint).dispatch(request()).await;
        assert!(matches!(res, Err(Error::BrokerRejected(reason)) if reason == "busy"));

        let (endpoint, _broker) = one_shot_broker("hello\n").await?;
        let res = TcpBroker::new(endpoint).dispatch(request()).await;
        assert!(matches!(res, Err(Error::BrokerProtocol(_))));
        Ok(())
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = Endpoint::from(listener.local_addr()?);
        drop(listener);

        let res = TcpBroker::new(endpoint).dispatch(request()).await;
        assert!(matches!(res, Err(Error::BrokerUnreachable { .. })));
        Ok(())
    }
}

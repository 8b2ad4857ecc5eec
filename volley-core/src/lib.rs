mod endpoint;
mod error;

pub mod distributed;
pub mod plan;
pub mod runner;
pub mod sink;
pub mod stream;

pub use distributed::{Broker, CoordinatorConfig, DistributedReport, TcpBroker, run_distributed};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use plan::{Workload, WorkloadPlan, compute};
pub use runner::{
    InvocationContext, Outcome, RunContext, Scenario, ScenarioRegistry, TestCase, run_local,
};
pub use sink::{
    Hit, Observer, ObserverError, Reporter, ResultEvent, ResultSink, RunStatus, RunSummary,
};
pub use stream::{ResultStream, StreamConfig, StreamKind, build_stream};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`users` must be a colon-separated list of positive integers (got `{0}`)")]
    InvalidUsers(String),

    #[error("`cycles` must be a colon-separated list of positive integers (got `{0}`)")]
    InvalidCycles(String),

    #[error("`agents` must be a positive integer")]
    InvalidAgents,

    #[error("workload plan is too large to count")]
    PlanOverflow,

    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),

    #[error("unknown stream `{0}` (expected one of: {1})")]
    UnknownStream(String, String),

    #[error("invalid value `{value}` for stream option `{stream}.{option}`: {reason}")]
    InvalidStreamOption {
        stream: &'static str,
        option: String,
        value: String,
        reason: String,
    },

    #[error("invalid endpoint `{0}` (expected tcp://host:port)")]
    InvalidEndpoint(String),

    #[error("failed to bind `{endpoint}`: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to `{endpoint}`: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("broker `{endpoint}` is unreachable: {source}")]
    BrokerUnreachable {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("broker rejected the run: {0}")]
    BrokerRejected(String),

    #[error("invalid broker reply: {0}")]
    BrokerProtocol(String),

    #[error("deadline exceeded after {completed}/{expected} completed invocations")]
    DeadlineExceeded { completed: u64, expected: u64 },

    #[error("result stream closed before the run completed ({completed}/{expected})")]
    StreamClosed { completed: u64, expected: u64 },

    #[error("test run has not been started")]
    RunNotStarted,
}

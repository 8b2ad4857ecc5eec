use volley_core::Error;

use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<Error> for RunError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidUsers(_)
            | Error::InvalidCycles(_)
            | Error::InvalidAgents
            | Error::PlanOverflow
            | Error::UnknownScenario(_)
            | Error::UnknownStream(..)
            | Error::InvalidStreamOption { .. }
            | Error::InvalidEndpoint(_) => Self::InvalidInput(err.into()),
            Error::Io(_)
            | Error::Join(_)
            | Error::Bind { .. }
            | Error::Connect { .. }
            | Error::BrokerUnreachable { .. }
            | Error::BrokerRejected(_)
            | Error::BrokerProtocol(_)
            | Error::DeadlineExceeded { .. }
            | Error::StreamClosed { .. }
            | Error::RunNotStarted => Self::RuntimeError(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

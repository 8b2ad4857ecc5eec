#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// The run finished, but at least one invocation reported a failure or an error.
    ProblemsRecorded = 10,

    /// Invalid CLI/config (bad flags, bad plan, unknown scenario or stream, bad endpoint).
    InvalidInput = 30,

    /// Transport, broker, deadline or task failures.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_summary(summary: &volley_core::RunSummary) -> Self {
        if summary.has_problems() {
            Self::ProblemsRecorded
        } else {
            Self::Success
        }
    }
}

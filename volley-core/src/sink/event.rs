use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// The `(cycle, user, current_cycle, current_user)` tuple attached to every invocation.
///
/// `cycle` and `user` are 1-based positions inside the current cycle and tier, `current_cycle`
/// is the cycle size being executed and `current_user` is the tier size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u64, u64, u64, u64)", into = "(u64, u64, u64, u64)")]
pub struct RunStatus {
    pub cycle: u64,
    pub user: u64,
    pub current_cycle: u64,
    pub current_user: u64,
}

impl From<(u64, u64, u64, u64)> for RunStatus {
    fn from((cycle, user, current_cycle, current_user): (u64, u64, u64, u64)) -> Self {
        Self {
            cycle,
            user,
            current_cycle,
            current_user,
        }
    }
}

impl From<RunStatus> for (u64, u64, u64, u64) {
    fn from(s: RunStatus) -> Self {
        (s.cycle, s.user, s.current_cycle, s.current_user)
    }
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub url: String,
    pub method: String,
    pub http_status: u16,
    #[serde(with = "epoch_secs")]
    pub started: SystemTime,
    #[serde(with = "secs_f64")]
    pub elapsed: Duration,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
}

impl Hit {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.http_status)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum EventKind {
    #[strum(serialize = "startTestRun")]
    StartTestRun,
    #[strum(serialize = "stopTestRun")]
    StopTestRun,
    #[strum(serialize = "startTest")]
    StartTest,
    #[strum(serialize = "stopTest")]
    StopTest,
    #[strum(serialize = "addError")]
    AddError,
    #[strum(serialize = "addFailure")]
    AddFailure,
    #[strum(serialize = "addSuccess")]
    AddSuccess,
    #[strum(serialize = "add_hit")]
    AddHit,
    #[strum(serialize = "socket_open")]
    SocketOpen,
    #[strum(serialize = "socket_close")]
    SocketClose,
    #[strum(serialize = "socket_message")]
    SocketMessage,
}

/// A mutating call on the result sink, in the shape it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ResultEvent {
    #[serde(rename = "startTestRun")]
    StartTestRun {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "stopTestRun")]
    StopTestRun {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "startTest")]
    StartTest {
        test: String,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "stopTest")]
    StopTest {
        test: String,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "addError")]
    AddError {
        test: String,
        exc_info: String,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "addFailure")]
    AddFailure {
        test: String,
        exc_info: String,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "addSuccess")]
    AddSuccess {
        test: String,
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "add_hit")]
    AddHit(Hit),
    #[serde(rename = "socket_open")]
    SocketOpen {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "socket_close")]
    SocketClose {
        status: RunStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    #[serde(rename = "socket_message")]
    SocketMessage {
        status: RunStatus,
        size: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
}

impl ResultEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StartTestRun { .. } => EventKind::StartTestRun,
            Self::StopTestRun { .. } => EventKind::StopTestRun,
            Self::StartTest { .. } => EventKind::StartTest,
            Self::StopTest { .. } => EventKind::StopTest,
            Self::AddError { .. } => EventKind::AddError,
            Self::AddFailure { .. } => EventKind::AddFailure,
            Self::AddSuccess { .. } => EventKind::AddSuccess,
            Self::AddHit(_) => EventKind::AddHit,
            Self::SocketOpen { .. } => EventKind::SocketOpen,
            Self::SocketClose { .. } => EventKind::SocketClose,
            Self::SocketMessage { .. } => EventKind::SocketMessage,
        }
    }

    pub fn worker_id(&self) -> Option<&str> {
        match self {
            Self::StartTestRun { worker_id }
            | Self::StopTestRun { worker_id }
            | Self::StartTest { worker_id, .. }
            | Self::StopTest { worker_id, .. }
            | Self::AddError { worker_id, .. }
            | Self::AddFailure { worker_id, .. }
            | Self::AddSuccess { worker_id, .. }
            | Self::SocketOpen { worker_id, .. }
            | Self::SocketClose { worker_id, .. }
            | Self::SocketMessage { worker_id, .. } => worker_id.as_deref(),
            Self::AddHit(hit) => hit.worker_id.as_deref(),
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn from_json(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }
}

mod epoch_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        s.serialize_f64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs)
            .map(|d| UNIX_EPOCH + d)
            .map_err(serde::de::Error::custom)
    }
}

mod secs_f64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

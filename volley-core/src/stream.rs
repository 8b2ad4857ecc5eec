mod remote;
mod stdout;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator as _;

pub use remote::RemoteStream;
pub use stdout::StdoutStream;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::sink::Observer;

pub type CloseFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Where result events go for the duration of a run.
///
/// Exactly one stream is active per run; it is registered as the first observer of the run's
/// result sink.
pub trait ResultStream: Observer {
    fn name(&self) -> &'static str;

    /// Flushes pending output. Called once, after the last event.
    fn close(&self) -> CloseFuture<'_>;
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Str,
    Int,
    Bool,
    Duration,
}

/// One declared stream option: `(help, type, default, exposed on the CLI)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOption {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: OptionKind,
    pub default: Option<&'static str>,
    pub cli: bool,
}

const STDOUT_OPTIONS: &[StreamOption] = &[
    StreamOption {
        name: "total",
        help: "Expected number of invocations, used for progress display",
        kind: OptionKind::Int,
        default: None,
        cli: false,
    },
    StreamOption {
        name: "progress",
        help: "Render a progress bar on stderr",
        kind: OptionKind::Bool,
        default: Some("true"),
        cli: true,
    },
];

const REMOTE_OPTIONS: &[StreamOption] = &[
    StreamOption {
        name: "endpoint",
        help: "Endpoint receiving result events",
        kind: OptionKind::Str,
        default: Some("tcp://127.0.0.1:7781"),
        cli: true,
    },
    StreamOption {
        name: "connect-timeout",
        help: "How long to wait for the endpoint to accept the connection",
        kind: OptionKind::Duration,
        default: Some("5s"),
        cli: true,
    },
];

impl StreamKind {
    pub fn options(self) -> &'static [StreamOption] {
        match self {
            Self::Stdout => STDOUT_OPTIONS,
            Self::Remote => REMOTE_OPTIONS,
        }
    }

    pub fn option(self, name: &str) -> Option<&'static StreamOption> {
        self.options().iter().find(|o| o.name == name)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    pub fn names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Self::iter().map(<&'static str>::from).collect();
        names.sort_unstable();
        names
    }

    pub fn lookup(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| Error::UnknownStream(name.to_string(), Self::names().join(", ")))
    }
}

/// Raw option values for one stream, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    values: BTreeMap<String, String>,
}

impl StreamConfig {
    pub fn set(&mut self, option: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(option.to_string(), value.into());
        self
    }

    pub fn with(mut self, option: &str, value: impl Into<String>) -> Self {
        self.set(option, value);
        self
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.values.get(option).map(String::as_str)
    }

    fn raw(&self, option: &'static StreamOption) -> Option<&str> {
        self.get(option.name).or(option.default)
    }

    fn validate(&self, kind: StreamKind) -> Result<()> {
        for (name, value) in &self.values {
            let option = kind.option(name).ok_or_else(|| Error::InvalidStreamOption {
                stream: kind.into(),
                option: name.clone(),
                value: value.clone(),
                reason: "unknown option".to_string(),
            })?;
            parse_value(kind, option, value)?;
        }
        Ok(())
    }

    fn value(&self, kind: StreamKind, name: &str) -> Result<Option<OptionValue>> {
        let Some(option) = kind.option(name) else {
            return Ok(None);
        };
        self.raw(option)
            .map(|v| parse_value(kind, option, v))
            .transpose()
    }

    pub fn int(&self, kind: StreamKind, name: &str) -> Result<Option<u64>> {
        Ok(match self.value(kind, name)? {
            Some(OptionValue::Int(v)) => Some(v),
            _ => None,
        })
    }

    pub fn bool(&self, kind: StreamKind, name: &str) -> Result<Option<bool>> {
        Ok(match self.value(kind, name)? {
            Some(OptionValue::Bool(v)) => Some(v),
            _ => None,
        })
    }

    pub fn duration(&self, kind: StreamKind, name: &str) -> Result<Option<Duration>> {
        Ok(match self.value(kind, name)? {
            Some(OptionValue::Duration(v)) => Some(v),
            _ => None,
        })
    }

    pub fn endpoint(&self, kind: StreamKind, name: &str) -> Result<Option<Endpoint>> {
        match self.value(kind, name)? {
            Some(OptionValue::Str(v)) => v.parse().map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OptionValue {
    Str(String),
    Int(u64),
    Bool(bool),
    Duration(Duration),
}

fn parse_value(kind: StreamKind, option: &StreamOption, value: &str) -> Result<OptionValue> {
    let invalid = |reason: &str| Error::InvalidStreamOption {
        stream: kind.into(),
        option: option.name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    match option.kind {
        OptionKind::Str => Ok(OptionValue::Str(value.to_string())),
        OptionKind::Int => value
            .trim()
            .parse()
            .map(OptionValue::Int)
            .map_err(|_| invalid("expected a non-negative integer")),
        OptionKind::Bool => match value.trim() {
            "true" | "1" | "yes" | "on" => Ok(OptionValue::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(OptionValue::Bool(false)),
            _ => Err(invalid("expected true or false")),
        },
        OptionKind::Duration => humantime::parse_duration(value.trim())
            .map(OptionValue::Duration)
            .map_err(|_| invalid("expected a duration such as 5s or 250ms")),
    }
}

/// Builds the stream selected for this run.
pub async fn build_stream(kind: StreamKind, config: &StreamConfig) -> Result<Arc<dyn ResultStream>> {
    config.validate(kind)?;

    match kind {
        StreamKind::Stdout => {
            let total = config.int(kind, "total")?;
            let progress = config.bool(kind, "progress")?.unwrap_or(true);
            Ok(Arc::new(StdoutStream::new(total, progress)))
        }
        StreamKind::Remote => {
            let endpoint = config
                .endpoint(kind, "endpoint")?
                .ok_or_else(|| Error::InvalidEndpoint(String::new()))?;
            let timeout = config
                .duration(kind, "connect-timeout")?
                .unwrap_or(Duration::from_secs(5));
            Ok(Arc::new(RemoteStream::connect(&endpoint, timeout).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stream_declares_its_schema() {
        assert_eq!(StreamKind::names(), vec!["remote", "stdout"]);
        assert!(StreamKind::Stdout.option("total").is_some_and(|o| !o.cli));
        assert!(StreamKind::Stdout.option("progress").is_some_and(|o| o.cli));
        assert_eq!(
            StreamKind::Remote.option("endpoint").and_then(|o| o.default),
            Some("tcp://127.0.0.1:7781")
        );
    }

    #[test]
    fn lookup_rejects_unknown_streams() {
        assert!(matches!(StreamKind::lookup("stdout"), Ok(StreamKind::Stdout)));
        assert!(matches!(
            StreamKind::lookup("zmq"),
            Err(Error::UnknownStream(name, _)) if name == "zmq"
        ));
    }

    #[test]
    fn values_are_checked_against_the_schema() {
        let bad_bool = StreamConfig::default().with("progress", "maybe");
        assert!(matches!(
            bad_bool.validate(StreamKind::Stdout),
            Err(Error::InvalidStreamOption { .. })
        ));

        let unknown = StreamConfig::default().with("color", "true");
        assert!(unknown.validate(StreamKind::Stdout).is_err());

        let ok = StreamConfig::default()
            .with("total", "12")
            .with("progress", "off");
        assert!(ok.validate(StreamKind::Stdout).is_ok());
        assert!(matches!(ok.int(StreamKind::Stdout, "total"), Ok(Some(12))));
        assert!(matches!(
            ok.bool(StreamKind::Stdout, "progress"),
            Ok(Some(false))
        ));
    }

    #[test]
    fn defaults_fill_missing_values() {
        let cfg = StreamConfig::default();
        assert!(matches!(
            cfg.duration(StreamKind::Remote, "connect-timeout"),
            Ok(Some(d)) if d == Duration::from_secs(5)
        ));
        assert!(matches!(cfg.int(StreamKind::Stdout, "total"), Ok(None)));
    }

    #[tokio::test]
    async fn stdout_stream_builds_without_a_terminal() {
        let cfg = StreamConfig::default().with("progress", "false");
        let stream = match build_stream(StreamKind::Stdout, &cfg).await {
            Ok(v) => v,
            Err(err) => panic!("build failed: {err}"),
        };
        assert_eq!(stream.name(), "stdout");
        assert!(stream.close().await.is_ok());
    }
}

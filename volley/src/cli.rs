use std::collections::HashMap;
use std::ffi::OsString;
use std::time::Duration;

use clap::{Arg, ArgMatches, CommandFactory as _, FromArgMatches as _, Parser};
use volley_core::stream::{OptionKind, StreamOption};
use volley_core::{StreamConfig, StreamKind};

fn parse_duration(input: &str) -> Result<Duration, String> {
    humantime::parse_duration(input.trim())
        .map_err(|_| format!("invalid duration '{input}' (expected e.g. 10s, 250ms, 1m)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// One JSON summary line (NDJSON) on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "volley",
    author,
    version,
    about = "Drive a scenario as many concurrent virtual users, locally or across agents",
    long_about = "volley runs a scenario as concurrent virtual users.\n\nEach entry of --users is a tier: tiers run one after another, and every virtual user of a tier runs the scenario once per step of every --cycles entry.\n\nWith --agents the run is distributed: a broker starts the scenario on remote agents, which stream their results back to this process.",
    after_help = "Examples:\n  volley noop -u 1:5:10 -c 10:20\n  volley http-get -u 50 -c 100 --output json\n  volley http-get -u 10 -c 10 -a 4 -b tcp://broker:7780 --stream-remote-endpoint tcp://0.0.0.0:7781\n\nScenarios: noop, sleep, fail, error, http-get"
)]
pub struct Cli {
    /// Scenario to run
    pub scenario: Option<String>,

    /// User tiers, colon separated (e.g. 1:10:50)
    #[arg(short = 'u', long, default_value = "1")]
    pub users: String,

    /// Cycle sizes, colon separated (e.g. 10:100)
    #[arg(short = 'c', long, default_value = "1")]
    pub cycles: String,

    /// Number of agents; selects a distributed run
    #[arg(short = 'a', long)]
    pub agents: Option<u64>,

    /// Broker endpoint used by distributed runs
    #[arg(short = 'b', long, default_value = "tcp://127.0.0.1:7780")]
    pub broker: String,

    /// Result stream for local runs
    #[arg(long, default_value = "stdout")]
    pub stream: String,

    /// Identity stamped on every result event (set by brokers when starting agents)
    #[arg(long, env = "VOLLEY_WORKER_ID")]
    pub worker_id: Option<String>,

    /// Give up on a distributed run after this long (e.g. 30s, 5m)
    #[arg(long, value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

/// Parsed command line: the static flags plus the per-stream options.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    streams: HashMap<StreamKind, StreamConfig>,
}

impl Invocation {
    pub fn stream_config(&self, kind: StreamKind) -> StreamConfig {
        self.streams.get(&kind).cloned().unwrap_or_default()
    }
}

fn stream_flag(kind: StreamKind, option: &StreamOption) -> String {
    format!("stream-{kind}-{}", option.name)
}

fn value_name(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::Str => "VALUE",
        OptionKind::Int => "N",
        OptionKind::Bool => "BOOL",
        OptionKind::Duration => "DURATION",
    }
}

fn cli_options() -> impl Iterator<Item = (StreamKind, &'static StreamOption)> {
    StreamKind::all().flat_map(|kind| {
        kind.options()
            .iter()
            .filter(|option| option.cli)
            .map(move |option| (kind, option))
    })
}

/// The full command, including one `--stream-<name>-<option>` flag per exposed stream option.
pub fn command() -> clap::Command {
    cli_options().fold(Cli::command(), |cmd, (kind, option)| {
        let flag = stream_flag(kind, option);
        let help = match option.default {
            Some(default) => format!("{} [default: {default}]", option.help),
            None => option.help.to_string(),
        };
        cmd.arg(
            Arg::new(flag.clone())
                .long(flag)
                .value_name(value_name(option.kind))
                .value_parser(clap::value_parser!(String))
                .help(help)
                .help_heading("Stream options"),
        )
    })
}

fn stream_configs(matches: &ArgMatches) -> HashMap<StreamKind, StreamConfig> {
    let mut streams: HashMap<StreamKind, StreamConfig> = HashMap::new();
    for (kind, option) in cli_options() {
        if let Some(value) = matches.get_one::<String>(&stream_flag(kind, option)) {
            streams
                .entry(kind)
                .or_default()
                .set(option.name, value.clone());
        }
    }
    streams
}

/// The one-line usage printed when no scenario is given.
pub fn usage() -> String {
    command().render_usage().to_string()
}

pub fn parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let streams = stream_configs(&matches);
    Ok(Invocation { cli, streams })
}

pub fn parse() -> Result<Invocation, clap::Error> {
    parse_from(std::env::args_os())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(args: &[&str]) -> Invocation {
        match parse_from(args) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        }
    }

    #[test]
    fn parse_duration_accepts_humantime() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn defaults_describe_a_single_local_call() {
        let inv = parse_ok(&["volley", "noop"]);
        assert_eq!(inv.cli.scenario.as_deref(), Some("noop"));
        assert_eq!(inv.cli.users, "1");
        assert_eq!(inv.cli.cycles, "1");
        assert_eq!(inv.cli.agents, None);
        assert_eq!(inv.cli.broker, "tcp://127.0.0.1:7780");
        assert_eq!(inv.cli.stream, "stdout");
        assert_eq!(inv.cli.output, OutputFormat::HumanReadable);
        assert_eq!(inv.stream_config(StreamKind::Remote), StreamConfig::default());
    }

    #[test]
    fn short_flags_and_stream_options() {
        let inv = parse_ok(&[
            "volley",
            "http-get",
            "-u",
            "1:5",
            "-c",
            "10:20",
            "-a",
            "3",
            "-b",
            "tcp://broker:7780",
            "--stream-remote-endpoint",
            "tcp://0.0.0.0:9000",
            "--stream-stdout-progress",
            "false",
            "--deadline",
            "30s",
            "--output",
            "json",
        ]);

        assert_eq!(inv.cli.users, "1:5");
        assert_eq!(inv.cli.cycles, "10:20");
        assert_eq!(inv.cli.agents, Some(3));
        assert_eq!(inv.cli.broker, "tcp://broker:7780");
        assert_eq!(inv.cli.deadline, Some(Duration::from_secs(30)));
        assert_eq!(inv.cli.output, OutputFormat::Json);
        assert_eq!(
            inv.stream_config(StreamKind::Remote).get("endpoint"),
            Some("tcp://0.0.0.0:9000")
        );
        assert_eq!(
            inv.stream_config(StreamKind::Stdout).get("progress"),
            Some("false")
        );
    }

    #[test]
    fn hidden_stream_options_are_not_flags() {
        assert!(parse_from(["volley", "noop", "--stream-stdout-total", "5"]).is_err());
        assert!(parse_from(["volley", "noop", "--stream-zmq-endpoint", "x"]).is_err());
    }

    #[test]
    fn usage_is_a_single_line() {
        let usage = usage();
        assert!(usage.starts_with("Usage: volley"), "{usage}");
        assert!(usage.contains("[SCENARIO]"), "{usage}");
        assert!(!usage.contains("--stream-remote-endpoint"), "{usage}");
    }

    #[test]
    fn every_exposed_option_has_a_flag() {
        let cmd = command();
        for (kind, option) in cli_options() {
            let flag = stream_flag(kind, option);
            assert!(
                cmd.get_arguments().any(|a| a.get_long() == Some(flag.as_str())),
                "missing --{flag}"
            );
        }
    }
}

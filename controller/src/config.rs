use crate::constants::{CHILD_RECHECK, CONFLICT_ATTEMPTS, ERROR_REQUEUE, PASS_DEADLINE};
use clap::Parser;
use eevee_model::constants::{FINALIZER_CONNECTOR_IRC, FINALIZER_TOOLBOX};
use log::LevelFilter;
use snafu::{OptionExt, ResultExt, Snafu};
use std::collections::VecDeque;
use std::num::ParseIntError;
use std::time::Duration;

const UNITS: [(char, u64); 3] = [('d', 86400), ('h', 3600), ('m', 60)];

/// Runs the eevee operator: reconciles `ConnectorIrc` and `Toolbox` objects into worker
/// deployments.
#[derive(Debug, Parser)]
#[clap(version)]
pub(crate) struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info", env = "EEVEE_LOG_LEVEL")]
    pub(crate) log_level: LevelFilter,

    /// Only watch this namespace. Watches all namespaces when omitted.
    #[clap(long, env = "EEVEE_WATCH_NAMESPACE")]
    pub(crate) namespace: Option<String>,

    /// How long to wait before rechecking a newly created deployment, e.g. `1m` or `90s`.
    #[clap(long, default_value = "60s", value_parser = parse_duration)]
    pub(crate) child_recheck: Duration,

    /// How long to wait before retrying a failed reconciliation.
    #[clap(long, default_value = "5s", value_parser = parse_duration)]
    pub(crate) error_requeue: Duration,

    /// The longest a single reconciliation pass may run.
    #[clap(long, default_value = "30s", value_parser = parse_duration)]
    pub(crate) pass_deadline: Duration,

    /// How many times an update is attempted when it races with another writer.
    #[clap(long, default_value_t = CONFLICT_ATTEMPTS)]
    pub(crate) conflict_retries: u32,

    #[clap(long, default_value = FINALIZER_CONNECTOR_IRC)]
    pub(crate) connectorirc_finalizer: String,

    #[clap(long, default_value = FINALIZER_TOOLBOX)]
    pub(crate) toolbox_finalizer: String,
}

/// The timing and retry settings a reconciler runs with.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct ReconcileConfig {
    pub(crate) child_recheck: Duration,
    pub(crate) error_requeue: Duration,
    pub(crate) pass_deadline: Duration,
    pub(crate) conflict_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            child_recheck: CHILD_RECHECK,
            error_requeue: ERROR_REQUEUE,
            pass_deadline: PASS_DEADLINE,
            conflict_attempts: CONFLICT_ATTEMPTS,
        }
    }
}

impl From<&Args> for ReconcileConfig {
    fn from(args: &Args) -> Self {
        Self {
            child_recheck: args.child_recheck,
            error_requeue: args.error_requeue,
            pass_deadline: args.pass_deadline,
            conflict_attempts: args.conflict_retries.max(1),
        }
    }
}

#[derive(Debug, Snafu)]
pub(crate) enum ParseDurationError {
    #[snafu(display("Failed to parse duration '{}'", input))]
    Malformed { input: String },

    #[snafu(display("Failed to parse duration '{}': {}", input, source))]
    Number {
        input: String,
        source: ParseIntError,
    },
}

/// Parse a duration string like `1d2h3m4s` into a `Duration`. Units must appear in that order and
/// a bare number is taken as seconds.
pub(crate) fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let mut secs: u64 = 0;
    let mut duration_string = input;
    for unit in UNITS {
        let mut vec: VecDeque<&str> = duration_string.split(unit.0).collect();
        if vec.len() > 1 {
            secs += vec
                .pop_front()
                .context(MalformedSnafu { input })?
                .parse::<u64>()
                .context(NumberSnafu { input })?
                * unit.1;
        }
        duration_string = vec.pop_front().context(MalformedSnafu { input })?;
    }
    let mut vec: VecDeque<&str> = duration_string.split('s').collect();
    let seconds = vec.pop_front().context(MalformedSnafu { input })?;
    if !seconds.is_empty() {
        secs += seconds.parse::<u64>().context(NumberSnafu { input })?;
    }
    Ok(Duration::from_secs(secs))
}

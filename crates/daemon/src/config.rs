//! Process configuration, read from long flags or the matching environment variables.

use clap::{ArgAction, Parser, ValueEnum};
use crashguard_core::application::reconcile::{scope_from_entries, NamespaceScope};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("duration is empty")]
    EmptyDuration,

    #[error("negative duration {0:?}")]
    NegativeDuration(String),

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("duration {0:?} is too large")]
    DurationOverflow(String),

    #[error("duration must be greater than zero")]
    ZeroDuration,

    #[error("invalid worker count {0:?}, expected an integer of at least 1")]
    WorkerCount(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "crashguard-controller",
    version,
    about = "Scales workloads to zero when their pods crash-loop"
)]
pub struct Config {
    /// Period at which every cached object is re-queued
    #[arg(long, env = "RESYNC_PERIOD", value_parser = parse_period)]
    pub resync_period: Duration,

    /// Period at which the watches are restarted with a fresh list
    #[arg(long, env = "GLOBAL_RESYNC_PERIOD", value_parser = parse_period)]
    pub global_resync_period: Duration,

    /// Workers per queue
    #[arg(long, env = "WORKER_THREADS", value_parser = parse_worker_threads)]
    pub worker_threads: usize,

    /// Comma separated namespaces the controller may scale in; `*` selects all
    #[arg(
        long,
        env = "SCOPE_NAMESPACES",
        value_delimiter = ',',
        required = true
    )]
    pub scope_namespaces: Vec<String>,

    /// Kubeconfig file; in-cluster or default kubeconfig when unset
    #[arg(long = "k8s-config-path", env = "K8S_CONFIG_PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Give up if the caches have not synced within this duration
    #[arg(long, env = "CACHE_SYNC_TIMEOUT", value_parser = parse_period, default_value = "5m")]
    pub cache_sync_timeout: Duration,

    /// Watch and scale OpenShift deployment-configs
    #[arg(
        long,
        env = "WATCH_DEPLOYMENT_CONFIGS",
        action = ArgAction::Set,
        default_value_t = true
    )]
    pub watch_deployment_configs: bool,

    #[arg(long, env = "CRASHGUARD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    /// Namespace scope from the configured entries
    pub fn namespace_scope(&self) -> Result<Arc<dyn NamespaceScope>, anyhow::Error> {
        let entries: Vec<&str> = self
            .scope_namespaces
            .iter()
            .map(|ns| ns.trim())
            .filter(|ns| !ns.is_empty())
            .collect();
        if entries.is_empty() {
            anyhow::bail!("SCOPE_NAMESPACES names no namespace");
        }
        Ok(scope_from_entries(entries))
    }
}

fn parse_worker_threads(input: &str) -> Result<usize, ValueError> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValueError::WorkerCount(input.to_string())),
    }
}

/// Strictly positive duration
fn parse_period(input: &str) -> Result<Duration, ValueError> {
    let duration = parse_go_duration(input)?;
    if duration.is_zero() {
        return Err(ValueError::ZeroDuration);
    }
    Ok(duration)
}

/// Parse Go's `time.ParseDuration` syntax: `300ms`, `1.5h`, `2h45m`.
///
/// Negative durations are rejected.
pub fn parse_go_duration(input: &str) -> Result<Duration, ValueError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValueError::EmptyDuration);
    }
    if trimmed.starts_with('-') {
        return Err(ValueError::NegativeDuration(input.to_string()));
    }
    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(ValueError::InvalidDuration(input.to_string()));
    }

    let overflow = || ValueError::DurationOverflow(input.to_string());
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ValueError::InvalidDuration(input.to_string()));
        }
        if fraction.contains('.') {
            return Err(ValueError::InvalidDuration(input.to_string()));
        }

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            "" => return Err(ValueError::MissingUnit(input.to_string())),
            other => {
                return Err(ValueError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        let mut place = scale;
        for digit in fraction.chars() {
            place /= 10;
            if place == 0 {
                break;
            }
            nanos += u128::from(digit.to_digit(10).unwrap_or(0)) * place;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| overflow())?;
    Ok(Duration::from_nanos(nanos))
}

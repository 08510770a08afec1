//! Scheduled job state and schedule parsing

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use shopbridge_core::Connection;

use crate::error::{Error, Result};

/// Default number of recent errors a job keeps
pub const DEFAULT_ERROR_HISTORY: usize = 10;

/// Lifecycle of a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Registered, first run not started
    Scheduled,
    /// A pipeline run is in flight
    Running,
    /// Last run succeeded
    Success,
    /// Last run failed, or the schedule could not be parsed
    Error,
    /// Cancelled; the loop has exited
    Stopped,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Stopped => "stopped",
        })
    }
}

/// Mutable state of one scheduled connection
#[derive(Debug, Clone)]
pub struct Job {
    /// Connection the job runs, as it was when scheduled
    pub connection: Connection,

    /// Current status
    pub status: JobStatus,

    /// Start of the most recent run
    pub last_run: Option<DateTime<Utc>>,

    errors: VecDeque<String>,
    capacity: usize,
}

impl Job {
    /// Create a job in the `scheduled` state
    pub fn new(connection: Connection, capacity: usize) -> Self {
        Self {
            connection,
            status: JobStatus::Scheduled,
            last_run: None,
            errors: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Mark a run as started
    pub fn begin_run(&mut self) {
        self.status = JobStatus::Running;
        self.last_run = Some(Utc::now());
    }

    /// Mark the current run as succeeded
    pub fn succeed(&mut self) {
        self.status = JobStatus::Success;
    }

    /// Mark the job failed, keeping the message in the error ring
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Error;
        if self.capacity == 0 {
            return;
        }
        while self.errors.len() >= self.capacity {
            self.errors.pop_front();
        }
        self.errors.push_back(error.into());
    }

    /// Recent errors, oldest first
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(String::as_str)
    }

    /// Point-in-time copy for callers outside the scheduler
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            connection_id: self.connection.id.clone(),
            schedule: self.connection.schedule.clone(),
            source: self.connection.source.clone(),
            target: self.connection.target.clone(),
            transformer: self.connection.transformer.clone(),
            status: self.status,
            last_run: self.last_run,
            errors: self.errors.iter().cloned().collect(),
        }
    }
}

/// Read-only view of a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    /// Connection the job runs
    pub connection_id: String,
    /// Schedule as configured
    pub schedule: String,
    /// Source connector reference
    pub source: String,
    /// Target connector reference
    pub target: String,
    /// Transformer id
    pub transformer: String,
    /// Status at snapshot time
    pub status: JobStatus,
    /// Start of the most recent run
    pub last_run: Option<DateTime<Utc>>,
    /// Recent errors, oldest first
    pub errors: Vec<String>,
}

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+(?:ms|h|m|s))+$").expect("duration pattern is valid"));

static COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(ms|h|m|s)").expect("component pattern is valid"));

/// Parse a schedule into a repeat interval.
///
/// Accepts durations such as `90s`, `5m`, `1h30m`, or `250ms`, optionally
/// prefixed with `@every `, and the shorthands `@hourly`, `@daily`, and
/// `@weekly`.
pub fn parse_schedule(schedule: &str) -> Result<Duration> {
    let invalid = |message: &str| Error::ScheduleParse {
        schedule: schedule.to_string(),
        message: message.to_string(),
    };

    let spec = schedule.trim();
    match spec {
        "@hourly" => return Ok(Duration::from_secs(60 * 60)),
        "@daily" => return Ok(Duration::from_secs(24 * 60 * 60)),
        "@weekly" => return Ok(Duration::from_secs(7 * 24 * 60 * 60)),
        _ => {}
    }

    let spec = spec.strip_prefix("@every").map(str::trim).unwrap_or(spec);
    if spec.is_empty() {
        return Err(invalid("schedule is empty"));
    }
    if !DURATION.is_match(spec) {
        return Err(invalid("expected a duration like 90s, 5m, or 1h30m"));
    }

    let mut total = Duration::ZERO;
    for captures in COMPONENT.captures_iter(spec) {
        let amount: u64 = captures[1]
            .parse()
            .map_err(|_| invalid("duration is out of range"))?;
        let unit_ms = match &captures[2] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            _ => 3_600_000,
        };
        let part = amount
            .checked_mul(unit_ms)
            .map(Duration::from_millis)
            .ok_or_else(|| invalid("duration is out of range"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("duration is out of range"))?;
    }

    if total.is_zero() {
        return Err(invalid("interval must be positive"));
    }
    Ok(total)
}

//! Session history
//!
//! Append-only log of step records, plus the sink that makes it durable.
//! The step array file format is what external tools read; the summary
//! file sits next to it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::agent::analyzer::{Issue, Severity};
use crate::agent::decision::Decision;
use crate::agent::grounder::ExecutionOutcome;
use crate::agent::loop_state::Termination;
use crate::agent::observer::truncate_chars;
use crate::agent::validator::ValidatedAction;
use crate::core::{Result, ScoutError};

/// Characters of visible text kept per record
pub const SNAPSHOT_SUMMARY_CHARS: usize = 100;

/// One completed step. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step_index: usize,
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub snapshot_summary: String,
    pub decision: Decision,
    pub action: ValidatedAction,
    pub outcome: ExecutionOutcome,
    pub issues: Vec<Issue>,
}

impl StepRecord {
    pub fn summarize_text(visible_text: &str) -> String {
        truncate_chars(visible_text, SNAPSHOT_SUMMARY_CHARS)
    }

    /// One-line form fed back to the policy
    pub fn summary_line(&self) -> String {
        format!(
            "Step {}: Action={} -> Result={}: {}",
            self.step_index,
            self.action.kind,
            self.outcome.status.as_str(),
            self.outcome.details
        )
    }
}

/// Ordered step records for one session
#[derive(Debug, Clone)]
pub struct SessionHistory {
    started_at: DateTime<Local>,
    records: Vec<StepRecord>,
}

impl SessionHistory {
    pub fn start() -> Self {
        Self::started_at(Local::now())
    }

    pub fn started_at(started_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            records: Vec::new(),
        }
    }

    pub fn start_time(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Append the next record; its index must be exactly `len() + 1`
    pub fn append(&mut self, record: StepRecord) -> Result<()> {
        let expected = self.records.len() + 1;
        if record.step_index != expected {
            return Err(ScoutError::history(format!(
                "step {} appended out of order (expected {})",
                record.step_index, expected
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// The last `k` records, oldest first
    pub fn recent(&self, k: usize) -> &[StepRecord] {
        let start = self.records.len().saturating_sub(k);
        &self.records[start..]
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Base file name, derived from the session start time
    pub fn file_stem(&self) -> String {
        format!("session_{}", self.started_at.format("%Y%m%d_%H%M%S"))
    }
}

/// Issue totals for the session report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl IssueCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Final status marker written next to the step log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub steps: usize,
    pub termination: Termination,
    pub issues: IssueCounts,
    /// Where the step log was written, once flushed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl SessionReport {
    pub fn new(history: &SessionHistory, termination: Termination) -> Self {
        let mut issues = IssueCounts::default();
        for issue in history.records().iter().flat_map(|r| &r.issues) {
            match issue.severity {
                Severity::High => issues.high += 1,
                Severity::Medium => issues.medium += 1,
                Severity::Low => issues.low += 1,
            }
        }
        Self {
            started_at: history.start_time(),
            ended_at: Local::now(),
            steps: history.len(),
            termination,
            issues,
            log_path: None,
        }
    }
}

/// Durable storage for a finished session
pub trait HistorySink: Send + Sync {
    /// Persist the history; returns where the step log went
    fn flush(&self, history: &SessionHistory, report: &SessionReport) -> Result<PathBuf>;
}

/// Writes `session_<ts>.json` and `session_<ts>.summary.json` into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl HistorySink for JsonFileSink {
    fn flush(&self, history: &SessionHistory, report: &SessionReport) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let stem = history.file_stem();
        let log_path = self.dir.join(format!("{}.json", stem));
        let summary_path = self.dir.join(format!("{}.summary.json", stem));

        std::fs::write(&log_path, serde_json::to_string_pretty(history.records())?)?;

        let mut report = report.clone();
        report.log_path = Some(log_path.clone());
        std::fs::write(&summary_path, serde_json::to_string_pretty(&report)?)?;

        info!(path = %log_path.display(), steps = history.len(), "Session log saved");
        Ok(log_path)
    }
}

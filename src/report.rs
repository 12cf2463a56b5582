//! Recoverable problems collected while a stage runs, reported once the stage ends.

use log::{info, warn};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A problem that does not abort a stage.
///
/// Fatal problems are [`crate::PipelineError`]s; these are logged and counted instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecoverableIssue {
    #[error("No data published for {partition}")]
    RetrievalEmpty { partition: String },

    #[error("Retrieval of {partition} failed: {reason}")]
    RetrievalFailed { partition: String, reason: String },

    #[error("Station '{station}' not found in '{reference}', coordinates left empty")]
    JoinKeyUnmatched { station: String, reference: PathBuf },

    #[error("Dropped {count} malformed rows from '{table}'")]
    MalformedRow { table: String, count: usize },
}

/// Summary of one stage run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: &'static str,
    pub rows_written: usize,
    pub files_written: usize,
    pub files_reused: usize,
    pub issues: Vec<RecoverableIssue>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            rows_written: 0,
            files_written: 0,
            files_reused: 0,
            issues: Vec::new(),
        }
    }

    pub fn record(&mut self, issue: RecoverableIssue) {
        self.issues.push(issue);
    }

    /// Records a malformed-row count, skipping zero counts.
    pub fn record_malformed(&mut self, table: impl Into<String>, count: usize) {
        if count > 0 {
            self.record(RecoverableIssue::MalformedRow {
                table: table.into(),
                count,
            });
        }
    }

    pub fn wrote(&mut self, rows: usize) {
        self.rows_written += rows;
        self.files_written += 1;
    }

    pub fn malformed_rows(&self) -> usize {
        self.issues
            .iter()
            .map(|issue| match issue {
                RecoverableIssue::MalformedRow { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }

    /// Logs the summary line and every recoverable issue.
    pub fn log_summary(&self) {
        info!("{}", self);
        for issue in &self.issues {
            warn!("[{}] {}", self.stage, issue);
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows in {} files written, {} reused, {} issues ({} malformed rows dropped)",
            self.stage,
            self.rows_written,
            self.files_written,
            self.files_reused,
            self.issues.len(),
            self.malformed_rows()
        )
    }
}

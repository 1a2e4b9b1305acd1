//! Run report schema (stable v1)
//!
//! Written by `sqlfy --report`. Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What happened to one discovered template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Rendered and written
    Converted,

    /// Read, render, path mapping or write failed
    Failed,

    /// Never started because the run was cancelled
    Skipped,
}

/// Failure detail attached to a failed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Stable error code (e.g. RENDER_ERROR)
    pub code: String,

    /// Human-readable cause
    pub message: String,
}

/// Outcome of a single template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Template path as discovered
    pub source: PathBuf,

    /// Written output path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    pub status: OutcomeStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileFailure>,
}

impl FileOutcome {
    pub fn converted(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: Some(destination.into()),
            status: OutcomeStatus::Converted,
            error: None,
        }
    }

    pub fn failed(
        source: impl Into<PathBuf>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: None,
            status: OutcomeStatus::Failed,
            error: Some(FileFailure {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    pub fn skipped(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            status: OutcomeStatus::Skipped,
            error: None,
        }
    }
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub discovered: usize,
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: RunSummary,

    /// One entry per discovered template, in discovery order
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: RunSummary::default(),
            files: Vec::new(),
        }
    }

    /// Create a report from outcomes already in discovery order
    pub fn from_outcomes(outcomes: Vec<FileOutcome>) -> Self {
        let mut report = Self::new();
        for outcome in outcomes {
            report.add_outcome(outcome);
        }
        report
    }

    /// Add an outcome and update the summary
    pub fn add_outcome(&mut self, outcome: FileOutcome) {
        match outcome.status {
            OutcomeStatus::Converted => self.summary.converted += 1,
            OutcomeStatus::Failed => self.summary.failed += 1,
            OutcomeStatus::Skipped => self.summary.skipped += 1,
        }

        self.summary.discovered += 1;
        self.files.push(outcome);
    }

    /// True when any file failed or was skipped
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || self.summary.skipped > 0
    }

    /// Failed outcomes, in discovery order
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = RunReport::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.discovered, 0);
        assert!(!report.has_failures());
    }

    #[test]
    fn report_with_outcomes() {
        let report = RunReport::from_outcomes(vec![
            FileOutcome::converted("src/a.tpl", "dist/a.sql"),
            FileOutcome::failed("src/b.tpl", "RENDER_ERROR", "boom"),
            FileOutcome::skipped("src/c.tpl"),
        ]);

        assert_eq!(report.summary.discovered, 3);
        assert_eq!(report.summary.converted, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.files[1].source, PathBuf::from("src/b.tpl"));
    }

    #[test]
    fn report_serialization() {
        let report = RunReport::from_outcomes(vec![FileOutcome::failed(
            "src/b.tpl",
            "WRITE_ERROR",
            "permission denied",
        )]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"failed\""));
        assert!(json.contains("WRITE_ERROR"));
        assert!(!json.contains("\"destination\""));
    }
}

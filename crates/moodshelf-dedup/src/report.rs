use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::backup::create_unique;
use crate::error::{DedupError, Result};
use crate::policy::AuditEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub groups_found: usize,
    pub total_before: usize,
    pub total_after: usize,
    pub records_deleted: usize,
    pub records_kept: usize,
}

impl RunStatistics {
    /// Share of the catalog removed, in percent.
    pub fn cleaned_percentage(&self) -> f64 {
        if self.total_before == 0 {
            return 0.0;
        }
        self.records_deleted as f64 / self.total_before as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub timestamp: DateTime<Local>,
    pub database: String,
    pub backup: String,
    pub statistics: RunStatistics,
    pub deleted_records: Vec<AuditEntry>,
}

/// Writes one JSON report per committed run.
#[derive(Debug, Clone)]
pub struct AuditReporter {
    report_dir: PathBuf,
}

impl AuditReporter {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Write `duplicates_removed_<timestamp>.json`, named after the report's
    /// own timestamp.
    pub fn write(&self, report: &AuditReport) -> Result<PathBuf> {
        let failure = |path: &Path, message: String| DedupError::ReportWriteFailure {
            path: path.to_path_buf(),
            message,
        };

        let (path, file) = create_unique(&self.report_dir, "duplicates_removed", "json", report.timestamp)
            .map_err(|e| failure(&self.report_dir, e.to_string()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, report)
            .map_err(|e| failure(&path, e.to_string()))?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| failure(&path, e.to_string()))?;

        tracing::info!(report = %path.display(), entries = report.deleted_records.len(), "audit report written");
        Ok(path)
    }
}

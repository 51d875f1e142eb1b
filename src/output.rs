//! Result types returned by the extraction entry points.

use crate::error::RowShapeError;
use crate::model::{ExtractionStrategy, IssueSummary, RawRow, TransactionRecord, ValidationIssue};
use crate::pipeline::decrypt::UnlockMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything one extraction run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutput {
    /// The eight-column CSV, header included.
    pub csv: String,
    /// Normalized records in serial order.
    pub records: Vec<TransactionRecord>,
    /// Validation findings, ordered by serial.
    pub issues: Vec<ValidationIssue>,
    /// Rows excluded because they lacked a date or every amount.
    pub rejected: Vec<RowShapeError>,
    /// Pre-normalization rows, when `keep_raw_rows` was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_rows: Option<Vec<RawRow>>,
    /// One report per selected page.
    pub pages: Vec<PageReport>,
    pub document: DocumentInfo,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    pub fn summary(&self) -> IssueSummary {
        IssueSummary::from_issues(&self.issues)
    }

    /// True when any error-severity issue was raised.
    pub fn has_errors(&self) -> bool {
        self.summary().has_errors()
    }
}

/// How a page's rows were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page: usize,
    pub strategy: ExtractionStrategy,
    /// Raw rows contributed (before normalization).
    pub rows: usize,
}

/// Document-level facts gathered during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub total_pages: usize,
    pub encrypted: bool,
    pub unlocked_with: UnlockMethod,
    /// Balance of the opening-balance row, if the statement printed one.
    pub opening_balance: Option<Decimal>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_pages: usize,
    pub selected_pages: usize,
    /// Pages whose rows came from the grid.
    pub grid_pages: usize,
    /// Pages that needed the text fallback.
    pub fallback_pages: usize,
    pub raw_rows: usize,
    pub records: usize,
    pub rejected_rows: usize,
    pub errors: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

/// Result of a run on bytes that may need a password.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Box<ExtractionOutput>),
    /// The document is encrypted and the empty password did not open it.
    /// Re-run with a password.
    PasswordRequired,
}

/// PDF metadata read without extracting anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
    /// Encrypted and the empty password did not open it; other fields are
    /// unknown.
    pub requires_password: bool,
}

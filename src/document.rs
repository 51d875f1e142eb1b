//! Whole-run state for one statement.
//!
//! A [`StatementDocument`] owns every artefact derived from one unlocked
//! PDF. The stage methods must run in order:
//!
//! ```text
//! new ──▶ extract_rows ──▶ normalize ──▶ validate ──▶ into_output
//! ```

use crate::config::ExtractionConfig;
use crate::error::{RowShapeError, StatementError};
use crate::model::{
    ExtractionStrategy, IssueSummary, PageContent, RawRow, TransactionRecord, ValidationIssue,
};
use crate::output::{DocumentInfo, ExtractionOutput, ExtractionStats, PageReport};
use crate::pipeline::decrypt::{UnlockMethod, UnlockedDocument};
use crate::pipeline::{export, normalize, table, text, validate};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug)]
pub struct StatementDocument {
    pub pages: Vec<PageContent>,
    pub encrypted: bool,
    pub unlocked_with: UnlockMethod,
    pub raw_rows: Vec<RawRow>,
    pub records: Vec<TransactionRecord>,
    pub issues: Vec<ValidationIssue>,
    pub rejected: Vec<RowShapeError>,
    pub page_reports: Vec<PageReport>,
    pub opening_balance: Option<Decimal>,
    started: Instant,
}

impl StatementDocument {
    /// Take ownership of an unlocked document's pages.
    pub fn new(doc: UnlockedDocument) -> Result<Self, StatementError> {
        if doc.pages.is_empty() {
            return Err(StatementError::NoPages);
        }
        Ok(Self {
            pages: doc.pages,
            encrypted: doc.encrypted,
            unlocked_with: doc.unlocked_with,
            raw_rows: Vec::new(),
            records: Vec::new(),
            issues: Vec::new(),
            rejected: Vec::new(),
            page_reports: Vec::new(),
            opening_balance: None,
            started: Instant::now(),
        })
    }

    /// Grid extraction per selected page, text fallback where the grid
    /// produced no rows.
    ///
    /// # Errors
    /// [`StatementError::NoRows`] when no selected page produced a row.
    pub fn extract_rows(&mut self, config: &ExtractionConfig) -> Result<(), StatementError> {
        let indices = config.pages.to_indices(self.pages.len());
        if indices.is_empty() {
            return Err(StatementError::InvalidConfig(format!(
                "Page selection {:?} matches none of the {} pages",
                config.pages,
                self.pages.len()
            )));
        }
        let total = indices.len();
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_start(total);
        }

        let mut opening_raw: Option<String> = None;
        for idx in indices {
            let page = &self.pages[idx];
            let grid = table::extract_table(page, config);

            let (strategy, rows) = if grid.needs_fallback() {
                let parsed = text::parse_page_text(page, config);
                if !parsed.rows.is_empty() {
                    warn!(
                        "Page {}: no usable grid rows; text fallback found {}",
                        page.number,
                        parsed.rows.len()
                    );
                }
                opening_raw = opening_raw.or(parsed.opening_balance);
                let rows: Vec<RawRow> = parsed.rows.into_iter().map(RawRow::Text).collect();
                (ExtractionStrategy::TextFallback, rows)
            } else {
                opening_raw = opening_raw.or(grid.opening_balance);
                let rows: Vec<RawRow> = grid.rows.into_iter().map(RawRow::Grid).collect();
                (ExtractionStrategy::Grid, rows)
            };

            if let Some(ref cb) = config.progress_callback {
                cb.on_page_extracted(page.number, total, strategy, rows.len());
            }
            self.page_reports.push(PageReport {
                page: page.number,
                strategy,
                rows: rows.len(),
            });
            self.raw_rows.extend(rows);
        }

        self.opening_balance = opening_raw.and_then(|raw| match normalize::clean_balance(&raw) {
            normalize::Cleaned::Value(v) => Some(v),
            _ => {
                warn!("Opening balance '{}' is not a number; ignoring it", raw);
                None
            }
        });

        if self.raw_rows.is_empty() {
            return Err(StatementError::NoRows { pages: total });
        }
        info!(
            "Extracted {} raw rows from {} pages",
            self.raw_rows.len(),
            total
        );
        Ok(())
    }

    /// Type every raw row; rows failing the shape check are set aside.
    ///
    /// # Errors
    /// [`StatementError::AllRowsRejected`] when not a single row survives.
    pub fn normalize(&mut self, config: &ExtractionConfig) -> Result<(), StatementError> {
        let out = normalize::normalize_rows(&self.raw_rows, config);
        self.records = out.records;
        self.rejected = out.rejected;
        if self.records.is_empty() {
            return Err(StatementError::AllRowsRejected {
                rejected: self.rejected.len(),
            });
        }
        Ok(())
    }

    pub fn validate(&mut self, config: &ExtractionConfig) {
        self.issues = validate::validate(&self.records, self.opening_balance, config);
        let summary = IssueSummary::from_issues(&self.issues);
        if let Some(ref cb) = config.progress_callback {
            cb.on_extraction_complete(self.records.len(), summary.errors, summary.warnings);
        }
    }

    /// Serialize the table and assemble the caller-facing result.
    pub fn into_output(self, config: &ExtractionConfig) -> Result<ExtractionOutput, StatementError> {
        let csv = export::to_csv_string(&self.records, config.amount_scale)?;
        let summary = IssueSummary::from_issues(&self.issues);
        let count = |s: ExtractionStrategy| self.page_reports.iter().filter(|p| p.strategy == s).count();

        let stats = ExtractionStats {
            total_pages: self.pages.len(),
            selected_pages: self.page_reports.len(),
            grid_pages: count(ExtractionStrategy::Grid),
            fallback_pages: count(ExtractionStrategy::TextFallback),
            raw_rows: self.raw_rows.len(),
            records: self.records.len(),
            rejected_rows: self.rejected.len(),
            errors: summary.errors,
            warnings: summary.warnings,
            duration_ms: self.started.elapsed().as_millis() as u64,
        };
        info!(
            "Extraction complete: {} records, {} rejected, {} errors, {} warnings, {}ms",
            stats.records, stats.rejected_rows, stats.errors, stats.warnings, stats.duration_ms
        );

        Ok(ExtractionOutput {
            csv,
            document: DocumentInfo {
                total_pages: self.pages.len(),
                encrypted: self.encrypted,
                unlocked_with: self.unlocked_with,
                opening_balance: self.opening_balance,
            },
            records: self.records,
            issues: self.issues,
            rejected: self.rejected,
            raw_rows: config.keep_raw_rows.then_some(self.raw_rows),
            pages: self.page_reports,
            stats,
        })
    }
}

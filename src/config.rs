//! Configuration types for statement extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The config is an immutable value that
//! every pipeline stage receives by reference; nothing in the pipeline reads
//! process-wide parser state, so two documents can be processed side by side
//! with different settings.

use crate::error::StatementError;
use crate::progress::ProgressCallback;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// Input date formats accepted by default (chrono `strftime` syntax).
///
/// The supported statement prints `DD/MM/YYYY` in the table and
/// `DD-MM-YYYY` in some exports; the remaining formats cover the
/// month-name and ISO variants seen in older statement templates.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%Y-%m-%d",
];

/// Header/footer boilerplate of the supported statement layout.
///
/// Matched case-insensitively against each trimmed line before any row
/// detection takes place.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"(?i)^account statement",
    r"(?i)account statement from",
    r"(?i)^page\b",
    r"(?i)\bpage\s+\d+\s+of\s+\d+",
    r"(?i)^this is a computer[- ]generated",
    r"(?i)^statement is generated",
    r"(?i)bob world",
    // Print timestamp footer, e.g. "09/11/2025 02:53:00 PM".
    r"(?i)^\d{2}/\d{2}/\d{4}\s+\d{2}:\d{2}:\d{2}\s*(am|pm)$",
    // Hindi statement-period banner.
    r"से.+तक.+खाता",
    // Column header lines (English / Hindi).
    r"(?i)sr\.?\s?no",
    r"(?i)debit.*credit.*balance",
    r"चेक.*नामे.*जमा",
    r"लेनदेन.*ववरण",
];

/// Configuration for one statement extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_stmt2csv::ExtractionConfig;
/// use rust_decimal::Decimal;
///
/// let config = ExtractionConfig::builder()
///     .date_format("%d/%m/%y")
///     .balance_tolerance(Decimal::new(5, 2))
///     .build()
///     .unwrap();
/// assert_eq!(config.balance_tolerance, Decimal::new(5, 2));
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Accepted input date formats, tried in order. Default: [`DEFAULT_DATE_FORMATS`].
    pub date_formats: Vec<String>,

    /// Largest accepted difference between a printed balance and the balance
    /// implied by the previous row and this row's movement. Default: 0.01.
    pub balance_tolerance: Decimal,

    /// Decimal places used when writing amounts to CSV. Default: 2.
    pub amount_scale: u32,

    /// Compiled header/footer exclusion patterns.
    pub noise_patterns: Vec<Regex>,

    /// Description text marking the opening-balance summary row
    /// (compared case-insensitively). Default: "opening balance".
    pub opening_balance_label: String,

    /// Two text runs belong to the same visual line when their vertical
    /// centres differ by at most this many points. Default: 3.0.
    pub line_tolerance: f32,

    /// Adjacent text runs on a line closer than this many points are merged
    /// into one cell. Default: 8.0.
    pub cell_gap: f32,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Report a warning for every record without a value date. Default: false.
    pub require_value_date: bool,

    /// Keep the pre-normalisation rows in the output for preview. Default: false.
    pub keep_raw_rows: bool,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            balance_tolerance: Decimal::new(1, 2),
            amount_scale: 2,
            noise_patterns: default_noise_patterns(),
            opening_balance_label: "opening balance".to_string(),
            line_tolerance: 3.0,
            cell_gap: 8.0,
            pages: PageSelection::default(),
            require_value_date: false,
            keep_raw_rows: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("date_formats", &self.date_formats)
            .field("balance_tolerance", &self.balance_tolerance)
            .field("amount_scale", &self.amount_scale)
            .field("noise_patterns", &self.noise_patterns.len())
            .field("opening_balance_label", &self.opening_balance_label)
            .field("line_tolerance", &self.line_tolerance)
            .field("cell_gap", &self.cell_gap)
            .field("pages", &self.pages)
            .field("require_value_date", &self.require_value_date)
            .field("keep_raw_rows", &self.keep_raw_rows)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
            extra_noise: Vec::new(),
            replace_date_formats: false,
        }
    }

    /// True when the line is header/footer boilerplate.
    pub fn is_noise(&self, line: &str) -> bool {
        let line = line.trim();
        line.is_empty() || self.noise_patterns.iter().any(|re| re.is_match(line))
    }

    /// True when `description` is the opening-balance summary row.
    pub fn is_opening_balance(&self, description: &str) -> bool {
        description
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .eq_ignore_ascii_case(&self.opening_balance_label)
    }

    /// Parse a date using the configured formats, first match wins.
    ///
    /// A `%Y` format only accepts a four-digit year: chrono would read
    /// `01/03/24` as the year 24.
    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.date_formats.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .filter(|d| !fmt.contains("%Y") || d.year() >= 1000)
        })
    }

    /// True when `raw` is a date in one of the `%Y` formats except that its
    /// year is written with two digits. Such a date is still a date column,
    /// but [`parse_date`](Self::parse_date) refuses to guess its century.
    pub fn is_short_year_date(&self, raw: &str) -> bool {
        let raw = raw.trim();
        self.parse_date(raw).is_none()
            && self
                .date_formats
                .iter()
                .filter(|fmt| fmt.contains("%Y"))
                .any(|fmt| NaiveDate::parse_from_str(raw, &fmt.replace("%Y", "%y")).is_ok())
    }
}

fn default_noise_patterns() -> Vec<Regex> {
    DEFAULT_NOISE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
    extra_noise: Vec<String>,
    replace_date_formats: bool,
}

impl ExtractionConfigBuilder {
    /// Accept an additional input date format.
    ///
    /// The first call replaces the defaults; subsequent calls append.
    pub fn date_format(mut self, fmt: impl Into<String>) -> Self {
        if !self.replace_date_formats {
            self.config.date_formats.clear();
            self.replace_date_formats = true;
        }
        self.config.date_formats.push(fmt.into());
        self
    }

    pub fn balance_tolerance(mut self, tolerance: Decimal) -> Self {
        self.config.balance_tolerance = tolerance.abs();
        self
    }

    pub fn amount_scale(mut self, scale: u32) -> Self {
        self.config.amount_scale = scale.min(8);
        self
    }

    /// Add a boilerplate exclusion pattern (regex syntax).
    pub fn noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_noise.push(pattern.into());
        self
    }

    /// Drop the built-in boilerplate patterns.
    pub fn clear_noise_patterns(mut self) -> Self {
        self.config.noise_patterns.clear();
        self
    }

    pub fn opening_balance_label(mut self, label: impl Into<String>) -> Self {
        self.config.opening_balance_label = label.into();
        self
    }

    pub fn line_tolerance(mut self, points: f32) -> Self {
        self.config.line_tolerance = points.max(0.1);
        self
    }

    pub fn cell_gap(mut self, points: f32) -> Self {
        self.config.cell_gap = points.max(0.5);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn require_value_date(mut self, v: bool) -> Self {
        self.config.require_value_date = v;
        self
    }

    pub fn keep_raw_rows(mut self, v: bool) -> Self {
        self.config.keep_raw_rows = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ExtractionConfig, StatementError> {
        if self.config.date_formats.is_empty() {
            return Err(StatementError::InvalidConfig(
                "At least one input date format is required".into(),
            ));
        }
        for fmt in &self.config.date_formats {
            validate_date_format(fmt)?;
        }

        for pattern in &self.extra_noise {
            let re = Regex::new(pattern).map_err(|e| {
                StatementError::InvalidConfig(format!("Invalid noise pattern '{pattern}': {e}"))
            })?;
            self.config.noise_patterns.push(re);
        }

        if self.config.opening_balance_label.trim().is_empty() {
            return Err(StatementError::InvalidConfig(
                "Opening balance label must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// A format is usable only if it can render a date and read it back unchanged.
fn validate_date_format(fmt: &str) -> Result<(), StatementError> {
    let probe = NaiveDate::from_ymd_opt(2024, 3, 21)
        .ok_or_else(|| StatementError::Internal("probe date out of range".into()))?;

    let mut rendered = String::new();
    if write!(rendered, "{}", probe.format(fmt)).is_err() {
        return Err(StatementError::InvalidConfig(format!(
            "Date format '{fmt}' contains an unknown specifier"
        )));
    }
    match NaiveDate::parse_from_str(&rendered, fmt) {
        Ok(d) if d == probe => Ok(()),
        _ => Err(StatementError::InvalidConfig(format!(
            "Date format '{fmt}' must include day, month and year"
        ))),
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// Extract a single page (1-indexed).
    Single(usize),
    /// Extract a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Extract specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = ExtractionConfig::builder().build().unwrap();
        assert_eq!(config.date_formats.len(), DEFAULT_DATE_FORMATS.len());
        assert_eq!(config.noise_patterns.len(), DEFAULT_NOISE_PATTERNS.len());
        assert_eq!(config.balance_tolerance, Decimal::new(1, 2));
    }

    #[test]
    fn first_date_format_replaces_defaults() {
        let config = ExtractionConfig::builder()
            .date_format("%d/%m/%y")
            .date_format("%Y%m%d")
            .build()
            .unwrap();
        assert_eq!(config.date_formats, vec!["%d/%m/%y", "%Y%m%d"]);
    }

    #[test]
    fn rejects_date_format_without_year() {
        let err = ExtractionConfig::builder()
            .date_format("%d/%m")
            .build()
            .unwrap_err();
        assert!(matches!(err, StatementError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_bad_noise_pattern() {
        let err = ExtractionConfig::builder()
            .noise_pattern("(unclosed")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn parse_date_tries_each_format() {
        let config = ExtractionConfig::default();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(config.parse_date("01/03/2024"), expected);
        assert_eq!(config.parse_date("01-03-2024"), expected);
        assert_eq!(config.parse_date("2024-03-01"), expected);
        assert_eq!(config.parse_date("01 Mar 2024"), expected);
        assert_eq!(config.parse_date("31/02/2024"), None);
        assert_eq!(config.parse_date(""), None);
    }

    #[test]
    fn two_digit_year_is_not_read_as_four_digit() {
        let config = ExtractionConfig::default();
        assert_eq!(config.parse_date("01/03/24"), None);
        assert_eq!(config.parse_date("01-03-0024"), None);
        assert!(config.is_short_year_date("01/03/24"));
        assert!(!config.is_short_year_date("01/03/2024"));
        assert!(!config.is_short_year_date("45/45/24"));

        let short = ExtractionConfig::builder().date_format("%d/%m/%y").build().unwrap();
        assert_eq!(short.parse_date("01/03/24"), NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn noise_filter_matches_statement_boilerplate() {
        let config = ExtractionConfig::default();
        assert!(config.is_noise("Account Statement from 01-08-2025 to 31-08-2025"));
        assert!(config.is_noise("Page 2 of 7"));
        assert!(config.is_noise("09/11/2025 02:53:00 PM"));
        assert!(config.is_noise("Sr.No Transaction Date Value Date Description"));
        assert!(config.is_noise("   "));
        assert!(!config.is_noise("1 01/03/2024 01/03/2024 UPI/PAYMENT - - 500.00 10,500.00"));
        assert!(!config.is_noise("Corp Ltd"));
    }

    #[test]
    fn opening_balance_label_ignores_case_and_spacing() {
        let config = ExtractionConfig::default();
        assert!(config.is_opening_balance("  OPENING   Balance "));
        assert!(!config.is_opening_balance("Opening balance transfer"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(4).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 9).to_indices(3), vec![1, 2]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(3), vec![0, 2]);
    }
}

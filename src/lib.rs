//! # edgequake-stmt2csv
//!
//! Turn bank statement PDFs into a strict, validated eight-column CSV.
//!
//! ## Why this crate?
//!
//! Statement PDFs look tabular but are only positioned text. Copy-paste and
//! generic PDF-to-text tools lose column boundaries, split narrations across
//! lines and leave amounts as `1,234.50` strings. This crate rebuilds the
//! table from text positions, falls back to line parsing where no grid can be
//! found, types every field and checks the running balance, so the CSV can be
//! imported into an accounting system without hand repair.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Unlock     empty password first, then the supplied one (in memory)
//!  ├─ 2. Grid       columns anchored on the table header, per page
//!  ├─ 3. Fallback   line-based parse for pages without grid rows
//!  ├─ 4. Normalize  dates → DD/MM/YYYY, amounts → decimals, serials 1..N
//!  ├─ 5. Validate   movement, balance and continuity checks
//!  └─ 6. CSV        Serial No,Transaction Date,…,Balance
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_stmt2csv::{extract_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let output = extract_file("statement.pdf", None, &config).await?;
//!     print!("{}", output.csv);
//!     for issue in &output.issues {
//!         eprintln!("{issue}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stmt2csv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-stmt2csv = { version = "0.1", default-features = false }
//! ```
//!
//! ## Bring your own PDF library
//!
//! pdfium is reached only through the [`PdfBackend`] trait. Any type that can
//! return page text and positioned text runs can drive [`extract_bytes`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use document::StatementDocument;
pub use error::{DecryptionError, DecryptionFailure, RowShapeError, ShapeProblem, StatementError};
pub use extract::{
    extract_bytes, extract_document, extract_file, extract_file_sync, extract_to_file, inspect,
};
pub use model::{
    ExtractionStrategy, IssueRule, IssueSummary, PageContent, RawRow, Severity, TextBox,
    TransactionRecord, ValidationIssue, CSV_HEADER,
};
pub use output::{
    DocumentInfo, DocumentMetadata, ExtractionOutput, ExtractionStats, PageReport, RunOutcome,
};
pub use pipeline::decrypt::{OpenError, PdfBackend, UnlockMethod, UnlockOutcome, UnlockedDocument};
pub use pipeline::pdfium::PdfiumBackend;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use secrecy::SecretString;

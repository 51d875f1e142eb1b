//! Error types for the edgequake-stmt2csv library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`StatementError`] — **Fatal**: the run cannot produce a table at all
//!   (unreadable file, undecryptable PDF, no pages, no rows). Returned as
//!   `Err(StatementError)` from the top-level `extract*` functions.
//!
//! * [`DecryptionError`] — **Fatal but retryable**: the document is
//!   encrypted and could not be opened. Carries a machine-readable
//!   [`DecryptionFailure`] so callers can re-prompt for a password.
//!
//! * [`RowShapeError`] — **Non-fatal**: one extracted row lacks the minimum
//!   field set. The row is excluded from the table and reported in
//!   [`crate::output::ExtractionOutput::rejected`]; every other row is kept.
//!
//! Validation findings are not errors at all; they are
//! [`crate::model::ValidationIssue`] values returned next to the table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-stmt2csv library.
#[derive(Debug, Error)]
pub enum StatementError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading it failed part-way.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document is encrypted and could not be opened.
    #[error(transparent)]
    Decryption(#[from] DecryptionError),

    /// The document is encrypted, the empty password did not open it, and
    /// no password was supplied.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// The document opened but has no pages.
    #[error("PDF contains no pages")]
    NoPages,

    /// Neither grid extraction nor text fallback produced a single row.
    #[error("No transaction rows were found on any of the {pages} selected pages")]
    NoRows { pages: usize },

    /// Rows were extracted but every one of them failed the shape check.
    #[error("All {rejected} extracted rows were rejected as malformed")]
    AllRowsRejected { rejected: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform and either place it on the system\n\
library path or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why an encrypted document could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecryptionFailure {
    /// A password was supplied and rejected.
    WrongPassword,
    /// The security handler is not one the PDF backend can open.
    UnsupportedScheme,
    /// The byte stream is not a readable PDF.
    CorruptFile,
}

impl DecryptionFailure {
    /// Stable reason code, e.g. `"wrong_password"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecryptionFailure::WrongPassword => "wrong_password",
            DecryptionFailure::UnsupportedScheme => "unsupported_scheme",
            DecryptionFailure::CorruptFile => "corrupt_file",
        }
    }
}

impl fmt::Display for DecryptionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document could not be turned into a readable plaintext document.
#[derive(Debug, Clone, Error)]
#[error("Cannot open PDF ({reason}): {detail}")]
pub struct DecryptionError {
    pub reason: DecryptionFailure,
    pub detail: String,
}

impl DecryptionError {
    pub fn new(reason: DecryptionFailure, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn wrong_password() -> Self {
        Self::new(
            DecryptionFailure::WrongPassword,
            "the supplied password did not open the document",
        )
    }

    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::new(DecryptionFailure::CorruptFile, detail)
    }
}

/// What a rejected row was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeProblem {
    /// No transaction date text at all.
    MissingDate,
    /// None of debit, credit or balance carries any text.
    MissingAmounts,
}

impl fmt::Display for ShapeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeProblem::MissingDate => f.write_str("no transaction date"),
            ShapeProblem::MissingAmounts => f.write_str("no debit, credit or balance"),
        }
    }
}

/// A non-fatal error for a single extracted row.
///
/// The row is excluded from the output table; the run continues.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("Row on page {page} rejected: {reason}")]
pub struct RowShapeError {
    pub page: usize,
    pub reason: ShapeProblem,
    /// The positional cells as extracted, for diagnostics.
    pub cells: Vec<String>,
}

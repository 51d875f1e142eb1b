//! Extraction entry points.
//!
//! Three layers, each wrapping the previous:
//!
//! * [`extract_document`] runs stages 2–6 on an already unlocked document;
//! * [`extract_bytes`] adds the decryption gate, over any [`PdfBackend`];
//! * [`extract_file`] reads a file and drives pdfium on a blocking thread.

use crate::config::ExtractionConfig;
use crate::document::StatementDocument;
use crate::error::{DecryptionError, StatementError};
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats, RunOutcome};
use crate::pipeline::decrypt::{self, PdfBackend, UnlockOutcome, UnlockedDocument};
use crate::pipeline::input;
use crate::pipeline::pdfium::PdfiumBackend;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use tracing::info;

/// Extract, normalize, validate and serialize an unlocked document.
///
/// # Errors
/// Only whole-document failures: no pages, no rows on any selected page,
/// every row rejected. Row-level problems are reported in the output.
pub fn extract_document(
    doc: &UnlockedDocument,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, StatementError> {
    let mut statement = StatementDocument::new(doc.clone())?;
    statement.extract_rows(config)?;
    statement.normalize(config)?;
    statement.validate(config);
    statement.into_output(config)
}

/// Unlock `bytes` with `backend` and run the pipeline.
///
/// Returns [`RunOutcome::PasswordRequired`] when the document is encrypted,
/// the empty password failed and `password` is `None`; call again with a
/// password. A rejected password is an error and nothing is extracted.
///
/// # Example
/// ```rust,no_run
/// use edgequake_stmt2csv::{extract_bytes, ExtractionConfig, PdfiumBackend, RunOutcome};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("statement.pdf")?;
/// let backend = PdfiumBackend::bind()?;
/// match extract_bytes(&backend, &bytes, None, &ExtractionConfig::default())? {
///     RunOutcome::Completed(output) => print!("{}", output.csv),
///     RunOutcome::PasswordRequired => eprintln!("statement is password protected"),
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_bytes<B: PdfBackend + ?Sized>(
    backend: &B,
    bytes: &[u8],
    password: Option<&SecretString>,
    config: &ExtractionConfig,
) -> Result<RunOutcome, StatementError> {
    match decrypt::unlock(backend, bytes, password)? {
        UnlockOutcome::PasswordRequired => Ok(RunOutcome::PasswordRequired),
        UnlockOutcome::Unlocked(doc) => {
            info!(
                "Document unlocked ({:?}); {} pages",
                doc.unlocked_with,
                doc.pages.len()
            );
            extract_document(&doc, config).map(|out| RunOutcome::Completed(Box::new(out)))
        }
    }
}

/// Extract a statement PDF from disk using pdfium.
///
/// # Errors
/// As [`extract_bytes`], plus I/O and pdfium binding errors. An encrypted
/// file that needs a password which was not supplied is
/// [`StatementError::PasswordRequired`].
pub async fn extract_file(
    path: impl AsRef<Path>,
    password: Option<&SecretString>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, StatementError> {
    let path = path.as_ref();
    info!("Starting extraction: {}", path.display());
    let bytes = input::read_pdf(path).await?;

    // SecretString is not Clone; re-wrap for the blocking thread.
    let password = password.map(|p| SecretString::new(p.expose_secret().clone()));
    let config = config.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let backend = PdfiumBackend::bind()?;
        extract_bytes(&backend, &bytes, password.as_ref(), &config)
    })
    .await
    .map_err(|e| StatementError::Internal(format!("Extraction task panicked: {}", e)))??;

    match outcome {
        RunOutcome::Completed(output) => Ok(*output),
        RunOutcome::PasswordRequired => Err(StatementError::PasswordRequired),
    }
}

/// Synchronous wrapper around [`extract_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_file_sync(
    path: impl AsRef<Path>,
    password: Option<&SecretString>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, StatementError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StatementError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_file(path, password, config))
}

/// Extract a statement and write its CSV to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial CSV behind.
pub async fn extract_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    password: Option<&SecretString>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, StatementError> {
    let output = extract_file(input_path, password, config).await?;
    write_atomic(output_path.as_ref(), output.csv.as_bytes()).await?;
    Ok(output.stats)
}

/// Write `contents` to `path` through a sibling temp file.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StatementError> {
    let fail = |e| StatementError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }
    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;
    Ok(())
}

/// Read PDF metadata without extracting the statement.
///
/// Only the empty password is tried; for a statement that needs a real
/// password the result has `requires_password` set and nothing else filled.
pub async fn inspect(path: impl AsRef<Path>) -> Result<DocumentMetadata, StatementError> {
    let bytes = input::read_pdf(path.as_ref()).await?;
    if !decrypt::has_pdf_header(&bytes) {
        return Err(DecryptionError::corrupt("no %PDF header").into());
    }
    tokio::task::spawn_blocking(move || PdfiumBackend::bind()?.metadata(&bytes))
        .await
        .map_err(|e| StatementError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out/statement.csv");
        write_atomic(&target, b"Serial No\n").await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"Serial No\n");
        assert!(!target.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn extract_file_reports_missing_input() {
        let err = extract_file("/no/such/statement.pdf", None, &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn inspect_rejects_non_pdf_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello").unwrap();
        let err = inspect(&path).await.unwrap_err();
        assert!(matches!(err, StatementError::Decryption(_)));
    }
}

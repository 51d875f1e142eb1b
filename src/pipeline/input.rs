//! Input resolution: read a local statement PDF into memory.
//!
//! The whole file is read up front; pdfium then parses it from the byte
//! slice, so an encrypted statement is never copied or decrypted to disk.

use crate::error::StatementError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read the file at `path`, mapping I/O failures to [`StatementError`].
pub async fn read_pdf(path: &Path) -> Result<Vec<u8>, StatementError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| map_io_error(path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

fn map_io_error(path: &Path, e: std::io::Error) -> StatementError {
    let path = path.to_path_buf();
    match e.kind() {
        ErrorKind::NotFound => StatementError::FileNotFound { path },
        ErrorKind::PermissionDenied => StatementError::PermissionDenied { path },
        _ => StatementError::ReadFailed { path, source: e },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = read_pdf(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn reads_whole_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4 fake").unwrap();
        let bytes = read_pdf(tmp.path()).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn directory_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_pdf(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            StatementError::ReadFailed { .. } | StatementError::PermissionDenied { .. }
        ));
    }
}

//! Decryption gate: turn PDF bytes into a plaintext-readable document.
//!
//! The gate never prompts. It tries the empty password itself (many bank
//! exports are "encrypted" with a blank user password) and otherwise reports
//! [`UnlockOutcome::PasswordRequired`], leaving it to the caller to come back
//! with a password. Nothing is written to disk: the backend reads straight
//! from the byte slice and the password lives in a [`SecretString`] that is
//! zeroized when the caller drops it.

use crate::error::{DecryptionError, DecryptionFailure};
use crate::model::PageContent;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Why a backend refused to open a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The (possibly empty) password did not unlock the document.
    PasswordRejected,
    /// The security handler is not supported.
    UnsupportedSecurity(String),
    /// The bytes are not a readable PDF.
    Corrupt(String),
}

/// A PDF decoding library, reduced to what the pipeline needs.
///
/// `open` must return every page's text and positioned text runs, fully
/// decoded, so no backend handle outlives the call.
pub trait PdfBackend {
    fn open(&self, bytes: &[u8], password: Option<&str>) -> Result<Vec<PageContent>, OpenError>;
}

/// How the document was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    NotEncrypted,
    EmptyPassword,
    SuppliedPassword,
}

/// A document whose pages can be read.
#[derive(Debug, Clone)]
pub struct UnlockedDocument {
    pub pages: Vec<PageContent>,
    pub encrypted: bool,
    pub unlocked_with: UnlockMethod,
}

impl UnlockedDocument {
    /// Wrap pages that never needed unlocking.
    pub fn plain(pages: Vec<PageContent>) -> Self {
        Self {
            pages,
            encrypted: false,
            unlocked_with: UnlockMethod::NotEncrypted,
        }
    }
}

/// Result of one pass through the gate.
#[derive(Debug)]
pub enum UnlockOutcome {
    Unlocked(UnlockedDocument),
    /// Encrypted; the empty password failed and none was supplied.
    PasswordRequired,
}

/// Only the first KiB may precede the `%PDF-` header.
const HEADER_WINDOW: usize = 1024;

/// True when the bytes carry a PDF header.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// True when the file references an encryption dictionary.
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    bytes.windows(8).any(|w| w == b"/Encrypt")
}

/// Resolve `bytes` to a readable document.
///
/// Tries the empty password first, then `password` if one was supplied.
///
/// # Errors
/// [`DecryptionError`] with `corrupt_file` for unreadable bytes,
/// `unsupported_scheme` for unknown security handlers and `wrong_password`
/// when the supplied password is rejected.
pub fn unlock<B: PdfBackend + ?Sized>(
    backend: &B,
    bytes: &[u8],
    password: Option<&SecretString>,
) -> Result<UnlockOutcome, DecryptionError> {
    if !has_pdf_header(bytes) {
        return Err(DecryptionError::corrupt(format!(
            "no %PDF header in the first {} bytes",
            bytes.len().min(HEADER_WINDOW)
        )));
    }
    let encrypted = looks_encrypted(bytes);
    debug!("PDF header found ({} bytes, encrypted={})", bytes.len(), encrypted);

    match backend.open(bytes, None) {
        Ok(pages) => {
            let unlocked_with = if encrypted {
                info!("Encrypted PDF opened with the empty password");
                UnlockMethod::EmptyPassword
            } else {
                UnlockMethod::NotEncrypted
            };
            Ok(UnlockOutcome::Unlocked(UnlockedDocument {
                pages,
                encrypted,
                unlocked_with,
            }))
        }
        Err(OpenError::PasswordRejected) => {
            let Some(password) = password else {
                info!("PDF is encrypted; a password is required");
                return Ok(UnlockOutcome::PasswordRequired);
            };
            match backend.open(bytes, Some(password.expose_secret())) {
                Ok(pages) => {
                    info!("Encrypted PDF opened with the supplied password");
                    Ok(UnlockOutcome::Unlocked(UnlockedDocument {
                        pages,
                        encrypted: true,
                        unlocked_with: UnlockMethod::SuppliedPassword,
                    }))
                }
                Err(e) => Err(into_decryption_error(e)),
            }
        }
        Err(e) => Err(into_decryption_error(e)),
    }
}

pub(crate) fn into_decryption_error(e: OpenError) -> DecryptionError {
    match e {
        OpenError::PasswordRejected => DecryptionError::wrong_password(),
        OpenError::UnsupportedSecurity(detail) => {
            DecryptionError::new(DecryptionFailure::UnsupportedScheme, detail)
        }
        OpenError::Corrupt(detail) => DecryptionError::corrupt(detail),
    }
}

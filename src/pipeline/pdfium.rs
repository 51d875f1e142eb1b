//! pdfium-backed [`PdfBackend`]: page text and positioned text runs.
//!
//! pdfium is not async-safe, so every call here is blocking; the async entry
//! points in [`crate::extract`] run them inside `spawn_blocking`.
//!
//! The document is read from the in-memory byte slice. Nothing, including
//! the decrypted content, ever touches the file system.

use crate::error::StatementError;
use crate::model::{PageContent, TextBox};
use crate::output::DocumentMetadata;
use crate::pipeline::decrypt::{looks_encrypted, OpenError, PdfBackend};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming an explicit libpdfium to bind to.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// A bound pdfium library.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind to `$PDFIUM_LIB_PATH` if set, otherwise to the system library.
    pub fn bind() -> Result<Self, StatementError> {
        let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                debug!("Binding pdfium from {}", path);
                Pdfium::bind_to_library(&path)
            }
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| StatementError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Read document metadata, trying only the empty password.
    pub fn metadata(&self, bytes: &[u8]) -> Result<DocumentMetadata, StatementError> {
        let encrypted = looks_encrypted(bytes);
        let document = match self.pdfium.load_pdf_from_byte_slice(bytes, None) {
            Ok(doc) => doc,
            Err(e) => {
                return match classify(&e) {
                    OpenError::PasswordRejected => Ok(DocumentMetadata {
                        is_encrypted: true,
                        requires_password: true,
                        ..Default::default()
                    }),
                    other => Err(StatementError::Decryption(
                        crate::pipeline::decrypt::into_decryption_error(other),
                    )),
                };
            }
        };

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
            is_encrypted: encrypted,
            requires_password: false,
        })
    }
}

impl PdfBackend for PdfiumBackend {
    fn open(&self, bytes: &[u8], password: Option<&str>) -> Result<Vec<PageContent>, OpenError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| classify(&e))?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut out = Vec::with_capacity(pages.len() as usize);
        for (idx, page) in pages.iter().enumerate() {
            let number = idx + 1;
            let text = page
                .text()
                .map_err(|e| OpenError::Corrupt(format!("page {number}: {:?}", e)))?;

            let boxes: Vec<TextBox> = text
                .segments()
                .iter()
                .map(|segment| to_text_box(segment.text(), segment.bounds()))
                .collect();
            debug!("Page {}: {} text runs", number, boxes.len());

            out.push(PageContent {
                number,
                text: text.all(),
                boxes,
            });
        }
        Ok(out)
    }
}

#[allow(deprecated)]
fn to_text_box(text: String, bounds: PdfRect) -> TextBox {
    TextBox::new(
        text,
        bounds.left.value,
        bounds.bottom.value,
        bounds.right.value,
        bounds.top.value,
    )
}

/// Map a pdfium load error onto the gate's vocabulary.
fn classify(e: &PdfiumError) -> OpenError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") {
        OpenError::PasswordRejected
    } else if detail.contains("Security") {
        OpenError::UnsupportedSecurity(detail)
    } else {
        OpenError::Corrupt(detail)
    }
}

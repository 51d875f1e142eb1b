//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline walks the selected pages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_stmt2csv::{ExtractionConfig, ExtractionProgressCallback, ExtractionStrategy};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RowCounter {
//!     rows: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for RowCounter {
//!     fn on_page_extracted(&self, _page: usize, _total: usize, _via: ExtractionStrategy, rows: usize) {
//!         self.rows.fetch_add(rows, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(RowCounter { rows: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::model::ExtractionStrategy;
use std::sync::Arc;

/// Called by the extraction pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The trait is `Send + Sync` so a config carrying a
/// callback can be moved onto the blocking thread that drives pdfium.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the document is unlocked, before any page is read.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been turned into raw rows.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — number of selected pages
    /// * `strategy`    — whether the grid or the text fallback produced the rows
    /// * `rows`        — raw rows the page contributed (may be 0)
    fn on_page_extracted(
        &self,
        page_num: usize,
        total_pages: usize,
        strategy: ExtractionStrategy,
        rows: usize,
    ) {
        let _ = (page_num, total_pages, strategy, rows);
    }

    /// Called once the table has been normalised and validated.
    fn on_extraction_complete(&self, records: usize, errors: usize, warnings: usize) {
        let _ = (records, errors, warnings);
    }
}

/// Shared handle stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

/// A callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

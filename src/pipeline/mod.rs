//! Pipeline stages for statement-to-CSV extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the PDF library can be swapped without touching the
//! parsing stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decrypt ──▶ table ─┬──────────▶ normalize ──▶ validate ──▶ export
//! (bytes)   (pdfium)   (layout)└─▶ text ──┘  (typed)      (issues)     (CSV)
//! ```
//!
//! 1. [`input`]     — read the PDF into memory
//! 2. [`decrypt`]   — open it, trying the empty password before asking for one;
//!    [`pdfium`] is the production [`decrypt::PdfBackend`]
//! 3. [`table`]     — grid rows per page, detected by [`layout`] from
//!    positioned text runs
//! 4. [`text`]      — line-based fallback for pages where the grid found nothing
//! 5. [`normalize`] — typed dates, amounts and cheque numbers; serials 1..N
//! 6. [`validate`]  — per-record and continuity checks, never dropping data
//! 7. [`export`]    — fixed eight-column CSV

pub mod decrypt;
pub mod export;
pub mod input;
pub mod layout;
pub mod normalize;
pub mod pdfium;
pub mod table;
pub mod text;
pub mod validate;

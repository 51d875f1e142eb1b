//! Table extractor: detected grid → arity-checked [`GridRow`]s.

use crate::config::ExtractionConfig;
use crate::model::{GridLayout, GridRow, PageContent, RawRow};
use crate::pipeline::layout::detect_grid;
use tracing::{debug, warn};

/// Rows one page's grid produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableExtraction {
    pub rows: Vec<GridRow>,
    /// Balance cell of the opening-balance row, if the page printed one.
    pub opening_balance: Option<String>,
}

impl TableExtraction {
    /// A page with no usable rows goes to the text fallback.
    pub fn needs_fallback(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Extract grid rows from one page.
///
/// Returns an empty extraction when the page has no grid, its grid has an
/// unsupported column count, or any of its rows does not line up with the
/// header. The whole page then goes to the text fallback, so no row is
/// dropped on its own.
pub fn extract_table(page: &PageContent, config: &ExtractionConfig) -> TableExtraction {
    let mut out = TableExtraction::default();

    let Some(grid) = detect_grid(page, config) else {
        debug!("Page {}: no table header found", page.number);
        return out;
    };
    let Some(layout) = GridLayout::from_arity(grid.columns()) else {
        warn!(
            "Page {}: table has {} columns ({}); expected 8 or 6",
            page.number,
            grid.columns(),
            grid.header.join(" | ")
        );
        return out;
    };
    if grid.misaligned > 0 {
        warn!(
            "Page {}: {} of {} rows do not fit the {} header columns; using the text parser",
            page.number,
            grid.misaligned,
            grid.rows.len(),
            layout.arity()
        );
        return out;
    }

    for cells in grid.rows {
        let row = GridRow {
            page: page.number,
            layout,
            cells,
        };
        let raw = RawRow::Grid(row);
        let fields = raw.fields();
        if config.is_opening_balance(&fields.description) {
            debug!("Page {}: opening balance row '{}'", page.number, fields.balance);
            out.opening_balance = Some(fields.balance.to_string());
            continue;
        }
        if let RawRow::Grid(row) = raw {
            out.rows.push(row);
        }
    }

    debug!("Page {}: {} grid rows ({:?})", page.number, out.rows.len(), layout);
    out
}

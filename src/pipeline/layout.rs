//! Grid detection: rebuild a page's table from positioned text runs.
//!
//! The supported statement draws its table with whitespace-separated
//! columns under a single header line. We recover the grid in four steps:
//!
//! 1. group text runs into visual lines by vertical centre;
//! 2. merge runs on a line into cells wherever the horizontal gap is small;
//! 3. take the first header-looking line as the column anchors, with each
//!    boundary halfway between two adjacent header cells;
//! 4. drop every later cell into the column its centre falls in.
//!
//! A line that only fills the description column is a wrapped description.
//! It joins the row above or the row below it, whichever it sits closer to.
//! Lines with neither a date nor an amount are not table rows and are
//! skipped.

use crate::config::ExtractionConfig;
use crate::model::{PageContent, TextBox};
use tracing::debug;

/// A detected table: header labels plus one cell vector per row.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGrid {
    pub header: Vec<String>,
    /// Every row has exactly `header.len()` cells.
    pub rows: Vec<Vec<String>>,
    /// Rows where two separate cells fell into the same non-description
    /// column, i.e. the row does not line up with the header.
    pub misaligned: usize,
}

impl PageGrid {
    pub fn columns(&self) -> usize {
        self.header.len()
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

impl Cell {
    fn centre(&self) -> f32 {
        (self.left + self.right) / 2.0
    }
}

/// A visual line: vertical centre plus its runs, left to right.
#[derive(Debug)]
struct Line {
    y: f32,
    boxes: Vec<TextBox>,
}

/// A table row with the wrapped description lines printed around it.
#[derive(Debug)]
struct RowLine {
    y: f32,
    cells: Vec<String>,
    above: Vec<String>,
    below: Vec<String>,
}

/// A line that fills only the description column.
#[derive(Debug)]
struct WrappedLine {
    y: f32,
    text: String,
    /// Index of the first row printed below this line.
    next_row: usize,
}

/// Gaps closer than this many points are treated as equal.
const GAP_TIE: f32 = 0.5;

const DESCRIPTION_LABELS: &[&str] = &["description", "particulars", "narration", "remarks"];

/// Detect the transaction grid on one page, if the page has one.
pub fn detect_grid(page: &PageContent, config: &ExtractionConfig) -> Option<PageGrid> {
    let lines = group_lines(&page.boxes, config.line_tolerance);
    let mut cells_per_line = lines
        .iter()
        .map(|line| (line.y, merge_cells(&line.boxes, config.cell_gap)));

    let (_, header) = cells_per_line.find(|(_, cells)| is_header(cells))?;
    let labels: Vec<String> = header.iter().map(|c| c.text.clone()).collect();
    let boundaries: Vec<f32> = header
        .windows(2)
        .map(|pair| (pair[0].right + pair[1].left) / 2.0)
        .collect();

    let lower: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let date_col = lower.iter().position(|l| l.contains("date"));
    let desc_col = lower
        .iter()
        .position(|l| DESCRIPTION_LABELS.iter().any(|d| l.contains(d)));
    let amount_cols = labels.len().saturating_sub(3)..labels.len();

    let mut rows: Vec<RowLine> = Vec::new();
    let mut wrapped: Vec<WrappedLine> = Vec::new();
    let mut misaligned = 0;
    for (y, cells) in cells_per_line {
        let joined = cells
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if is_header(&cells) || config.is_noise(&joined) {
            continue;
        }

        let mut row = vec![String::new(); labels.len()];
        let mut collided = false;
        for cell in &cells {
            let col = boundaries.iter().filter(|b| cell.centre() > **b).count();
            let slot = &mut row[col];
            if !slot.is_empty() {
                collided |= Some(col) != desc_col;
                slot.push(' ');
            }
            slot.push_str(&cell.text);
        }

        let filled: Vec<usize> = (0..row.len()).filter(|&i| !row[i].is_empty()).collect();
        if let Some(d) = desc_col.filter(|&d| filled == [d]) {
            wrapped.push(WrappedLine {
                y,
                text: std::mem::take(&mut row[d]),
                next_row: rows.len(),
            });
            continue;
        }

        let has_date = date_col.is_some_and(|d| !row[d].is_empty());
        let has_amount = amount_cols.clone().any(|i| !row[i].is_empty());
        if has_date || has_amount {
            if collided {
                debug!("Page {}: row '{}' does not line up with the header", page.number, joined);
                misaligned += 1;
            }
            rows.push(RowLine {
                y,
                cells: row,
                above: Vec::new(),
                below: Vec::new(),
            });
        } else {
            debug!("Page {}: skipping non-tabular line '{}'", page.number, joined);
        }
    }

    attach_wrapped(&mut rows, wrapped, page.number);

    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|mut r| {
            if let Some(d) = desc_col {
                let parts: Vec<String> = r
                    .above
                    .into_iter()
                    .chain(std::iter::once(std::mem::take(&mut r.cells[d])))
                    .chain(r.below)
                    .filter(|p| !p.is_empty())
                    .collect();
                r.cells[d] = parts.join(" ");
            }
            r.cells
        })
        .collect();

    debug!(
        "Page {}: grid with {} columns and {} rows",
        page.number,
        labels.len(),
        rows.len()
    );
    Some(PageGrid {
        header: labels,
        rows,
        misaligned,
    })
}

/// Hand wrapped description lines to their rows.
///
/// The lines between two rows are split at the widest vertical gap: lines
/// above it continue the upper row, lines below it lead into the lower one.
/// When the gaps are even, the page decides: if it prints narration ahead of
/// its first row, the block belongs to the row below, otherwise to the row
/// above.
fn attach_wrapped(rows: &mut [RowLine], wrapped: Vec<WrappedLine>, page: usize) {
    if rows.is_empty() {
        if !wrapped.is_empty() {
            debug!("Page {}: {} description lines without a row", page, wrapped.len());
        }
        return;
    }
    let narration_first = wrapped.first().is_some_and(|w| w.next_row == 0);

    let mut blocks: Vec<Vec<WrappedLine>> = Vec::new();
    for w in wrapped {
        match blocks.last_mut() {
            Some(block) if block[0].next_row == w.next_row => block.push(w),
            _ => blocks.push(vec![w]),
        }
    }

    for block in blocks {
        let next = block[0].next_row;
        let split = if next == 0 {
            0
        } else if next == rows.len() {
            block.len()
        } else {
            let mut ys = vec![rows[next - 1].y];
            ys.extend(block.iter().map(|w| w.y));
            ys.push(rows[next].y);
            let gaps: Vec<f32> = ys.windows(2).map(|p| (p[0] - p[1]).abs()).collect();
            let widest = gaps.iter().copied().fold(0.0_f32, f32::max);
            let mut ties = (0..gaps.len()).filter(|&i| gaps[i] >= widest - GAP_TIE);
            let pick = if narration_first { ties.next() } else { ties.last() };
            pick.unwrap_or(0)
        };

        for (i, w) in block.into_iter().enumerate() {
            if i < split {
                rows[next - 1].below.push(w.text);
            } else {
                rows[next].above.push(w.text);
            }
        }
    }
}

/// A line reads like the column header when it names a date, a debit and a
/// balance column.
fn is_header(cells: &[Cell]) -> bool {
    let joined = cells
        .iter()
        .map(|c| c.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    joined.contains("date")
        && joined.contains("balance")
        && (joined.contains("debit") || joined.contains("withdrawal"))
}

/// Group boxes into lines, top of page first, each line sorted left to right.
fn group_lines(boxes: &[TextBox], tolerance: f32) -> Vec<Line> {
    let mut sorted: Vec<&TextBox> = boxes.iter().filter(|b| !b.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| {
        b.centre_y()
            .total_cmp(&a.centre_y())
            .then(a.left.total_cmp(&b.left))
    });

    let mut lines: Vec<(f32, Vec<TextBox>)> = Vec::new();
    for b in sorted {
        match lines.last_mut() {
            Some((anchor, line)) if (*anchor - b.centre_y()).abs() <= tolerance => {
                line.push(b.clone())
            }
            _ => lines.push((b.centre_y(), vec![b.clone()])),
        }
    }

    lines
        .into_iter()
        .map(|(y, mut boxes)| {
            boxes.sort_by(|a, b| a.left.total_cmp(&b.left));
            Line { y, boxes }
        })
        .collect()
}

/// Merge horizontally adjacent boxes into cells.
fn merge_cells(line: &[TextBox], gap: f32) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for b in line {
        let text = b.text.trim();
        match cells.last_mut() {
            Some(cell) if b.left - cell.right <= gap => {
                cell.text.push(' ');
                cell.text.push_str(text);
                cell.right = cell.right.max(b.right);
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                left: b.left,
                right: b.right,
            }),
        }
    }
    cells
}

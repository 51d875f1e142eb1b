//! Text fallback parser: rebuild rows from a page's plain text lines.
//!
//! Used for pages where the grid produced nothing. The layout prints a
//! transaction as one line starting with an optional serial number and the
//! transaction date, usually ending with the debit, credit and balance
//! columns. Long narrations wrap onto extra lines, which pdfium may emit
//! either before or after the line carrying the date.

use crate::config::ExtractionConfig;
use crate::model::{PageContent, TextRow};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Serial, transaction date, optional value date, remainder.
static RE_ROW_START: Lazy<Regex> = Lazy::new(|| {
    let date = r"\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4}|\d{4}-\d{2}-\d{2}|\d{1,2}[- ][A-Za-z]{3,9}[- ]\d{2,4}";
    Regex::new(&format!(
        r"^(?:(?P<serial>\d{{1,5}})\s+)?(?P<date>{date})(?:\s+(?P<value>{date}))?(?:\s+(?P<rest>.*))?$"
    ))
    .unwrap()
});

/// Amount column token: `1,234.50`, `-500`, `9,876.00Cr` or a lone `-`.
static RE_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:-|-?[\d,]*\d(?:\.\d+)?(?i:cr|dr)?)$").unwrap());

static RE_CR_DR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i:cr|dr)$").unwrap());

/// Rows one page's text produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextExtraction {
    pub rows: Vec<TextRow>,
    /// Balance printed on the opening-balance line, if the page had one.
    pub opening_balance: Option<String>,
}

/// A line split into leading text and its trailing amount columns.
#[derive(Debug, Default)]
struct SplitLine {
    description: Vec<String>,
    cheque: String,
    amounts: Option<[String; 3]>,
    /// Trailing amount tokens when fewer than three were found.
    partial: usize,
}

/// Parse one page's text into rows.
pub fn parse_page_text(page: &PageContent, config: &ExtractionConfig) -> TextExtraction {
    Parser::new(page.number, config).run(page.lines())
}

struct Parser<'a> {
    page: usize,
    config: &'a ExtractionConfig,
    out: TextExtraction,
    /// Lines waiting to prefix the next row's description.
    pending: Vec<String>,
    current: Option<TextRow>,
}

impl<'a> Parser<'a> {
    fn new(page: usize, config: &'a ExtractionConfig) -> Self {
        Self {
            page,
            config,
            out: TextExtraction::default(),
            pending: Vec::new(),
            current: None,
        }
    }

    fn run<'l>(mut self, lines: impl Iterator<Item = &'l str>) -> TextExtraction {
        for line in lines {
            if self.config.is_noise(line) {
                continue;
            }
            if self.config.is_opening_balance(&self.label_text(line)) {
                self.opening_balance(line);
            } else if !self.try_row_start(line) {
                self.continuation(line);
            }
        }
        self.flush();
        if !self.pending.is_empty() {
            debug!(
                "Page {}: {} trailing text lines not attached to a row",
                self.page,
                self.pending.len()
            );
        }
        self.out
    }

    /// A date column token. Two-digit years still open a row so the
    /// normaliser can report the date instead of the row vanishing.
    fn is_date(&self, token: &str) -> bool {
        self.config.parse_date(token).is_some() || self.config.is_short_year_date(token)
    }

    /// The words of a line between its leading serial/dates and its trailing
    /// amount columns.
    fn label_text(&self, line: &str) -> String {
        let body = match RE_ROW_START.captures(line) {
            Some(caps)
                if caps.name("date").is_some_and(|m| self.is_date(m.as_str())) =>
            {
                let value = caps
                    .name("value")
                    .filter(|m| !self.is_date(m.as_str()))
                    .map_or("", |m| m.as_str());
                format!("{} {}", value, caps.name("rest").map_or("", |m| m.as_str()))
            }
            _ => line.to_string(),
        };
        let tokens = tokenize(&body);
        let end = tokens
            .iter()
            .rposition(|t| !RE_AMOUNT.is_match(t))
            .map_or(0, |i| i + 1);
        tokens[..end].join(" ")
    }

    fn opening_balance(&mut self, line: &str) {
        self.flush();
        self.pending.clear();
        let tokens = tokenize(line);
        if let Some(last) = tokens.last().filter(|t| RE_AMOUNT.is_match(t) && *t != "-") {
            debug!("Page {}: opening balance '{}'", self.page, last);
            self.out.opening_balance = Some(last.clone());
        }
    }

    /// Start a new row when the line opens with a parseable date.
    fn try_row_start(&mut self, line: &str) -> bool {
        let Some(caps) = RE_ROW_START.captures(line) else {
            return false;
        };
        let date = caps.name("date").map_or("", |m| m.as_str());
        if !self.is_date(date) {
            return false;
        }

        self.flush();

        let mut rest = caps.name("rest").map_or("", |m| m.as_str()).to_string();
        let value_date = match caps.name("value").map(|m| m.as_str()) {
            Some(v) if self.is_date(v) => Some(v.to_string()),
            Some(v) => {
                rest = format!("{v} {rest}");
                None
            }
            None => None,
        };

        let split = split_line(&rest);
        let mut description = std::mem::take(&mut self.pending);
        let mut row = TextRow {
            page: self.page,
            serial: caps.name("serial").map(|m| m.as_str().to_string()),
            transaction_date: date.to_string(),
            value_date,
            ..Default::default()
        };

        match split.amounts {
            Some([debit, credit, balance]) => {
                description.extend(split.description);
                row.cheque = split.cheque;
                row.debit = debit;
                row.credit = credit;
                row.balance = balance;
            }
            None => {
                if split.partial > 0 {
                    debug!(
                        "Page {}: row '{}' has {} of 3 amount columns; waiting for more",
                        self.page, date, split.partial
                    );
                }
                description.extend(split_words(&rest));
            }
        }
        row.description = description;
        self.current = Some(row);
        true
    }

    fn continuation(&mut self, line: &str) {
        let Some(row) = self.current.as_mut() else {
            self.pending.push(line.to_string());
            return;
        };

        let has_amounts = !(row.debit.is_empty() && row.credit.is_empty() && row.balance.is_empty());
        if !has_amounts {
            let split = split_line(line);
            if let Some([debit, credit, balance]) = split.amounts {
                row.description.extend(split.description);
                if row.cheque.is_empty() {
                    row.cheque = split.cheque;
                }
                row.debit = debit;
                row.credit = credit;
                row.balance = balance;
                self.flush();
                return;
            }
        }
        row.description.push(line.to_string());
    }

    fn flush(&mut self) {
        if let Some(row) = self.current.take() {
            self.out.rows.push(row);
        }
    }
}

/// Whitespace tokens with a detached `Cr`/`Dr` marker glued to its amount.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for tok in line.split_whitespace() {
        if RE_CR_DR.is_match(tok) {
            if let Some(prev) = tokens.last_mut() {
                if prev != "-" && RE_AMOUNT.is_match(prev) {
                    prev.push_str(tok);
                    continue;
                }
            }
        }
        tokens.push(tok.to_string());
    }
    tokens
}

fn split_words(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Split trailing amount columns (up to three) and a cheque token off a line.
fn split_line(line: &str) -> SplitLine {
    let tokens = tokenize(line);
    let trailing = tokens
        .iter()
        .rev()
        .take(3)
        .take_while(|t| RE_AMOUNT.is_match(t))
        .count();

    if trailing < 3 {
        return SplitLine {
            partial: trailing,
            ..Default::default()
        };
    }

    let (head, amounts) = tokens.split_at(tokens.len() - 3);
    let mut head = head.to_vec();
    let cheque = match head.last() {
        Some(t) if t == "-" || (t.len() <= 12 && t.chars().all(|c| c.is_ascii_digit())) => {
            head.pop().unwrap_or_default()
        }
        _ => String::new(),
    };

    SplitLine {
        description: split_words(&head.join(" ")).into_iter().collect(),
        cheque,
        amounts: Some([amounts[0].clone(), amounts[1].clone(), amounts[2].clone()]),
        partial: 3,
    }
}

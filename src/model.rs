//! Core data types shared by every pipeline stage.
//!
//! ```text
//! PageContent ──▶ RawRow ──▶ TransactionRecord ──▶ ValidationIssue
//!  (backend)     (extract)     (normalize)            (validate)
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// The fixed CSV header, in column order.
pub const CSV_HEADER: [&str; 8] = [
    "Serial No",
    "Transaction Date",
    "Value Date",
    "Description",
    "Cheque Number",
    "Debit",
    "Credit",
    "Balance",
];

/// Output date format for every date column.
pub const OUTPUT_DATE_FORMAT: &str = "%d/%m/%Y";

// ── Decoded pages ────────────────────────────────────────────────────────

/// A run of text with its bounding box, in PDF points (y axis points up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextBox {
    pub fn new(text: impl Into<String>, left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            text: text.into(),
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn centre_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// One page of a plaintext-readable document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// 1-indexed page number in the source document.
    pub number: usize,
    /// Page text in reading order, lines separated by `\n`.
    pub text: String,
    /// Positioned text runs used for grid detection.
    pub boxes: Vec<TextBox>,
}

impl PageContent {
    /// Trimmed, non-empty text lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Which stage produced a page's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    Grid,
    TextFallback,
}

// ── Raw rows ─────────────────────────────────────────────────────────────

/// Column shapes the table extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLayout {
    /// Serial | Txn Date | Value Date | Description | Cheque | Debit | Credit | Balance
    EightColumn,
    /// Date | Description | Cheque | Debit | Credit | Balance
    SixColumn,
}

impl GridLayout {
    pub fn arity(&self) -> usize {
        match self {
            GridLayout::EightColumn => 8,
            GridLayout::SixColumn => 6,
        }
    }

    pub fn from_arity(n: usize) -> Option<Self> {
        match n {
            8 => Some(GridLayout::EightColumn),
            6 => Some(GridLayout::SixColumn),
            _ => None,
        }
    }
}

/// A row read from a detected table grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub page: usize,
    pub layout: GridLayout,
    pub cells: Vec<String>,
}

/// A row reconstructed from page text by the fallback parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRow {
    pub page: usize,
    pub serial: Option<String>,
    pub transaction_date: String,
    pub value_date: Option<String>,
    /// Description fragments in source order, one per contributing line.
    pub description: Vec<String>,
    pub cheque: String,
    pub debit: String,
    pub credit: String,
    pub balance: String,
}

/// An untyped extracted row, tagged by the stage that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawRow {
    Grid(GridRow),
    Text(TextRow),
}

/// The positional view every [`RawRow`] variant reduces to.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFields<'a> {
    pub serial: &'a str,
    pub transaction_date: &'a str,
    pub value_date: &'a str,
    pub description: Cow<'a, str>,
    pub cheque: &'a str,
    pub debit: &'a str,
    pub credit: &'a str,
    pub balance: &'a str,
}

impl RawRow {
    pub fn page(&self) -> usize {
        match self {
            RawRow::Grid(r) => r.page,
            RawRow::Text(r) => r.page,
        }
    }

    pub fn layout(&self) -> SourceLayout {
        match self {
            RawRow::Grid(GridRow {
                layout: GridLayout::EightColumn,
                ..
            }) => SourceLayout::Grid8,
            RawRow::Grid(GridRow {
                layout: GridLayout::SixColumn,
                ..
            }) => SourceLayout::Grid6,
            RawRow::Text(_) => SourceLayout::Text,
        }
    }

    /// Align the row to the eight output columns.
    pub fn fields(&self) -> RawFields<'_> {
        match self {
            RawRow::Grid(row) => {
                let cell = |i: usize| row.cells.get(i).map(String::as_str).unwrap_or("");
                match row.layout {
                    GridLayout::EightColumn => RawFields {
                        serial: cell(0),
                        transaction_date: cell(1),
                        value_date: cell(2),
                        description: Cow::Borrowed(cell(3)),
                        cheque: cell(4),
                        debit: cell(5),
                        credit: cell(6),
                        balance: cell(7),
                    },
                    GridLayout::SixColumn => RawFields {
                        serial: "",
                        transaction_date: cell(0),
                        value_date: "",
                        description: Cow::Borrowed(cell(1)),
                        cheque: cell(2),
                        debit: cell(3),
                        credit: cell(4),
                        balance: cell(5),
                    },
                }
            }
            RawRow::Text(row) => RawFields {
                serial: row.serial.as_deref().unwrap_or(""),
                transaction_date: &row.transaction_date,
                value_date: row.value_date.as_deref().unwrap_or(""),
                description: Cow::Owned(row.description.join(" ")),
                cheque: &row.cheque,
                debit: &row.debit,
                credit: &row.credit,
                balance: &row.balance,
            },
        }
    }

    /// The eight positional cells as owned strings.
    pub fn cells(&self) -> Vec<String> {
        let f = self.fields();
        vec![
            f.serial.to_string(),
            f.transaction_date.to_string(),
            f.value_date.to_string(),
            f.description.into_owned(),
            f.cheque.to_string(),
            f.debit.to_string(),
            f.credit.to_string(),
            f.balance.to_string(),
        ]
    }
}

// ── Records ──────────────────────────────────────────────────────────────

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLayout {
    Grid8,
    Grid6,
    Text,
}

/// A typed column of [`TransactionRecord`] that cleaning can reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    TransactionDate,
    ValueDate,
    ChequeNumber,
    Debit,
    Credit,
    Balance,
}

impl RecordField {
    /// CSV column name.
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::TransactionDate => "Transaction Date",
            RecordField::ValueDate => "Value Date",
            RecordField::ChequeNumber => "Cheque Number",
            RecordField::Debit => "Debit",
            RecordField::Credit => "Credit",
            RecordField::Balance => "Balance",
        }
    }
}

/// Raw text that failed cleaning; the field is null in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedField {
    pub field: RecordField,
    pub raw: String,
}

/// One normalised statement transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// 1-based position in the output table.
    pub serial: u32,
    pub transaction_date: Option<NaiveDate>,
    pub value_date: Option<NaiveDate>,
    pub description: String,
    /// Digits only.
    pub cheque_number: Option<String>,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub balance: Option<Decimal>,
    /// 1-indexed source page.
    pub page: usize,
    pub source_layout: SourceLayout,
    /// Serial number printed on the statement, if any.
    pub source_serial: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedField>,
}

impl TransactionRecord {
    pub fn rejected_field(&self, field: RecordField) -> Option<&RejectedField> {
        self.rejected.iter().find(|r| r.field == field)
    }

    /// Net movement (credit − debit), treating nulls as zero.
    pub fn net_movement(&self) -> Decimal {
        self.credit.unwrap_or_default() - self.debit.unwrap_or_default()
    }
}

// ── Validation ───────────────────────────────────────────────────────────

/// Issue severity. `Error` sorts before `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Identifier of the validation rule that raised an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueRule {
    MovementAmbiguous,
    MissingBalance,
    InvalidField,
    InvalidDate,
    NoMovement,
    EmptyDescription,
    MissingDate,
    BalanceDiscontinuity,
    SourceSerialGap,
    MissingValueDate,
}

impl IssueRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueRule::MovementAmbiguous => "movement_ambiguous",
            IssueRule::MissingBalance => "missing_balance",
            IssueRule::InvalidField => "invalid_field",
            IssueRule::InvalidDate => "invalid_date",
            IssueRule::NoMovement => "no_movement",
            IssueRule::EmptyDescription => "empty_description",
            IssueRule::MissingDate => "missing_date",
            IssueRule::BalanceDiscontinuity => "balance_discontinuity",
            IssueRule::SourceSerialGap => "source_serial_gap",
            IssueRule::MissingValueDate => "missing_value_date",
        }
    }

    /// Severity this rule always reports at.
    pub fn severity(&self) -> Severity {
        match self {
            IssueRule::MovementAmbiguous
            | IssueRule::MissingBalance
            | IssueRule::InvalidField
            | IssueRule::InvalidDate => Severity::Error,
            IssueRule::NoMovement
            | IssueRule::EmptyDescription
            | IssueRule::MissingDate
            | IssueRule::BalanceDiscontinuity
            | IssueRule::SourceSerialGap
            | IssueRule::MissingValueDate => Severity::Warning,
        }
    }
}

impl fmt::Display for IssueRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding attached to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Serial number of the offending record.
    pub serial: u32,
    pub rule: IssueRule,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(rule: IssueRule, serial: u32, message: impl Into<String>) -> Self {
        Self {
            severity: rule.severity(),
            serial,
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] {}",
            self.serial, self.severity, self.rule, self.message
        )
    }
}

/// Issue counts, for deciding whether to block an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl IssueSummary {
    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        let errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        Self {
            total: issues.len(),
            errors,
            warnings: issues.len() - errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

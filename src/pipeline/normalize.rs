//! Row normalizer: [`RawRow`] → typed [`TransactionRecord`].
//!
//! Cleaning never guesses. A value that is present but unreadable becomes
//! null in the record and is kept, with its raw text, in
//! [`TransactionRecord::rejected`] so validation can report it.

use crate::config::ExtractionConfig;
use crate::error::{RowShapeError, ShapeProblem};
use crate::model::{RawRow, RecordField, RejectedField, TransactionRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

static RE_UNSIGNED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

static RE_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<neg>-)?(?P<num>\d+(?:\.\d+)?)(?P<mark>(?i:cr|dr))?$").unwrap());

/// Outcome of cleaning one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleaned<T> {
    /// Empty or a lone `-`.
    Null,
    Value(T),
    /// Present but unreadable.
    Rejected,
}

impl<T> Cleaned<T> {
    fn into_field(self, field: RecordField, raw: &str, rejected: &mut Vec<RejectedField>) -> Option<T> {
        match self {
            Cleaned::Null => None,
            Cleaned::Value(v) => Some(v),
            Cleaned::Rejected => {
                rejected.push(RejectedField {
                    field,
                    raw: raw.trim().to_string(),
                });
                None
            }
        }
    }
}

/// Records and rejected rows of one normalization pass.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<TransactionRecord>,
    pub rejected: Vec<RowShapeError>,
}

fn is_blank(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t == "-"
}

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

/// Clean a debit or credit cell: thousands separators dropped, non-negative.
pub fn clean_amount(raw: &str) -> Cleaned<Decimal> {
    if is_blank(raw) {
        return Cleaned::Null;
    }
    let s = compact(raw);
    if !RE_UNSIGNED.is_match(&s) {
        return Cleaned::Rejected;
    }
    Decimal::from_str(&s).map_or(Cleaned::Rejected, Cleaned::Value)
}

/// Clean a balance cell. A leading `-` or a trailing `Dr` makes it negative.
pub fn clean_balance(raw: &str) -> Cleaned<Decimal> {
    if is_blank(raw) {
        return Cleaned::Null;
    }
    let s = compact(raw);
    let Some(caps) = RE_BALANCE.captures(&s) else {
        return Cleaned::Rejected;
    };
    let Ok(value) = Decimal::from_str(&caps["num"]) else {
        return Cleaned::Rejected;
    };
    let overdrawn = caps.name("neg").is_some()
        || caps
            .name("mark")
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case("dr"));
    Cleaned::Value(if overdrawn { -value } else { value })
}

/// Clean a cheque cell down to its digits.
pub fn clean_cheque(raw: &str) -> Cleaned<String> {
    let s: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        Cleaned::Null
    } else if s.chars().all(|c| c.is_ascii_digit()) {
        Cleaned::Value(s)
    } else {
        Cleaned::Rejected
    }
}

/// Collapse every whitespace run, including joined line breaks, to one space.
pub fn clean_description(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_date(raw: &str, config: &ExtractionConfig) -> Cleaned<chrono::NaiveDate> {
    if is_blank(raw) {
        return Cleaned::Null;
    }
    config
        .parse_date(raw)
        .map_or(Cleaned::Rejected, Cleaned::Value)
}

/// Normalize one row into the record at position `serial`.
///
/// # Errors
/// [`RowShapeError`] when the row has no transaction date text, or none of
/// debit, credit and balance carries a value.
pub fn normalize_row(
    raw: &RawRow,
    serial: u32,
    config: &ExtractionConfig,
) -> Result<TransactionRecord, RowShapeError> {
    let f = raw.fields();

    let problem = if is_blank(f.transaction_date) {
        Some(ShapeProblem::MissingDate)
    } else if is_blank(f.debit) && is_blank(f.credit) && is_blank(f.balance) {
        Some(ShapeProblem::MissingAmounts)
    } else {
        None
    };
    if let Some(reason) = problem {
        return Err(RowShapeError {
            page: raw.page(),
            reason,
            cells: raw.cells(),
        });
    }

    let mut rejected = Vec::new();
    let transaction_date = clean_date(f.transaction_date, config).into_field(
        RecordField::TransactionDate,
        f.transaction_date,
        &mut rejected,
    );
    let value_date =
        clean_date(f.value_date, config).into_field(RecordField::ValueDate, f.value_date, &mut rejected);
    let cheque_number =
        clean_cheque(f.cheque).into_field(RecordField::ChequeNumber, f.cheque, &mut rejected);
    let debit = clean_amount(f.debit).into_field(RecordField::Debit, f.debit, &mut rejected);
    let credit = clean_amount(f.credit).into_field(RecordField::Credit, f.credit, &mut rejected);
    let balance = clean_balance(f.balance).into_field(RecordField::Balance, f.balance, &mut rejected);

    if !rejected.is_empty() {
        debug!("Record #{}: {} field(s) failed cleaning", serial, rejected.len());
    }

    Ok(TransactionRecord {
        serial,
        transaction_date,
        value_date,
        description: clean_description(&f.description),
        cheque_number,
        debit,
        credit,
        balance,
        page: raw.page(),
        source_layout: raw.layout(),
        source_serial: f.serial.trim().parse().ok(),
        rejected,
    })
}

/// Normalize every row in order, numbering accepted records 1..N.
pub fn normalize_rows(rows: &[RawRow], config: &ExtractionConfig) -> Normalized {
    let mut out = Normalized::default();
    for raw in rows {
        let serial = u32::try_from(out.records.len() + 1).unwrap_or(u32::MAX);
        match normalize_row(raw, serial, config) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                warn!("{} (cells: {:?})", e, e.cells);
                out.rejected.push(e);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridLayout, GridRow, SourceLayout, TextRow};
    use chrono::NaiveDate;

    fn grid8(cells: [&str; 8]) -> RawRow {
        RawRow::Grid(GridRow {
            page: 1,
            layout: GridLayout::EightColumn,
            cells: cells.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn amounts_drop_separators_and_dash_is_null() {
        assert_eq!(clean_amount("1,234.50"), Cleaned::Value(dec("1234.50")));
        assert_eq!(clean_amount(" 12 345 "), Cleaned::Value(dec("12345")));
        assert_eq!(clean_amount("-"), Cleaned::Null);
        assert_eq!(clean_amount(""), Cleaned::Null);
        assert_eq!(clean_amount("12.3.4"), Cleaned::Rejected);
        assert_eq!(clean_amount("₹100"), Cleaned::Rejected);
        assert_eq!(clean_amount("-100.00"), Cleaned::Rejected);
    }

    #[test]
    fn balance_sign_markers() {
        assert_eq!(clean_balance("9,876.00"), Cleaned::Value(dec("9876.00")));
        assert_eq!(clean_balance("9,876.00Cr"), Cleaned::Value(dec("9876.00")));
        assert_eq!(clean_balance("250.00 Dr"), Cleaned::Value(dec("-250.00")));
        assert_eq!(clean_balance("-250.00"), Cleaned::Value(dec("-250.00")));
        assert_eq!(clean_balance("n/a"), Cleaned::Rejected);
    }

    #[test]
    fn cheque_keeps_digits_only() {
        assert_eq!(clean_cheque("12-34"), Cleaned::Value("1234".to_string()));
        assert_eq!(clean_cheque("-"), Cleaned::Null);
        assert_eq!(clean_cheque("  "), Cleaned::Null);
        assert_eq!(clean_cheque("CHQ12"), Cleaned::Rejected);
    }

    #[test]
    fn description_whitespace_collapses() {
        assert_eq!(clean_description("  Payment to ABC\nCorp   Ltd "), "Payment to ABC Corp Ltd");
    }

    #[test]
    fn full_row_normalizes() {
        let row = grid8([
            "17", "01-03-2024", "02/03/2024", "NEFT  ACME", "-", "1,234.50", "-", "9,876.00",
        ]);
        let rec = normalize_row(&row, 1, &ExtractionConfig::default()).unwrap();
        assert_eq!(rec.serial, 1);
        assert_eq!(rec.transaction_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(rec.value_date, NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(rec.description, "NEFT ACME");
        assert_eq!(rec.cheque_number, None);
        assert_eq!(rec.debit, Some(dec("1234.50")));
        assert_eq!(rec.credit, None);
        assert_eq!(rec.balance, Some(dec("9876.00")));
        assert_eq!(rec.source_serial, Some(17));
        assert_eq!(rec.source_layout, SourceLayout::Grid8);
        assert!(rec.rejected.is_empty());
    }

    #[test]
    fn unreadable_values_are_kept_as_rejections() {
        let row = grid8([
            "1", "31/02/2024", "", "X", "AB-12", "12a", "", "100.00",
        ]);
        let rec = normalize_row(&row, 4, &ExtractionConfig::default()).unwrap();
        assert_eq!(rec.transaction_date, None);
        assert_eq!(rec.debit, None);
        assert_eq!(rec.cheque_number, None);
        let fields: Vec<RecordField> = rec.rejected.iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec![RecordField::TransactionDate, RecordField::ChequeNumber, RecordField::Debit]
        );
        assert_eq!(rec.rejected_field(RecordField::Debit).unwrap().raw, "12a");
    }

    #[test]
    fn shape_errors() {
        let config = ExtractionConfig::default();
        let no_date = grid8(["1", "", "", "X", "", "1.00", "", "2.00"]);
        assert_eq!(
            normalize_row(&no_date, 1, &config).unwrap_err().reason,
            ShapeProblem::MissingDate
        );
        let no_amounts = grid8(["1", "01/03/2024", "", "X", "", "-", "-", ""]);
        let err = normalize_row(&no_amounts, 1, &config).unwrap_err();
        assert_eq!(err.reason, ShapeProblem::MissingAmounts);
        assert_eq!(err.cells.len(), 8);
    }

    #[test]
    fn serials_are_dense_after_rejections() {
        let rows = vec![
            grid8(["5", "01/03/2024", "", "A", "", "1.00", "", "9.00"]),
            grid8(["6", "", "", "B", "", "", "", ""]),
            RawRow::Text(TextRow {
                page: 2,
                serial: Some("7".into()),
                transaction_date: "02/03/2024".into(),
                description: vec!["C".into(), "D".into()],
                debit: "-".into(),
                credit: "3.00".into(),
                balance: "12.00".into(),
                ..Default::default()
            }),
        ];
        let out = normalize_rows(&rows, &ExtractionConfig::default());
        assert_eq!(out.rejected.len(), 1);
        let serials: Vec<u32> = out.records.iter().map(|r| r.serial).collect();
        assert_eq!(serials, vec![1, 2]);
        assert_eq!(out.records[1].description, "C D");
        assert_eq!(out.records[1].source_layout, SourceLayout::Text);
    }
}

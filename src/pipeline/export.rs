//! CSV serializer for the fixed eight-column schema.
//!
//! Output is deterministic: the same records always serialize to the same
//! bytes. Fields are quoted only when they contain a comma, a quote or a
//! line break; nulls are empty cells; amounts are plain decimals at a
//! fixed scale.

use crate::error::StatementError;
use crate::model::{TransactionRecord, CSV_HEADER, OUTPUT_DATE_FORMAT};
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_decimal::Decimal;
use std::io;

/// Render an amount with exactly `scale` decimal places.
pub fn format_amount(value: Decimal, scale: u32) -> String {
    let mut v = value.round_dp(scale);
    if v.is_zero() {
        v.set_sign_positive(true);
    }
    v.rescale(scale);
    v.to_string()
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(OUTPUT_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn format_opt_amount(value: Option<Decimal>, scale: u32) -> String {
    value.map(|v| format_amount(v, scale)).unwrap_or_default()
}

/// The eight output cells of one record.
pub fn record_cells(record: &TransactionRecord, scale: u32) -> [String; 8] {
    [
        record.serial.to_string(),
        format_date(record.transaction_date),
        format_date(record.value_date),
        record.description.clone(),
        record.cheque_number.clone().unwrap_or_default(),
        format_opt_amount(record.debit, scale),
        format_opt_amount(record.credit, scale),
        format_opt_amount(record.balance, scale),
    ]
}

/// Write the header and one line per record to `writer`.
pub fn write_csv<W: io::Write>(
    records: &[TransactionRecord],
    scale: u32,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.write_record(record_cells(record, scale))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialize `records` to a CSV string.
pub fn to_csv_string(records: &[TransactionRecord], scale: u32) -> Result<String, StatementError> {
    let mut buf = Vec::new();
    write_csv(records, scale, &mut buf)
        .map_err(|e| StatementError::Internal(format!("CSV serialization failed: {e}")))?;
    String::from_utf8(buf)
        .map_err(|e| StatementError::Internal(format!("CSV output is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceLayout;
    use std::str::FromStr;

    fn record(serial: u32, description: &str, debit: Option<&str>, balance: &str) -> TransactionRecord {
        TransactionRecord {
            serial,
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            value_date: None,
            description: description.into(),
            cheque_number: None,
            debit: debit.map(|d| Decimal::from_str(d).unwrap()),
            credit: None,
            balance: Some(Decimal::from_str(balance).unwrap()),
            page: 1,
            source_layout: SourceLayout::Text,
            source_serial: None,
            rejected: Vec::new(),
        }
    }

    #[test]
    fn header_and_row_format() {
        let csv = to_csv_string(&[record(1, "NEFT ACME", Some("1234.5"), "9876")], 2).unwrap();
        assert_eq!(
            csv,
            "Serial No,Transaction Date,Value Date,Description,Cheque Number,Debit,Credit,Balance\n\
             1,01/03/2024,,NEFT ACME,,1234.50,,9876.00\n"
        );
    }

    #[test]
    fn quotes_only_when_needed() {
        let csv = to_csv_string(&[record(1, "ACME, \"Ltd\"", None, "1")], 2).unwrap();
        assert!(csv.contains(",\"ACME, \"\"Ltd\"\"\","), "got: {csv}");
        assert!(!csv.contains("\"01/03/2024\""));
    }

    #[test]
    fn serialization_is_idempotent() {
        let records = vec![
            record(1, "A", Some("10"), "90"),
            record(2, "B\nC", None, "90"),
        ];
        let first = to_csv_string(&records, 2).unwrap();
        let second = to_csv_string(&records, 2).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains("\n\n"));
    }

    #[test]
    fn amount_formatting() {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(format_amount(d("1234.5"), 2), "1234.50");
        assert_eq!(format_amount(d("0.005"), 2), "0.00");
        assert_eq!(format_amount(d("-250"), 2), "-250.00");
        assert_eq!(format_amount(d("12.345"), 0), "12");
    }

    #[test]
    fn csv_reads_back_with_the_csv_crate() {
        let csv = to_csv_string(&[record(1, "x", None, "5")], 2).unwrap();
        let mut rdr = csv::Reader::from_reader(csv.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADER.to_vec());
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[7], "5.00");
    }
}

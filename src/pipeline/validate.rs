//! Validator: per-record and whole-table checks.
//!
//! Validation only annotates. Records are never changed or dropped here;
//! callers decide what to do with the issues, usually through
//! [`IssueSummary`](crate::model::IssueSummary).

use crate::config::ExtractionConfig;
use crate::model::{IssueRule, RecordField, TransactionRecord, ValidationIssue};
use rust_decimal::Decimal;
use tracing::debug;

/// Check `records` (in serial order) and return every issue found.
///
/// `opening_balance` seeds the continuity check for the first record.
/// Issues come back ordered by serial, errors before warnings.
pub fn validate(
    records: &[TransactionRecord],
    opening_balance: Option<Decimal>,
    config: &ExtractionConfig,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut previous_balance = opening_balance;
    let mut previous_source_serial: Option<u32> = None;

    for record in records {
        check_record(record, config, &mut issues);

        let ambiguous = record.debit.is_some() && record.credit.is_some();
        if let (Some(prev), Some(balance), false) = (previous_balance, record.balance, ambiguous) {
            let expected = prev + record.net_movement();
            let diff = (balance - expected).abs();
            if diff > config.balance_tolerance {
                issues.push(ValidationIssue::new(
                    IssueRule::BalanceDiscontinuity,
                    record.serial,
                    format!(
                        "Balance {balance} does not follow from previous balance {prev} \
                         and movement {} (expected {expected}, off by {diff})",
                        record.net_movement()
                    ),
                ));
            }
        }
        previous_balance = record.balance;

        if let Some(current) = record.source_serial {
            if let Some(last) = previous_source_serial {
                if current != last.saturating_add(1) {
                    issues.push(ValidationIssue::new(
                        IssueRule::SourceSerialGap,
                        record.serial,
                        format!("Statement serial jumps from {last} to {current}"),
                    ));
                }
            }
            previous_source_serial = Some(current);
        }
    }

    issues.sort_by_key(|i| (i.serial, i.severity));
    debug!("Validated {} records: {} issues", records.len(), issues.len());
    issues
}

fn check_record(r: &TransactionRecord, config: &ExtractionConfig, issues: &mut Vec<ValidationIssue>) {
    let mut push = |rule: IssueRule, message: String| {
        issues.push(ValidationIssue::new(rule, r.serial, message));
    };

    match (r.debit, r.credit) {
        (Some(d), Some(c)) => push(
            IssueRule::MovementAmbiguous,
            format!("Both debit ({d}) and credit ({c}) are set"),
        ),
        (None, None) => push(IssueRule::NoMovement, "Neither debit nor credit is set".into()),
        _ => {}
    }

    if r.balance.is_none() {
        push(IssueRule::MissingBalance, "Balance is missing".into());
    }

    match (r.transaction_date, r.rejected_field(RecordField::TransactionDate)) {
        (None, Some(rej)) => push(
            IssueRule::InvalidDate,
            format!("Transaction date '{}' matches no accepted date format", rej.raw),
        ),
        (None, None) => push(IssueRule::MissingDate, "Transaction date is missing".into()),
        _ => {}
    }

    for rej in r.rejected.iter().filter(|f| f.field != RecordField::TransactionDate) {
        push(
            IssueRule::InvalidField,
            format!("{} '{}' could not be read", rej.field.column(), rej.raw),
        );
    }

    if r.description.is_empty() {
        push(IssueRule::EmptyDescription, "Description is empty".into());
    }

    if config.require_value_date
        && r.value_date.is_none()
        && r.rejected_field(RecordField::ValueDate).is_none()
    {
        push(IssueRule::MissingValueDate, "Value date is missing".into());
    }
}

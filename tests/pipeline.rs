//! Integration tests for the full extraction pipeline.
//!
//! pdfium is replaced by an in-memory [`PdfBackend`] that hands out
//! hand-built pages, so these run everywhere without a PDF library.

use edgequake_stmt2csv::{
    extract_bytes, extract_document, DecryptionFailure, ExtractionConfig,
    ExtractionProgressCallback, ExtractionStrategy, IssueRule, OpenError, PageContent,
    PdfBackend, RunOutcome, SecretString, Severity, StatementError, TextBox, UnlockMethod,
    UnlockedDocument,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const PLAIN_PDF: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";
const ENCRYPTED_PDF: &[u8] = b"%PDF-1.7\ntrailer << /Encrypt 9 0 R >>\n%%EOF";

const COLS: [f32; 8] = [20.0, 60.0, 130.0, 200.0, 330.0, 390.0, 450.0, 510.0];

const HEADER: &[&str] = &[
    "Sr.No",
    "Transaction Date",
    "Value Date",
    "Description",
    "Cheque Number",
    "Debit",
    "Credit",
    "Balance",
];

/// Lay out rows of cells the way the statement prints its table.
fn grid_page(number: usize, rows: &[&[&str]]) -> PageContent {
    let mut boxes = Vec::new();
    for (r, row) in rows.iter().enumerate() {
        let y = 760.0 - 14.0 * r as f32;
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let left = COLS[c];
            let next = COLS.get(c + 1).copied().unwrap_or(left + 100.0);
            let width = (4.0 * cell.chars().count() as f32).min(next - left - 12.0);
            boxes.push(TextBox::new(*cell, left, y - 4.0, left + width, y + 4.0));
        }
    }
    PageContent {
        number,
        text: String::new(),
        boxes,
    }
}

fn text_page(number: usize, text: &str) -> PageContent {
    PageContent {
        number,
        text: text.to_string(),
        boxes: Vec::new(),
    }
}

/// Backend serving fixed pages behind an optional user password.
struct MemoryBackend {
    pages: Vec<PageContent>,
    password: Option<&'static str>,
    opens: AtomicUsize,
}

impl MemoryBackend {
    fn new(pages: Vec<PageContent>) -> Self {
        Self {
            pages,
            password: None,
            opens: AtomicUsize::new(0),
        }
    }

    fn locked(pages: Vec<PageContent>, password: &'static str) -> Self {
        Self {
            password: Some(password),
            ..Self::new(pages)
        }
    }
}

impl PdfBackend for MemoryBackend {
    fn open(&self, _bytes: &[u8], password: Option<&str>) -> Result<Vec<PageContent>, OpenError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.password {
            Some(expected) if password.unwrap_or("") != expected => Err(OpenError::PasswordRejected),
            _ => Ok(self.pages.clone()),
        }
    }
}

fn statement_pages() -> Vec<PageContent> {
    vec![
        grid_page(
            1,
            &[
                &["Account Statement from 01-03-2024 to 31-03-2024", "", "", "", "", "", "", ""],
                HEADER,
                &["", "01/03/2024", "", "Opening Balance", "", "", "", "10,000.00"],
                &["1", "01/03/2024", "01/03/2024", "NEFT ACME", "-", "1,234.50", "-", "8,765.50"],
                &["2", "02-03-2024", "02/03/2024", "Payment to ABC", "000123", "-", "500.00", "9,265.50"],
                &["", "", "", "Corp Ltd", "", "", "", ""],
            ],
        ),
        text_page(
            2,
            "Page 2 of 2\n\
             3 03/03/2024 03/03/2024 ATM WDL - 265.50 - 9,000.00\n\
             09/11/2025 02:53:00 PM",
        ),
    ]
}

fn completed(outcome: RunOutcome) -> edgequake_stmt2csv::ExtractionOutput {
    match outcome {
        RunOutcome::Completed(output) => *output,
        RunOutcome::PasswordRequired => panic!("unexpected PasswordRequired"),
    }
}

fn secret(s: &str) -> SecretString {
    SecretString::new(s.to_string())
}

// ── Full pipeline ────────────────────────────────────────────────────────────

#[test]
fn statement_becomes_strict_csv() {
    let backend = MemoryBackend::new(statement_pages());
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );

    assert_eq!(
        output.csv,
        "Serial No,Transaction Date,Value Date,Description,Cheque Number,Debit,Credit,Balance\n\
         1,01/03/2024,01/03/2024,NEFT ACME,,1234.50,,8765.50\n\
         2,02/03/2024,02/03/2024,Payment to ABC Corp Ltd,000123,,500.00,9265.50\n\
         3,03/03/2024,03/03/2024,ATM WDL,,265.50,,9000.00\n"
    );
    assert!(output.issues.is_empty(), "{:?}", output.issues);
    assert!(output.rejected.is_empty());
    assert_eq!(output.document.unlocked_with, UnlockMethod::NotEncrypted);
    assert_eq!(
        output.document.opening_balance.map(|b| b.to_string()),
        Some("10000.00".to_string())
    );
}

#[test]
fn fallback_runs_only_for_pages_without_grid_rows() {
    let backend = MemoryBackend::new(statement_pages());
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    let strategies: Vec<(usize, ExtractionStrategy, usize)> = output
        .pages
        .iter()
        .map(|p| (p.page, p.strategy, p.rows))
        .collect();
    assert_eq!(
        strategies,
        vec![
            (1, ExtractionStrategy::Grid, 2),
            (2, ExtractionStrategy::TextFallback, 1),
        ]
    );
    assert_eq!(output.stats.grid_pages, 1);
    assert_eq!(output.stats.fallback_pages, 1);
}

#[test]
fn serials_are_exactly_one_to_n() {
    let backend = MemoryBackend::new(statement_pages());
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    let serials: Vec<u32> = output.records.iter().map(|r| r.serial).collect();
    assert_eq!(serials, (1..=output.records.len() as u32).collect::<Vec<_>>());
}

#[test]
fn debit_and_credit_on_one_row_is_never_silent() {
    let pages = vec![text_page(
        1,
        "1 01/03/2024 01/03/2024 REVERSAL - 10.00 10.00 990.00\n\
         2 02/03/2024 02/03/2024 ATM - 90.00 - 900.00",
    )];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );

    assert_eq!(output.records.len(), 2);
    let flagged: Vec<_> = output
        .issues
        .iter()
        .filter(|i| i.rule == IssueRule::MovementAmbiguous)
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].serial, 1);
    assert_eq!(flagged[0].severity, Severity::Error);
    assert!(output.has_errors());
}

#[test]
fn rejected_rows_are_reported_not_fatal() {
    let pages = vec![text_page(
        1,
        "1 01/03/2024 01/03/2024 INTEREST\n\
         2 02/03/2024 02/03/2024 ATM - 90.00 - 900.00",
    )];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].serial, 1);
    assert_eq!(output.records[0].source_serial, Some(2));
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.stats.rejected_rows, 1);
}

#[test]
fn narration_naming_the_opening_balance_keeps_its_row() {
    let pages = vec![text_page(
        1,
        "1 01/03/2024 01/03/2024 ATM - 100.00 - 900.00\n\
         2 02/03/2024 02/03/2024 REVERSAL OF OPENING BALANCE CHG - - 25.00 925.00\n\
         3 03/03/2024 03/03/2024 UPI - 25.00 - 900.00",
    )];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert_eq!(output.records.len(), 3);
    assert_eq!(output.records[1].description, "REVERSAL OF OPENING BALANCE CHG");
    assert!(output.rejected.is_empty());
    assert!(output.issues.is_empty(), "{:?}", output.issues);
    assert_eq!(output.document.opening_balance, None);
}

#[test]
fn narration_printed_above_grid_rows_stays_with_its_row() {
    let pages = vec![grid_page(
        1,
        &[
            HEADER,
            &["", "", "", "NEFT/ACME", "", "", "", ""],
            &["1", "01/03/2024", "01/03/2024", "INV-42", "", "100.00", "", "900.00"],
            &["", "", "", "UPI/BOB", "", "", "", ""],
            &["2", "02/03/2024", "02/03/2024", "SHOP", "", "50.00", "", "850.00"],
        ],
    )];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert_eq!(
        output.csv,
        "Serial No,Transaction Date,Value Date,Description,Cheque Number,Debit,Credit,Balance\n\
         1,01/03/2024,01/03/2024,NEFT/ACME INV-42,,100.00,,900.00\n\
         2,02/03/2024,02/03/2024,UPI/BOB SHOP,,50.00,,850.00\n"
    );
}

#[test]
fn two_digit_year_is_flagged_not_guessed() {
    let pages = vec![text_page(1, "1 01/03/24 01/03/24 ATM - 100.00 - 900.00")];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].transaction_date, None);
    assert!(output.csv.ends_with("\n1,,,ATM,,100.00,,900.00\n"));

    let rules: Vec<IssueRule> = output.issues.iter().map(|i| i.rule).collect();
    assert_eq!(rules, vec![IssueRule::InvalidDate, IssueRule::InvalidField]);
    assert!(output.issues[0].message.contains("'01/03/24'"));
}

#[test]
fn balance_break_is_a_warning() {
    let pages = vec![text_page(
        1,
        "1 01/03/2024 01/03/2024 ATM - 100.00 - 900.00\n\
         2 02/03/2024 02/03/2024 ATM - 100.00 - 750.00",
    )];
    let backend = MemoryBackend::new(pages);
    let output = completed(
        extract_bytes(&backend, PLAIN_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert_eq!(output.issues.len(), 1);
    assert_eq!(output.issues[0].rule, IssueRule::BalanceDiscontinuity);
    assert_eq!(output.issues[0].serial, 2);
    assert!(!output.has_errors());
}

// ── Decryption gate ──────────────────────────────────────────────────────────

#[test]
fn empty_password_statement_opens_without_prompt() {
    let backend = MemoryBackend::locked(statement_pages(), "");
    let output = completed(
        extract_bytes(&backend, ENCRYPTED_PDF, None, &ExtractionConfig::default()).unwrap(),
    );
    assert!(output.document.encrypted);
    assert_eq!(output.document.unlocked_with, UnlockMethod::EmptyPassword);
    assert_eq!(output.records.len(), 3);
}

#[test]
fn locked_statement_asks_for_password() {
    let backend = MemoryBackend::locked(statement_pages(), "1234");
    let outcome = extract_bytes(&backend, ENCRYPTED_PDF, None, &ExtractionConfig::default()).unwrap();
    assert!(matches!(outcome, RunOutcome::PasswordRequired));

    let output = completed(
        extract_bytes(
            &backend,
            ENCRYPTED_PDF,
            Some(&secret("1234")),
            &ExtractionConfig::default(),
        )
        .unwrap(),
    );
    assert_eq!(output.document.unlocked_with, UnlockMethod::SuppliedPassword);
}

#[test]
fn wrong_password_fails_without_processing() {
    let calls = Arc::new(AtomicUsize::new(0));
    struct Counting(Arc<AtomicUsize>);
    impl ExtractionProgressCallback for Counting {
        fn on_extraction_start(&self, _total: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
    let config = ExtractionConfig::builder()
        .progress_callback(Arc::new(Counting(Arc::clone(&calls))))
        .build()
        .unwrap();

    let backend = MemoryBackend::locked(statement_pages(), "1234");
    let err = extract_bytes(&backend, ENCRYPTED_PDF, Some(&secret("0000")), &config).unwrap_err();
    match err {
        StatementError::Decryption(e) => assert_eq!(e.reason, DecryptionFailure::WrongPassword),
        other => panic!("expected decryption error, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.opens.load(Ordering::SeqCst), 2);
}

#[test]
fn garbage_bytes_are_corrupt() {
    let backend = MemoryBackend::new(statement_pages());
    let err = extract_bytes(&backend, b"not a pdf", None, &ExtractionConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        StatementError::Decryption(ref e) if e.reason == DecryptionFailure::CorruptFile
    ));
    assert_eq!(backend.opens.load(Ordering::SeqCst), 0);
}

// ── Callbacks and serialisation ──────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ExtractionProgressCallback for Recorder {
    fn on_extraction_start(&self, total_pages: usize) {
        self.events.lock().unwrap().push(format!("start:{total_pages}"));
    }
    fn on_page_extracted(&self, page: usize, _total: usize, via: ExtractionStrategy, rows: usize) {
        self.events.lock().unwrap().push(format!("page:{page}:{via:?}:{rows}"));
    }
    fn on_extraction_complete(&self, records: usize, errors: usize, warnings: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done:{records}:{errors}:{warnings}"));
    }
}

#[test]
fn progress_events_follow_the_pages() {
    let recorder = Arc::new(Recorder::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let doc = UnlockedDocument::plain(statement_pages());
    extract_document(&doc, &config).unwrap();

    assert_eq!(
        recorder.events.lock().unwrap().as_slice(),
        ["start:2", "page:1:Grid:2", "page:2:TextFallback:1", "done:3:0:0"]
    );
}

#[test]
fn output_serialises_to_json() {
    let config = ExtractionConfig::builder().keep_raw_rows(true).build().unwrap();
    let doc = UnlockedDocument::plain(statement_pages());
    let output = extract_document(&doc, &config).unwrap();

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["records"][0]["debit"], "1234.50");
    assert_eq!(json["records"][0]["transaction_date"], "2024-03-01");
    assert_eq!(json["raw_rows"][0]["source"], "grid");
    assert_eq!(json["raw_rows"][2]["source"], "text");
    assert_eq!(json["document"]["unlocked_with"], "not_encrypted");
}

#[test]
fn config_with_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ExtractionConfig>();
}

//! CLI binary for edgequake-stmt2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and writes the CSV and issue report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_stmt2csv::extract::write_atomic;
use edgequake_stmt2csv::{
    extract_file, inspect, DecryptionFailure, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, ExtractionStrategy, PageSelection, ProgressCallback, SecretString,
    Severity, StatementError,
};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code when `--fail-on-errors` is set and error-severity issues exist.
const EXIT_VALIDATION_ERRORS: i32 = 2;
/// Exit code when the PDF could not be unlocked.
const EXIT_LOCKED: i32 = 3;

/// Issues printed to stderr before the list is cut short.
const MAX_LISTED_ISSUES: usize = 20;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Start as a spinner; the bar length is set by `on_extraction_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_extracted(
        &self,
        page_num: usize,
        total_pages: usize,
        strategy: ExtractionStrategy,
        rows: usize,
    ) {
        let (mark, via) = match (strategy, rows) {
            (_, 0) => (yellow("·"), "no rows"),
            (ExtractionStrategy::Grid, _) => (green("✓"), "grid"),
            (ExtractionStrategy::TextFallback, _) => (cyan("✓"), "text"),
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            mark,
            page_num,
            total_pages,
            dim(via),
            dim(&format!("{rows:>4} rows")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, records: usize, errors: usize, warnings: usize) {
        self.bar.finish_and_clear();
        let mark = if errors > 0 {
            red("✘")
        } else if warnings > 0 {
            yellow("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{} {} records  ({} errors, {} warnings)",
            mark,
            bold(&records.to_string()),
            errors,
            warnings
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic extraction (CSV on stdout)
  stmt2csv statement.pdf

  # Write the CSV and a JSON issue report
  stmt2csv statement.pdf -o statement.csv --issues issues.json

  # Password-protected statement
  STMT2CSV_PASSWORD=secret stmt2csv statement.pdf -o statement.csv

  # Only some pages, extra date format
  stmt2csv --pages 2-5 --date-format %d/%m/%y statement.pdf

  # Full result as JSON, raw rows included
  stmt2csv --json --raw statement.pdf > statement.json

  # Block the export when validation finds errors (exit code 2)
  stmt2csv --fail-on-errors statement.pdf -o statement.csv

  # Inspect PDF metadata only
  stmt2csv --inspect-only statement.pdf

OUTPUT:
  Serial No,Transaction Date,Value Date,Description,Cheque Number,Debit,Credit,Balance
  Dates are DD/MM/YYYY, amounts plain decimals with two places, nulls empty.

EXIT CODES:
  0  CSV written
  1  Extraction failed (unreadable file, no rows, bad arguments)
  2  --fail-on-errors and at least one error-severity issue
  3  PDF is encrypted and the password is missing or wrong

ENVIRONMENT VARIABLES:
  STMT2CSV_PASSWORD   PDF user password
  STMT2CSV_<FLAG>     Every flag, e.g. STMT2CSV_PAGES=2-5, STMT2CSV_INSPECT_ONLY=true
  PDFIUM_LIB_PATH     Path to libpdfium; the system library is used otherwise
  RUST_LOG            Log filter, e.g. edgequake_stmt2csv=debug
"#;

/// Extract bank statement PDFs into a validated CSV.
#[derive(Parser, Debug)]
#[command(
    name = "stmt2csv",
    version,
    about = "Extract bank statement PDFs into a validated eight-column CSV",
    long_about = "Extract the transaction table of a bank statement PDF, normalise dates, \
amounts and cheque numbers, validate movements and running balances, and write a strict \
eight-column CSV. Encrypted statements are opened in memory.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Statement PDF file path.
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "STMT2CSV_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "STMT2CSV_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "STMT2CSV_PAGES", default_value = "all")]
    pages: String,

    /// Accepted input date format (chrono syntax). Repeatable; replaces the defaults.
    #[arg(long = "date-format", env = "STMT2CSV_DATE_FORMATS", value_delimiter = ';')]
    date_formats: Vec<String>,

    /// Largest accepted running-balance mismatch.
    #[arg(long, env = "STMT2CSV_BALANCE_TOLERANCE", default_value = "0.01",
          value_parser = parse_decimal)]
    balance_tolerance: Decimal,

    /// Warn about every record without a value date.
    #[arg(long, env = "STMT2CSV_REQUIRE_VALUE_DATE")]
    require_value_date: bool,

    /// Write issues and rejected rows as JSON to this file.
    #[arg(long, env = "STMT2CSV_ISSUES")]
    issues: Option<PathBuf>,

    /// Output the full result (records, issues, stats) as JSON instead of CSV.
    #[arg(long, env = "STMT2CSV_JSON")]
    json: bool,

    /// Include the raw extracted rows in the JSON output.
    #[arg(long, env = "STMT2CSV_RAW")]
    raw: bool,

    /// Exit with code 2 when any error-severity issue is found.
    #[arg(long, env = "STMT2CSV_FAIL_ON_ERRORS")]
    fail_on_errors: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long, env = "STMT2CSV_INSPECT_ONLY")]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STMT2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STMT2CSV_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "STMT2CSV_NO_PROGRESS")]
    no_progress: bool,
}

fn parse_decimal(s: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(s.trim()).map_err(|e| format!("'{s}' is not a decimal number: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if meta.requires_password {
                println!("Encrypted:    true (password required)");
                return Ok(());
            }
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ExtractionProgressCallback>),
    )?;
    let password = cli.password.clone().map(SecretString::new);

    // ── Run extraction ───────────────────────────────────────────────────
    let result = extract_file(&cli.input, password.as_ref(), &config).await;
    if let Some(ref cb) = progress {
        cb.clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(StatementError::PasswordRequired) => {
            eprintln!(
                "{} {} is encrypted and needs a password.\n  Pass it with --password or STMT2CSV_PASSWORD.",
                red("✘"),
                bold(&cli.input.display().to_string())
            );
            std::process::exit(EXIT_LOCKED);
        }
        Err(StatementError::Decryption(e)) => {
            eprintln!("{} {}", red("✘"), e);
            if e.reason == DecryptionFailure::WrongPassword {
                eprintln!("  Check the password and try again.");
            }
            std::process::exit(EXIT_LOCKED);
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    // ── Write results ────────────────────────────────────────────────────
    let body = if cli.json {
        let mut json =
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        json.push('\n');
        json
    } else {
        output.csv.clone()
    };

    match cli.output {
        Some(ref path) => write_atomic(path, body.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .context("Failed to write to stdout")?;
        }
    }

    if let Some(ref path) = cli.issues {
        let report = serde_json::json!({
            "summary": output.summary(),
            "issues": output.issues,
            "rejected": output.rejected,
        });
        let text = serde_json::to_string_pretty(&report).context("Failed to serialise issues")?;
        write_atomic(path, text.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if !cli.quiet {
        print_summary(&cli, &output, show_progress);
    }

    if cli.fail_on_errors && output.has_errors() {
        std::process::exit(EXIT_VALIDATION_ERRORS);
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .pages(parse_pages(&cli.pages)?)
        .balance_tolerance(cli.balance_tolerance)
        .require_value_date(cli.require_value_date)
        .keep_raw_rows(cli.raw);

    for fmt in &cli.date_formats {
        builder = builder.date_format(fmt.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(cli: &Cli, output: &ExtractionOutput, show_progress: bool) {
    let stats = &output.stats;
    if !show_progress {
        eprintln!(
            "Extracted {} records from {}/{} pages in {}ms",
            stats.records, stats.selected_pages, stats.total_pages, stats.duration_ms
        );
    }
    eprintln!(
        "   {} grid pages  /  {} text pages  /  {} rejected rows",
        dim(&stats.grid_pages.to_string()),
        dim(&stats.fallback_pages.to_string()),
        dim(&stats.rejected_rows.to_string()),
    );
    if let Some(ref path) = cli.output {
        eprintln!("   →  {}", bold(&path.display().to_string()));
    }

    for issue in output.issues.iter().take(MAX_LISTED_ISSUES) {
        let label = match issue.severity {
            Severity::Error => red("error"),
            Severity::Warning => yellow("warn "),
        };
        eprintln!("  {} #{:<4} {}", label, issue.serial, issue.message);
    }
    if output.issues.len() > MAX_LISTED_ISSUES {
        eprintln!(
            "  {}",
            dim(&format!(
                "… {} more (use --issues <file> for the full list)",
                output.issues.len() - MAX_LISTED_ISSUES
            ))
        );
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

//! CLI binary for bol-billing.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! runs one BOL batch and prints the billing lines.

use anyhow::{Context, Result};
use bol_billing::{
    process_file, BatchConfig, BatchProgressCallback, BatchResult, CancellationFlag, Charge,
    ProgressCallback, RateConfig,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per page. Pages may finish out of
/// order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Splitting PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading BOLs");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages priced successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages priced  ({} failed)",
                if failed == total_pages { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Price every BOL in a driver's scan
  bol2bill John_Smith.pdf

  # Four extraction calls in flight
  bol2bill -c 4 John_Smith.pdf

  # Custom tariff and this week's fuel surcharge
  bol2bill --rates rates.json --fuel-surcharge 0.26 John_Smith.pdf

  # JSON response (pageNumber, success, data | error) for another tool
  bol2bill --json John_Smith.pdf > john.json

  # From a URL
  bol2bill https://files.example.com/scans/Ana_Lopez.pdf

RATE FILE:
  JSON matching RateConfig. All twelve zones A-L are required; perPound lists
  the 10000+, 5000+, 2000+ and 1000+ lb rates. e.g.
    { "fuelSurchargePercent": 0.24,
      "zones": { "A": { "perPound": [0.0121, 0.0129, 0.0137, 0.0144], "min": 18, "max": 160 },
                 "B": { "perPound": [0.0132, 0.0140, 0.0147, 0.0157], "min": 20, "max": 180 }, ... } }
  Accessorial fees may be omitted to keep the published defaults.

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (preferred when set)
  OPENAI_API_KEY          OpenAI API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (anthropic, openai, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
"#;

/// Extract shipment data from BOL PDFs and price every page.
#[derive(Parser, Debug)]
#[command(
    name = "bol2bill",
    version,
    about = "Extract shipment data from bill-of-lading PDFs and price every page",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL. One BOL per page.
    input: String,

    /// Vision LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: anthropic, openai, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of concurrent extraction calls.
    #[arg(short, long, env = "BOL2BILL_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// JSON rate table replacing the published tariff.
    #[arg(long, env = "BOL2BILL_RATES")]
    rates: Option<PathBuf>,

    /// Fuel surcharge as a ratio of base freight (0.24 = 24%).
    #[arg(long, env = "BOL2BILL_FUEL_SURCHARGE")]
    fuel_surcharge: Option<f64>,

    /// Path to a text file with a custom extraction instruction.
    #[arg(long, env = "BOL2BILL_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "BOL2BILL_PASSWORD")]
    password: Option<String>,

    /// Max LLM output tokens per page.
    #[arg(long, env = "BOL2BILL_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BOL2BILL_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Print the JSON batch response instead of a table.
    #[arg(long, env = "BOL2BILL_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "BOL2BILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOL2BILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "BOL2BILL_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BOL2BILL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-page extraction call timeout in seconds.
    #[arg(long, env = "BOL2BILL_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    // ── Ensure PDFium engine is available ────────────────────────────────
    #[cfg(feature = "bundled")]
    {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            eprintln!("{} Downloading PDF engine (first run only)…", cyan("◆"));
        }
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let cancel = CancellationFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{} Cancelling after pages in flight…", cyan("⚠"));
                cancel.cancel();
            }
        });
    }

    let config = build_config(&cli, progress_cb, cancel).await?;

    // ── Run batch ────────────────────────────────────────────────────────
    let result = process_file(&cli.input, &config)
        .await
        .context("BOL batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&result.to_response())
            .context("Failed to serialise response")?;
        println!("{json}");
    } else {
        print_table(&result);
        if !cli.quiet {
            eprintln!(
                "   {} tokens in  /  {} tokens out  /  {}ms total",
                dim(&result.stats.total_input_tokens.to_string()),
                dim(&result.stats.total_output_tokens.to_string()),
                result.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
async fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancellationFlag,
) -> Result<BatchConfig> {
    let mut rates = match cli.rates {
        Some(ref path) => RateConfig::from_json_file(path)
            .with_context(|| format!("Failed to load rate table from {:?}", path))?,
        None => RateConfig::default(),
    };
    if let Some(ratio) = cli.fuel_surcharge {
        rates = rates.with_fuel_surcharge(ratio);
    }

    let mut builder = BatchConfig::builder()
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .rates(rates)
        .cancellation(cancel);

    if let Some(ref path) = cli.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Print one row per page, amounts to two decimals.
fn print_table(result: &BatchResult) {
    println!(
        "{}  {}  ({} pages)",
        bold("Driver:"),
        result.driver,
        result.page_count
    );
    println!(
        "{:>4}  {:<14} {:>4} {:>9} {:>9} {:>10} {:>9} {:>9} {:>10}",
        "Page", "PRO#", "Zone", "Weight", "Chg Wt", "Freight", "Fuel", "Access.", "Total"
    );

    let mut grand_total = 0.0;
    let mut quotes = 0usize;

    for outcome in &result.outcomes {
        match &outcome.result {
            Ok(p) => {
                let s = &p.shipment;
                let b = &p.billing;
                let access = b.accessorials.map(|a| a.sum());
                match b.total {
                    Charge::Priced(v) => grand_total += v,
                    Charge::QuoteRequired => quotes += 1,
                }
                println!(
                    "{:>4}  {:<14} {:>4} {:>9.2} {:>9.2} {:>10} {:>9} {:>9} {:>10}",
                    outcome.page_number,
                    s.job_id,
                    s.zone.map(|z| z.to_string()).unwrap_or_else(|| "?".into()),
                    s.actual_weight,
                    b.applicable_weight,
                    short_charge(b.base_freight),
                    short_charge(b.fuel_surcharge),
                    access.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into()),
                    b.total.to_string(),
                );
                for w in &outcome.warnings {
                    println!("      {}", dim(&format!("note: {w}")));
                }
            }
            Err(e) => println!("{:>4}  {}", outcome.page_number, red(&e.to_string())),
        }
    }

    println!(
        "{}  {:.2}{}{}",
        bold("Total:"),
        grand_total,
        if quotes > 0 {
            format!("  (+{quotes} quote required)")
        } else {
            String::new()
        },
        if result.cancelled { "  [cancelled]" } else { "" }
    );
}

fn short_charge(c: Charge) -> String {
    match c {
        Charge::Priced(v) => format!("{v:.2}"),
        Charge::QuoteRequired => "quote".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bol_billing::Zone;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_rate_example_matches_published_tariff() {
        let rates = RateConfig::default();
        for zone in [Zone::A, Zone::B] {
            let z = rates.zone(zone).unwrap();
            let row = format!(
                "\"{zone}\": {{ \"perPound\": [{:.4}, {:.4}, {:.4}, {:.4}], \"min\": {}, \"max\": {} }}",
                z.per_pound[0], z.per_pound[1], z.per_pound[2], z.per_pound[3], z.min, z.max
            );
            assert!(AFTER_HELP.contains(&row), "help text is missing {row}");
        }
    }
}

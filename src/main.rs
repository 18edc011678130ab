//! FUNDRANK: fund ranking scraper and composite-score screener.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves the category selection and runs the requested command:
//! scrape ranking tables, screen them into shortlists, or both.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

use fundrank::config::AppConfig;
use fundrank::engine::RunOrchestrator;
use fundrank::source::{CsvTableSource, RankApiSource, RowSource};
use fundrank::storage::{self, RunStamp};
use fundrank::types::{Category, RunSummary};

const BANNER: &str = r#"
  ___ _   _ _  _ ___  ___    _   _  _ _  __
 | __| | | | \| |   \| _ \  /_\ | \| | |/ /
 | _|| |_| | .` | |) |   / / _ \| .` | ' <
 |_|  \___/|_|\_|___/|_|_\/_/ \_\_|\_|_|\_\

  Fund ranking scraper & composite screener
"#;

#[derive(Parser, Debug)]
#[command(name = "fundrank")]
#[command(about = "Scrape fund rankings and shortlist the best funds per category", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape ranking tables for the selected categories
    Scrape {
        /// Comma-separated selection: 1 index, 2 equity, 3 hybrid, 4 bond, 5 or "all"
        selection: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Score saved (or live) tables into top-N shortlists
    Screen {
        selection: String,
        /// Period directory to read and write, YYYYMM (defaults to this month)
        #[arg(long)]
        period: Option<String>,
        #[arg(long, value_enum, default_value_t = SourceKind::File)]
        source: SourceKind,
    },
    /// Scrape, then screen what was scraped
    Run {
        selection: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceKind {
    /// Latest raw table saved under the data directory
    File,
    /// Live ranking endpoint
    Api,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = AppConfig::load_or_default(&cli.config)?;
    println!("{BANNER}");

    let selection = match &cli.command {
        Commands::Scrape { selection, .. }
        | Commands::Screen { selection, .. }
        | Commands::Run { selection, .. } => selection.clone(),
    };
    if selection.trim() == "0" {
        println!("Nothing to do.");
        return Ok(());
    }

    let categories = match Category::parse_selection(&selection) {
        Ok(categories) => categories,
        Err(e) => {
            warn!(selection = %selection, "No usable category in selection");
            println!("{e}");
            return Ok(());
        }
    };

    println!("Selected categories:");
    for (i, category) in categories.iter().enumerate() {
        println!("  {}. {category}", i + 1);
    }

    match cli.command {
        Commands::Scrape { yes, .. } => {
            if !yes && !confirm("Start scraping?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let orchestrator = prepare(&cfg, RunStamp::today())?;
            let summary = orchestrator.scrape_with_chrome(&categories).await;
            finish(&orchestrator, &summary);
        }
        Commands::Screen { period, source, .. } => {
            let stamp = match period {
                Some(p) => RunStamp::today().with_period(&p)?,
                None => RunStamp::today(),
            };
            let orchestrator = prepare(&cfg, stamp)?;
            let source: Box<dyn RowSource> = match source {
                SourceKind::File => Box::new(CsvTableSource::new(
                    &cfg.storage.data_dir,
                    orchestrator.stamp().clone(),
                )),
                SourceKind::Api => Box::new(RankApiSource::new(cfg.api.clone(), cfg.scraper.clone())?),
            };
            let summary = orchestrator.screen(&categories, source.as_ref()).await;
            finish(&orchestrator, &summary);
        }
        Commands::Run { yes, .. } => {
            if !yes && !confirm("Start scraping and screening?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let orchestrator = prepare(&cfg, RunStamp::today())?;
            let scraped = orchestrator.scrape_with_chrome(&categories).await;
            finish(&orchestrator, &scraped);

            let source = CsvTableSource::new(&cfg.storage.data_dir, orchestrator.stamp().clone());
            let screened = orchestrator.screen(&categories, &source).await;
            finish(&orchestrator, &screened);
        }
    }

    Ok(())
}

/// Create the period directories and build the orchestrator.
fn prepare(cfg: &AppConfig, stamp: RunStamp) -> Result<RunOrchestrator> {
    for root in [&cfg.storage.data_dir, &cfg.storage.results_dir] {
        let dir = storage::period_dir(Path::new(root), &stamp);
        std::fs::create_dir_all(&dir)?;
    }
    info!(period = %stamp.period, date = %stamp.date, "Run directories ready");
    Ok(RunOrchestrator::new(cfg.clone(), stamp)?)
}

/// Print a per-category report and persist the summary.
fn finish(orchestrator: &RunOrchestrator, summary: &RunSummary) {
    println!();
    for c in &summary.categories {
        let status = if c.failed { "FAILED" } else { "ok" };
        println!(
            "  {:<16} {status:<6} rows={:<6} eligible={:<6} shortlisted={:<3} {}",
            c.category.to_string(),
            c.rows,
            c.eligible,
            c.shortlisted,
            c.output.as_deref().or(c.note.as_deref()).unwrap_or(""),
        );
    }
    if summary.planned_orders > 0 {
        println!(
            "  [DRY RUN] {} orders, amount {}, estimated fees {}",
            summary.planned_orders, summary.planned_amount, summary.estimated_fees
        );
    }

    match orchestrator.save_summary(summary) {
        Ok(path) => info!(path = %path.display(), failed = summary.failures(), "Run summary saved"),
        Err(e) => warn!(error = %e, "Failed to save run summary"),
    }
}

/// Ask a yes/no question on stdin. `y`, `yes` and `是` confirm.
fn confirm(question: &str) -> Result<bool> {
    print!("{question} (y/n): ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "是"))
}

/// Initialise the `tracing` subscriber.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "fundrank=debug" } else { "fundrank=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json_logging = std::env::var("FUNDRANK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

//! # Batch Analyst
//!
//! Command-line driver for the batch analysis pipeline: loads
//! configuration, runs the scheduler against the configured engine,
//! persists artifacts, and delivers the summary notification.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;

use analyst_core::artifacts::ArtifactStore;
use analyst_core::config::ConfigManager;
use analyst_core::delivery::{DeliveryFailoverSender, WebhookTransport};
use analyst_core::engine::HttpAnalysisEngine;
use analyst_core::logging::init_structured_logging_with_level;
use analyst_core::orchestration::types::{Job, JobOutcome, RunResult};
use analyst_core::orchestration::{BatchScheduler, ResultAggregator};
use analyst_core::report::ReportRenderer;

#[derive(Parser)]
#[command(name = "batch-analyst")]
#[command(about = "Run batch market analysis through the configured engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Symbols to analyze (overrides --job-list)
    symbols: Vec<String>,

    /// Named job list from configuration (default: "default")
    #[arg(short = 'l', long)]
    job_list: Option<String>,

    /// List configured job lists and exit
    #[arg(long)]
    list_job_lists: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides configuration)
    #[arg(short, long)]
    output: Option<String>,

    /// Analysis date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Skip notification delivery even if enabled in configuration
    #[arg(long)]
    no_delivery: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    };
    init_structured_logging_with_level(level);

    if let Err(e) = run(cli).await {
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::load_from_file(
            path.clone(),
            &ConfigManager::detect_environment(),
        )
        .context("failed to load configuration")?,
        None => ConfigManager::load().context("failed to load configuration")?,
    };
    let config = manager.config().clone();

    if cli.list_job_lists {
        println!("📋 Configured job lists:");
        for name in manager.job_list_names() {
            let list = &config.job_lists[&name];
            if list.description.is_empty() {
                println!("  {name} ({} symbols)", list.symbols.len());
            } else {
                println!("  {name} ({} symbols): {}", list.symbols.len(), list.description);
            }
        }
        return Ok(());
    }

    let jobs = resolve_jobs(&cli, &manager)?;
    let analysis_date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    println!(
        "🚀 Analyzing {} {} for {} via {}",
        jobs.len(),
        if jobs.len() == 1 { "symbol" } else { "symbols" },
        analysis_date,
        config.engine.base_url
    );

    let engine = Arc::new(
        HttpAnalysisEngine::from_config(&config.engine)
            .context("failed to construct the analysis engine client")?,
    );
    let scheduler = BatchScheduler::new(engine, config.batch.clone());

    // Ctrl-C cancels the run; in-flight work finishes, the rest is skipped.
    let cancellation = scheduler.cancellation_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⚠️  Interrupt received, cancelling run...");
            cancellation.cancel();
        }
    });

    let result = scheduler.run(jobs, analysis_date).await;
    let summary = ResultAggregator::new().aggregate(&result);

    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| config.output.directory.clone());
    let artifacts = ArtifactStore::new(&output_dir)
        .write_run(&result, &summary)
        .context("failed to write run artifacts")?;

    print_operator_summary(&result);
    println!("📄 Artifacts saved to {}", artifacts.dir.display());

    if config.delivery.enabled && !cli.no_delivery {
        let message =
            ReportRenderer::new().render_notification(&result, &summary, &config.delivery.recipients);
        let transport =
            WebhookTransport::new().context("failed to construct the delivery transport")?;
        let report = DeliveryFailoverSender::new(Arc::new(transport))
            .send(&message, &config.delivery.transports)
            .await;

        match report.delivered_via {
            Some(label) => println!("📧 Notification delivered via '{label}'"),
            None => println!(
                "🚫 Notification not delivered ({} transport attempts)",
                report.attempts.len()
            ),
        }
    }

    Ok(())
}

/// Positional symbols win; otherwise the named (or "default") job list.
fn resolve_jobs(cli: &Cli, manager: &ConfigManager) -> anyhow::Result<Vec<Job>> {
    if !cli.symbols.is_empty() {
        return Ok(cli.symbols.iter().map(|s| Job::new(s.trim())).collect());
    }

    let list_name = cli.job_list.as_deref().unwrap_or("default");
    manager.job_list(list_name).with_context(|| {
        format!(
            "no symbols given and job list '{list_name}' unavailable (configured lists: {})",
            manager.job_list_names().join(", ")
        )
    })
}

fn print_operator_summary(result: &RunResult) {
    println!(
        "🏁 Run complete: {}/{} succeeded, {} failed, {} skipped in {:.1}s",
        result.succeeded,
        result.total_jobs(),
        result.failed,
        result.skipped,
        result.duration().as_secs_f64()
    );
    if result.breaker_tripped {
        let reason = result.breaker_reason.as_deref().unwrap_or("quota exhausted");
        println!("🔴 Quota circuit breaker tripped: {reason}");
    }
    for report in &result.reports {
        match &report.outcome {
            JobOutcome::Success(payload) => println!(
                "  ✅ {} volatility {:.4}, range {:.2}",
                report.job.symbol,
                payload.volatility,
                payload.price_range()
            ),
            JobOutcome::Failed { kind, message } => println!(
                "  ❌ {} {kind} after {} attempt(s): {message}",
                report.job.symbol, report.attempts
            ),
            JobOutcome::Skipped { reason } => {
                println!("  ⏭️  {} skipped: {reason}", report.job.symbol);
            }
        }
    }
}

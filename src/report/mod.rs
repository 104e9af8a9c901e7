//! # Report Rendering
//!
//! Pure markdown assembly for the three run artifacts: per-job analysis
//! reports, the batch summary, and the notification message handed to
//! delivery. No I/O happens here; `ArtifactStore` persists the rendered
//! text and `DeliveryFailoverSender` transmits the notification.

use chrono::NaiveDate;

use crate::delivery::NotificationMessage;
use crate::orchestration::aggregator::RunSummary;
use crate::orchestration::types::{JobOutcome, JobReport, RunResult};

/// Stateless markdown renderer for run output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the markdown report for a single job.
    pub fn render_job_report(&self, report: &JobReport, analysis_date: NaiveDate) -> String {
        let mut md = format!("# {} Analysis Report\n\n", report.job.symbol);

        // Overview table
        md.push_str("## Overview\n\n");
        md.push_str("| Field | Value |\n|-------|-------|\n");
        md.push_str(&format!("| Symbol | {} |\n", report.job.symbol));
        md.push_str(&format!("| Market | {} |\n", report.job.market.label()));
        md.push_str(&format!("| Analysis date | {analysis_date} |\n"));
        md.push_str(&format!("| Status | {} |\n", report.outcome.status_label()));
        md.push_str(&format!("| Engine attempts | {} |\n", report.attempts));

        match &report.outcome {
            JobOutcome::Success(payload) => {
                md.push_str("\n## Price Metrics\n\n");
                md.push_str("| Metric | Value |\n|--------|-------|\n");
                md.push_str(&format!("| Volatility | {:.4} |\n", payload.volatility));
                md.push_str(&format!("| Period high | {:.2} |\n", payload.period_high));
                md.push_str(&format!("| Period low | {:.2} |\n", payload.period_low));
                md.push_str(&format!("| Price range | {:.2} |\n", payload.price_range()));
                md.push_str("\n## Analysis\n\n");
                md.push_str(&payload.summary);
                md.push('\n');
            }
            JobOutcome::Failed { kind, message } => {
                md.push_str("\n## Failure\n\n");
                md.push_str(&format!("- Failure kind: {kind}\n"));
                md.push_str(&format!("- Message: {message}\n"));
                md.push_str(&format!(
                    "- Gave up after {} engine {}\n",
                    report.attempts,
                    plural(report.attempts as usize, "attempt")
                ));
            }
            JobOutcome::Skipped { reason } => {
                md.push_str("\n## Skipped\n\n");
                md.push_str(&format!(
                    "No engine attempt was made for this job: {reason}.\n"
                ));
            }
        }

        md
    }

    /// Render the batch summary markdown for a completed run.
    pub fn render_run_summary(&self, run: &RunResult, summary: &RunSummary) -> String {
        let mut md = String::from("# Batch Analysis Summary\n\n");

        // Run overview
        md.push_str("## Run Overview\n\n");
        md.push_str(&format!("- Run ID: {}\n", run.run_id));
        md.push_str(&format!("- Analysis date: {}\n", run.analysis_date));
        md.push_str(&format!("- Total jobs: {}\n", summary.total_jobs));
        md.push_str(&format!("- Succeeded: {}\n", summary.succeeded));
        md.push_str(&format!("- Failed: {}\n", summary.failed));
        md.push_str(&format!("- Skipped: {}\n", summary.skipped));
        md.push_str(&format!("- Success rate: {:.1}%\n", summary.success_rate));
        md.push_str(&format!(
            "- Duration: {:.2}s\n",
            run.duration().as_secs_f64()
        ));

        if run.breaker_tripped {
            let reason = run.breaker_reason.as_deref().unwrap_or("quota exhausted");
            md.push_str(&format!(
                "\n**Run halted early by the quota circuit breaker:** {reason}\n"
            ));
        }

        // Distribution covers successfully analyzed jobs only; an
        // all-failed run has no section.
        if !summary.market_distribution.is_empty() {
            md.push_str("\n## Market Distribution\n\n");
            for (market, count) in &summary.market_distribution {
                md.push_str(&format!(
                    "- {}: {} {}\n",
                    market.label(),
                    count,
                    plural(*count, "symbol")
                ));
            }
        }

        md.push_str("\n## Volatility\n\n");
        match summary.average_volatility {
            Some(avg) => md.push_str(&format!("- Average volatility: {avg:.4}\n")),
            None => md.push_str("- No successful analyses in this run.\n"),
        }

        if !summary.top_price_ranges.is_empty() {
            md.push_str("\n## Top Price Ranges\n\n");
            md.push_str("| Rank | Symbol | Market | Range | High | Low |\n");
            md.push_str("|------|--------|--------|-------|------|-----|\n");
            for (idx, ranked) in summary.top_price_ranges.iter().enumerate() {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {:.2} | {:.2} |\n",
                    idx + 1,
                    ranked.symbol,
                    ranked.market.label(),
                    ranked.price_range,
                    ranked.period_high,
                    ranked.period_low
                ));
            }
        }

        // Per-job status lines in submission order
        md.push_str("\n## Job Outcomes\n\n");
        for report in &run.reports {
            md.push_str(&self.outcome_line(report));
        }

        md
    }

    /// Build the notification for a completed run. The body is the batch
    /// summary markdown; the subject carries the headline counters.
    pub fn render_notification(
        &self,
        run: &RunResult,
        summary: &RunSummary,
        recipients: &[String],
    ) -> NotificationMessage {
        NotificationMessage {
            subject: format!(
                "[batch-analyst] {}: {}/{} succeeded",
                run.analysis_date,
                summary.succeeded,
                summary.total_jobs
            ),
            body: self.render_run_summary(run, summary),
            recipients: recipients.to_vec(),
        }
    }

    fn outcome_line(&self, report: &JobReport) -> String {
        match &report.outcome {
            JobOutcome::Success(payload) => format!(
                "- ✅ {} ({}): volatility {:.4}, range {:.2}\n",
                report.job.symbol,
                report.job.market.label(),
                payload.volatility,
                payload.price_range()
            ),
            JobOutcome::Failed { kind, message } => format!(
                "- ❌ {} ({}): failed after {} {} ({kind}: {message})\n",
                report.job.symbol,
                report.job.market.label(),
                report.attempts,
                plural(report.attempts as usize, "attempt")
            ),
            JobOutcome::Skipped { reason } => format!(
                "- ⏭️ {} ({}): skipped ({reason})\n",
                report.job.symbol,
                report.job.market.label()
            ),
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

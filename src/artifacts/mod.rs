//! # Run Artifacts
//!
//! Persists the output of a batch run under a per-date directory:
//!
//! ```text
//! <output_root>/
//! └── 2025-07-01/
//!     ├── batch_result.json      # full RunResult, machine-readable
//!     ├── batch_summary.md       # aggregate summary
//!     ├── AAPL_analysis.md       # one report per job
//!     └── 0700_HK_analysis.md
//! ```
//!
//! Symbols are sanitized for filenames; everything outside `[A-Za-z0-9]`
//! becomes an underscore, so `0700.HK` lands in `0700_HK_analysis.md`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::Result;
use crate::orchestration::aggregator::RunSummary;
use crate::orchestration::types::RunResult;
use crate::report::ReportRenderer;

/// Paths produced by one `write_run` call.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Per-date directory all files were written into
    pub dir: PathBuf,
    /// Machine-readable run result
    pub result_path: PathBuf,
    /// Batch summary markdown
    pub summary_path: PathBuf,
    /// Per-job report markdown, in submission order
    pub job_paths: Vec<PathBuf>,
}

/// Writes run output beneath a fixed root directory.
pub struct ArtifactStore {
    root: PathBuf,
    renderer: ReportRenderer,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            renderer: ReportRenderer::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the JSON result, per-job reports, and batch summary for a
    /// completed run. Creates the per-date directory if needed.
    #[instrument(skip(self, run, summary), fields(run_id = %run.run_id, date = %run.analysis_date))]
    pub fn write_run(&self, run: &RunResult, summary: &RunSummary) -> Result<RunArtifacts> {
        let dir = self.root.join(run.analysis_date.to_string());
        fs::create_dir_all(&dir)?;

        let result_path = dir.join("batch_result.json");
        fs::write(&result_path, serde_json::to_string_pretty(run)?)?;

        let mut job_paths = Vec::with_capacity(run.reports.len());
        for report in &run.reports {
            let path = dir.join(format!(
                "{}_analysis.md",
                sanitize_symbol(&report.job.symbol)
            ));
            fs::write(
                &path,
                self.renderer.render_job_report(report, run.analysis_date),
            )?;
            job_paths.push(path);
        }

        let summary_path = dir.join("batch_summary.md");
        fs::write(&summary_path, self.renderer.render_run_summary(run, summary))?;

        info!(
            dir = %dir.display(),
            job_reports = job_paths.len(),
            "📄 ARTIFACTS: run output saved"
        );

        Ok(RunArtifacts {
            dir,
            result_path,
            summary_path,
            job_paths,
        })
    }
}

/// Replace anything outside `[A-Za-z0-9]` so symbols like `0700.HK`
/// produce portable filenames.
fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

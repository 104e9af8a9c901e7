//! # Result Aggregation
//!
//! Folds a finished `RunResult` into run-level statistics for the report
//! and notification: outcome counts and success rate over every job, plus
//! market distribution, mean volatility, and top price ranges over the
//! successful ones.
//!
//! Pure and total: every `RunResult` aggregates, including empty and
//! all-failed runs (`average_volatility` is an explicit `None` rather
//! than a division by zero).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{JobOutcome, MarketCategory, RunResult};

/// Number of jobs listed in the price-range ranking.
pub const TOP_PRICE_RANGES: usize = 5;

/// One entry in the price-range ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedJob {
    pub symbol: String,
    pub market: MarketCategory,
    pub price_range: f64,
    pub period_high: f64,
    pub period_low: f64,
}

/// Run-level statistics derived from a `RunResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage of all jobs (including skips) that succeeded
    pub success_rate: f64,
    /// Successfully analyzed jobs per market category; failed and
    /// skipped jobs are not counted
    pub market_distribution: BTreeMap<MarketCategory, usize>,
    /// Mean volatility across successful jobs; `None` when there were
    /// no successes
    pub average_volatility: Option<f64>,
    /// Top successful jobs by price range, widest first, ties in input
    /// order
    pub top_price_ranges: Vec<RankedJob>,
}

/// Computes a `RunSummary` from a `RunResult` without mutating it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, run: &RunResult) -> RunSummary {
        let total_jobs = run.total_jobs();
        let success_rate = if total_jobs == 0 {
            0.0
        } else {
            run.succeeded as f64 / total_jobs as f64 * 100.0
        };

        let mut market_distribution: BTreeMap<MarketCategory, usize> = BTreeMap::new();
        let mut volatility_sum = 0.0;
        let mut ranked: Vec<RankedJob> = Vec::new();
        for report in &run.reports {
            if let JobOutcome::Success(payload) = &report.outcome {
                *market_distribution.entry(report.job.market).or_insert(0) += 1;
                volatility_sum += payload.volatility;
                ranked.push(RankedJob {
                    symbol: report.job.symbol.clone(),
                    market: report.job.market,
                    price_range: payload.price_range(),
                    period_high: payload.period_high,
                    period_low: payload.period_low,
                });
            }
        }

        let average_volatility = if ranked.is_empty() {
            None
        } else {
            Some(volatility_sum / ranked.len() as f64)
        };

        // Stable sort keeps input order for equal ranges.
        ranked.sort_by(|a, b| {
            b.price_range
                .partial_cmp(&a.price_range)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(TOP_PRICE_RANGES);

        RunSummary {
            total_jobs,
            succeeded: run.succeeded,
            failed: run.failed,
            skipped: run.skipped,
            success_rate,
            market_distribution,
            average_volatility,
            top_price_ranges: ranked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::error_classifier::FailureKind;
    use crate::orchestration::types::{
        AnalysisPayload, Job, JobReport, SKIP_REASON_CIRCUIT_OPEN,
    };
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn success(symbol: &str, volatility: f64, high: f64, low: f64) -> JobReport {
        JobReport {
            job: Job::new(symbol),
            outcome: JobOutcome::Success(AnalysisPayload {
                summary: format!("analysis for {symbol}"),
                volatility,
                period_high: high,
                period_low: low,
            }),
            attempts: 1,
        }
    }

    fn failed(symbol: &str, kind: FailureKind) -> JobReport {
        JobReport {
            job: Job::new(symbol),
            outcome: JobOutcome::failed(kind, "boom"),
            attempts: 3,
        }
    }

    fn skipped(symbol: &str) -> JobReport {
        JobReport {
            job: Job::new(symbol),
            outcome: JobOutcome::skipped(SKIP_REASON_CIRCUIT_OPEN),
            attempts: 0,
        }
    }

    fn run_with(reports: Vec<JobReport>) -> RunResult {
        let now = Utc::now();
        RunResult::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            now,
            now,
            reports,
            false,
            None,
        )
    }

    #[test]
    fn test_quota_scenario_success_rate_is_forty_percent() {
        // 2 successes, 1 quota failure, 2 breaker skips out of 5.
        let run = run_with(vec![
            success("AAPL", 0.2, 110.0, 100.0),
            success("MSFT", 0.3, 220.0, 200.0),
            failed("TSLA", FailureKind::QuotaExceeded),
            skipped("NVDA"),
            skipped("AMZN"),
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        assert_eq!(summary.total_jobs, 5);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert!((summary.success_rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_market_distribution_counts_only_successes() {
        let run = run_with(vec![
            success("AAPL", 0.2, 110.0, 100.0),
            failed("600519", FailureKind::Transient),
            skipped("0700.HK"),
            success("MSFT", 0.1, 50.0, 45.0),
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        assert_eq!(
            summary.market_distribution.get(&MarketCategory::UsEquity),
            Some(&2)
        );
        assert_eq!(
            summary.market_distribution.get(&MarketCategory::AShare),
            None,
            "failed jobs stay out of the distribution"
        );
        assert_eq!(
            summary.market_distribution.get(&MarketCategory::HkEquity),
            None,
            "skipped jobs stay out of the distribution"
        );
    }

    #[test]
    fn test_average_volatility_over_successes_only() {
        let run = run_with(vec![
            success("AAPL", 0.2, 110.0, 100.0),
            success("MSFT", 0.4, 220.0, 200.0),
            failed("TSLA", FailureKind::Transient),
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        let avg = summary.average_volatility.unwrap();
        assert!((avg - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_all_failed_run_has_no_successes_marker() {
        let run = run_with(vec![
            failed("AAPL", FailureKind::Transient),
            failed("MSFT", FailureKind::Unknown),
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        assert_eq!(summary.average_volatility, None);
        assert!(summary.top_price_ranges.is_empty());
        assert!(summary.market_distribution.is_empty());
        assert!((summary.success_rate - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run_aggregates_cleanly() {
        let summary = ResultAggregator::new().aggregate(&run_with(Vec::new()));
        assert_eq!(summary.total_jobs, 0);
        assert!((summary.success_rate - 0.0).abs() < 1e-9);
        assert_eq!(summary.average_volatility, None);
        assert!(summary.market_distribution.is_empty());
    }

    #[test]
    fn test_top_ranking_widest_first_capped_at_five() {
        let run = run_with(vec![
            success("A", 0.1, 10.0, 9.0),   // range 1
            success("B", 0.1, 30.0, 10.0),  // range 20
            success("C", 0.1, 15.0, 10.0),  // range 5
            success("D", 0.1, 50.0, 10.0),  // range 40
            success("E", 0.1, 12.0, 10.0),  // range 2
            success("F", 0.1, 20.0, 10.0),  // range 10
            success("G", 0.1, 13.0, 10.0),  // range 3
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        let symbols: Vec<&str> = summary
            .top_price_ranges
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["D", "B", "F", "C", "G"]);
    }

    #[test]
    fn test_top_ranking_ties_keep_input_order() {
        let run = run_with(vec![
            success("A", 0.1, 20.0, 10.0), // range 10
            success("B", 0.1, 15.0, 5.0),  // range 10
            success("C", 0.1, 30.0, 10.0), // range 20
        ]);

        let summary = ResultAggregator::new().aggregate(&run);
        let symbols: Vec<&str> = summary
            .top_price_ranges
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_aggregate_does_not_mutate_run() {
        let run = run_with(vec![success("AAPL", 0.2, 110.0, 100.0)]);
        let before = serde_json::to_string(&run).unwrap();
        let _ = ResultAggregator::new().aggregate(&run);
        assert_eq!(serde_json::to_string(&run).unwrap(), before);
    }
}

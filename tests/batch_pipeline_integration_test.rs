//! Integration test for the full batch pipeline: scheduler run, result
//! aggregation, report rendering, and artifact persistence.

use std::fs;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, Level};

use analyst_core::artifacts::ArtifactStore;
use analyst_core::config::BatchConfig;
use analyst_core::engine::{ScriptedEngine, ScriptedResponse};
use analyst_core::orchestration::types::{Job, JobOutcome, OrchestrationEvent, RunResult};
use analyst_core::orchestration::{BatchScheduler, ResultAggregator};

fn analysis_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
}

#[tokio::test]
async fn test_pipeline_run_aggregate_persist() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init();

    info!("🧪 Testing scheduler → aggregator → artifacts pipeline");

    // AAPL succeeds first try, MSFT needs one retry, TSLA never recovers.
    let engine = Arc::new(
        ScriptedEngine::new()
            .with_responses("AAPL", vec![ScriptedResponse::ok_with(0.2, 210.0, 190.0)])
            .with_responses(
                "MSFT",
                vec![
                    ScriptedResponse::fail("request timeout"),
                    ScriptedResponse::ok_with(0.5, 320.0, 280.0),
                ],
            )
            .with_persistent_failure("TSLA", "connection reset by peer"),
    );

    let scheduler = BatchScheduler::new(engine.clone(), BatchConfig::for_testing());
    let mut events = scheduler.subscribe();

    let jobs = vec![Job::new("AAPL"), Job::new("MSFT"), Job::new("TSLA")];
    let result = scheduler.run(jobs, analysis_date()).await;

    info!("🔍 Verifying run result ordering and counters");
    assert_eq!(result.total_jobs(), 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 0);
    assert!(!result.breaker_tripped);

    let symbols: Vec<&str> = result
        .reports
        .iter()
        .map(|r| r.job.symbol.as_str())
        .collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT", "TSLA"]);

    assert_eq!(result.reports[0].attempts, 1);
    assert_eq!(result.reports[1].attempts, 2, "MSFT should retry once");
    assert_eq!(
        result.reports[2].attempts, 3,
        "TSLA should exhaust max_retries + 1 attempts"
    );
    assert_eq!(engine.total_calls(), 6);

    info!("🔍 Verifying aggregation");
    let summary = ResultAggregator::new().aggregate(&result);
    assert_eq!(summary.total_jobs, 3);
    assert!((summary.success_rate - 66.666).abs() < 0.01);
    // MSFT's 40-point range outranks AAPL's 20
    assert_eq!(summary.top_price_ranges[0].symbol, "MSFT");
    assert_eq!(summary.top_price_ranges.len(), 2);

    info!("🔍 Verifying persisted artifacts");
    let tmp = tempfile::tempdir()?;
    let artifacts = ArtifactStore::new(tmp.path()).write_run(&result, &summary)?;

    assert_eq!(artifacts.job_paths.len(), 3);
    let raw = fs::read_to_string(&artifacts.result_path)?;
    let parsed: RunResult = serde_json::from_str(&raw)?;
    assert_eq!(parsed.run_id, result.run_id);
    assert_eq!(parsed.succeeded, 2);

    let tsla_md = fs::read_to_string(tmp.path().join("2025-07-01/TSLA_analysis.md"))?;
    assert!(tsla_md.contains("## Failure"));
    assert!(tsla_md.contains("transient"));
    assert!(tsla_md.contains("connection reset by peer"));

    let summary_md = fs::read_to_string(&artifacts.summary_path)?;
    assert!(summary_md.contains("- Succeeded: 2"));
    assert!(summary_md.contains("| 1 | MSFT |"));

    info!("🔍 Verifying published event stream");
    let mut started = 0;
    let mut attempts = 0;
    let mut finalized = 0;
    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            OrchestrationEvent::RunStarted { total_jobs, .. } => {
                started += 1;
                assert_eq!(total_jobs, 3);
            }
            OrchestrationEvent::AttemptFinished(_) => attempts += 1,
            OrchestrationEvent::JobFinalized { .. } => finalized += 1,
            OrchestrationEvent::BreakerTripped { .. } => {
                panic!("no breaker trip expected in this scenario")
            }
            OrchestrationEvent::RunCompleted { succeeded, .. } => {
                completed += 1;
                assert_eq!(succeeded, 2);
            }
        }
    }
    assert_eq!(started, 1);
    assert_eq!(attempts, 6, "one event per engine call");
    assert_eq!(finalized, 3);
    assert_eq!(completed, 1);

    info!("🎉 Pipeline integration test completed successfully!");
    Ok(())
}

#[tokio::test]
async fn test_pipeline_quota_trip_is_visible_in_artifacts() -> Result<(), Box<dyn std::error::Error>>
{
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .try_init();

    info!("🧪 Testing quota circuit breaker visibility through the pipeline");

    let engine = Arc::new(ScriptedEngine::new().with_responses(
        "MSFT",
        vec![ScriptedResponse::fail(
            "You exceeded your current quota, please check your plan",
        )],
    ));

    let scheduler = BatchScheduler::new(engine.clone(), BatchConfig::for_testing());
    let jobs = vec![Job::new("AAPL"), Job::new("MSFT"), Job::new("NVDA")];
    let result = scheduler.run(jobs, analysis_date()).await;

    assert!(result.breaker_tripped);
    assert_eq!(result.succeeded, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.reports[1].attempts, 1, "quota failures never retry");
    assert!(matches!(
        result.reports[2].outcome,
        JobOutcome::Skipped { .. }
    ));
    assert_eq!(
        engine.calls_for("NVDA"),
        0,
        "skipped jobs must not reach the engine"
    );

    let summary = ResultAggregator::new().aggregate(&result);
    // Only AAPL was analyzed; the quota failure and the skip contribute
    // nothing to the market distribution.
    assert_eq!(summary.market_distribution.values().sum::<usize>(), 1);

    let tmp = tempfile::tempdir()?;
    let artifacts = ArtifactStore::new(tmp.path()).write_run(&result, &summary)?;

    let summary_md = fs::read_to_string(&artifacts.summary_path)?;
    assert!(summary_md.contains("quota circuit breaker"));
    assert!(summary_md.contains("skipped (circuit open)"));

    let nvda_md = fs::read_to_string(tmp.path().join("2025-07-01/NVDA_analysis.md"))?;
    assert!(nvda_md.contains("## Skipped"));
    assert!(nvda_md.contains("circuit open"));

    info!("🎉 Quota visibility test completed successfully!");
    Ok(())
}

//! HTTP client for a remote analysis service.
//!
//! Error mapping preserves the provider's own phrasing (statuses and
//! response bodies end up inside the `EngineError` text) because the
//! failure classifier keys off that wording.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalysisEngine, EngineError};
use crate::config::EngineConfig;
use crate::error::{AnalystError, Result};
use crate::orchestration::types::{AnalysisPayload, Job, MarketCategory};

/// Remote analysis engine reached over HTTP.
pub struct HttpAnalysisEngine {
    base_url: String,
    model: String,
    client: reqwest::Client,
    api_key: Option<String>,
    timeout_secs: u64,
}

/// Request body for `POST /v1/analyses`
#[derive(Serialize)]
struct AnalysisRequest<'a> {
    symbol: &'a str,
    market: MarketCategory,
    analysis_date: NaiveDate,
    model: &'a str,
}

/// Response body from `POST /v1/analyses`
#[derive(Deserialize)]
struct AnalysisResponse {
    summary: String,
    volatility: f64,
    period_high: f64,
    period_low: f64,
}

impl HttpAnalysisEngine {
    /// Build an engine client from configuration.
    ///
    /// The API key is resolved from the environment variable named by
    /// `api_key_env`; a missing key is allowed (local engines run
    /// unauthenticated) and simply omits the `Authorization` header.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            debug!(
                api_key_env = %config.api_key_env,
                "Engine API key not set, sending unauthenticated requests"
            );
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(AnalystError::Http)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            api_key,
            timeout_secs: config.request_timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AnalysisEngine for HttpAnalysisEngine {
    async fn analyze(
        &self,
        job: &Job,
        analysis_date: NaiveDate,
    ) -> std::result::Result<AnalysisPayload, EngineError> {
        let url = format!("{}/v1/analyses", self.base_url);
        let body = AnalysisRequest {
            symbol: &job.symbol,
            market: job.market,
            analysis_date,
            model: &self.model,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                EngineError::new(format!("connection error reaching {}: {e}", self.base_url))
            } else if e.is_timeout() {
                EngineError::new(format!("request timeout after {}s", self.timeout_secs))
            } else {
                EngineError::new(format!("network error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::new(format!(
                "analysis service returned {status}: {body}"
            )));
        }

        let parsed: AnalysisResponse = response
            .json()
            .await
            .map_err(|e| EngineError::new(format!("response parsing failed: {e}")))?;

        Ok(AnalysisPayload {
            summary: parsed.summary,
            volatility: parsed.volatility,
            period_high: parsed.period_high,
            period_low: parsed.period_low,
        })
    }

    fn name(&self) -> &'static str {
        "http-analysis-engine"
    }
}

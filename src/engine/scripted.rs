//! Scripted in-memory engine for tests and offline demos.
//!
//! Each symbol gets a response script consumed one attempt at a time,
//! plus call counters so tests can assert exactly how many times the
//! scheduler reached the engine.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use super::{AnalysisEngine, EngineError};
use crate::orchestration::types::{AnalysisPayload, Job};

/// One scripted engine response.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Succeed with the given payload
    Succeed(AnalysisPayload),
    /// Fail with the given raw message
    Fail(String),
}

impl ScriptedResponse {
    /// Succeed with a deterministic placeholder payload.
    pub fn ok() -> Self {
        Self::Succeed(default_payload("scripted"))
    }

    /// Succeed with explicit metrics (for aggregator/ranking tests).
    pub fn ok_with(volatility: f64, period_high: f64, period_low: f64) -> Self {
        Self::Succeed(AnalysisPayload {
            summary: "scripted analysis".to_string(),
            volatility,
            period_high,
            period_low,
        })
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

enum Script {
    /// Responses consumed in order; exhausted scripts fall back to success
    Sequence(VecDeque<ScriptedResponse>),
    /// Every attempt fails with this message
    AlwaysFail(String),
}

#[derive(Default)]
struct ScriptedState {
    scripts: HashMap<String, Script>,
    calls: HashMap<String, u32>,
}

/// In-memory `AnalysisEngine` driven by per-symbol scripts.
///
/// Symbols without a script succeed immediately with a deterministic
/// payload.
#[derive(Default)]
pub struct ScriptedEngine {
    state: Mutex<ScriptedState>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a sequence of responses for one symbol.
    pub fn with_responses(
        self,
        symbol: impl Into<String>,
        responses: Vec<ScriptedResponse>,
    ) -> Self {
        self.state
            .lock()
            .scripts
            .insert(symbol.into(), Script::Sequence(responses.into()));
        self
    }

    /// Make every attempt for one symbol fail with the same message.
    pub fn with_persistent_failure(
        self,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.state
            .lock()
            .scripts
            .insert(symbol.into(), Script::AlwaysFail(message.into()));
        self
    }

    /// Engine calls made for one symbol.
    pub fn calls_for(&self, symbol: &str) -> u32 {
        self.state.lock().calls.get(symbol).copied().unwrap_or(0)
    }

    /// Engine calls made across all symbols.
    pub fn total_calls(&self) -> u32 {
        self.state.lock().calls.values().sum()
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn analyze(
        &self,
        job: &Job,
        _analysis_date: NaiveDate,
    ) -> Result<AnalysisPayload, EngineError> {
        let mut state = self.state.lock();
        *state.calls.entry(job.symbol.clone()).or_insert(0) += 1;

        match state.scripts.get_mut(&job.symbol) {
            Some(Script::AlwaysFail(message)) => Err(EngineError::new(message.clone())),
            Some(Script::Sequence(queue)) => match queue.pop_front() {
                Some(ScriptedResponse::Succeed(payload)) => Ok(payload),
                Some(ScriptedResponse::Fail(message)) => Err(EngineError::new(message)),
                None => Ok(default_payload(&job.symbol)),
            },
            None => Ok(default_payload(&job.symbol)),
        }
    }

    fn name(&self) -> &'static str {
        "scripted-engine"
    }
}

fn default_payload(symbol: &str) -> AnalysisPayload {
    AnalysisPayload {
        summary: format!("scripted analysis for {symbol}"),
        volatility: 0.25,
        period_high: 110.0,
        period_low: 100.0,
    }
}

//! Grading adapter: prompt the oracle, retry, and normalize its verdict.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::instrument;

use crate::error::{GradeError, OracleError};
use crate::extract::extract_json_object;
use crate::model::GradeRequest;
use crate::prompt::build_prompt;
use crate::traits::{Oracle, OracleRequest};

/// Placeholder stored when the oracle returns a verdict with no points at all.
pub const UNABLE_TO_EVALUATE: &str = "Unable to evaluate";

/// Configuration for the grader.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Model identifier passed to the oracle.
    pub model: String,
    /// Total oracle calls per grade, including the first one.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub retry_delay: Duration,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            max_attempts: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// A normalized verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeOutcome {
    pub score: u8,
    pub covered: Vec<String>,
    pub missed: Vec<String>,
}

/// The shape we accept from the oracle. Its own `score` field is ignored.
#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    covered: Vec<String>,
    #[serde(default)]
    missed: Vec<String>,
}

/// `floor(100 * covered / (covered + missed))`, or 0 when both are empty.
pub fn derive_score(covered: usize, missed: usize) -> u8 {
    let total = covered + missed;
    if total == 0 {
        return 0;
    }
    (covered * 100 / total) as u8
}

/// Pull the verdict out of raw oracle text and derive its score.
pub fn parse_verdict(content: &str) -> Result<GradeOutcome, OracleError> {
    let json = extract_json_object(content).ok_or(OracleError::NoJson)?;
    let verdict: Verdict =
        serde_json::from_str(json).map_err(|e| OracleError::MalformedJson(e.to_string()))?;

    let (covered, missed) = if verdict.covered.is_empty() && verdict.missed.is_empty() {
        (Vec::new(), vec![UNABLE_TO_EVALUATE.to_string()])
    } else {
        (verdict.covered, verdict.missed)
    };

    Ok(GradeOutcome {
        score: derive_score(covered.len(), missed.len()),
        covered,
        missed,
    })
}

/// Calls the oracle for one answer with a bounded retry policy.
pub struct Grader {
    oracle: Arc<dyn Oracle>,
    config: GraderConfig,
}

impl Grader {
    pub fn new(oracle: Arc<dyn Oracle>, config: GraderConfig) -> Self {
        Self { oracle, config }
    }

    /// Grade one answer.
    ///
    /// Transport failures, empty replies, missing JSON and malformed JSON are
    /// all retried until `max_attempts` calls have been made.
    #[instrument(
        skip(self, request),
        fields(session = %request.session_id, question = %request.question_id, oracle = self.oracle.name())
    )]
    pub async fn grade(&self, request: &GradeRequest) -> Result<GradeOutcome, GradeError> {
        let oracle_request = OracleRequest {
            model: self.config.model.clone(),
            prompt: build_prompt(request),
            temperature: 0.0,
        };

        let attempts = self.config.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            let result = match self.oracle.complete(&oracle_request).await {
                Ok(response) => parse_verdict(&response.content),
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => {
                    tracing::debug!(attempt, score = outcome.score, "answer graded");
                    return Ok(outcome);
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, "grading attempt failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(GradeError::exhausted(
            attempts,
            last_error.unwrap_or(OracleError::EmptyResponse),
        ))
    }
}

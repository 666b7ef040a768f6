//! The grading oracle seam.
//!
//! Implemented by the `gradeloop-providers` crate (HTTP client and mock).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// A natural-language model that judges answers.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Send one prompt and return the raw text of the reply.
    async fn complete(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError>;
}

/// A single prompt sent to the oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Model identifier (e.g. "gpt-4.1-mini").
    pub model: String,
    /// The full grading prompt, sent as a single user message.
    pub prompt: String,
    /// Sampling temperature; grading uses 0.
    pub temperature: f64,
}

/// Raw oracle reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    /// The message content, expected to contain a JSON verdict somewhere.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

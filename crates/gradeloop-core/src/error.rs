//! Error taxonomy.
//!
//! `PracticeError` is what callers of the practice operations see; it is
//! always raised synchronously. `OracleError` and `GradeError` never cross
//! the submit boundary: the orchestrator turns them into failed grade
//! records instead.

use thiserror::Error;

/// Errors that can occur when calling the grading oracle.
///
/// Defined here so the grader can classify failures without string matching.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The endpoint answered with a non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A transport-level failure.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response carried no choices or empty content.
    #[error("oracle returned an empty response")]
    EmptyResponse,

    /// No balanced JSON object could be found in the oracle output.
    #[error("no JSON object found in oracle output")]
    NoJson,

    /// A JSON object was found but did not match the verdict shape.
    #[error("malformed verdict JSON: {0}")]
    MalformedJson(String),
}

/// The grader exhausted its attempts.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct GradeError {
    /// Human-readable reason, stored verbatim on failed grade records.
    pub reason: String,
    /// How many oracle calls were made.
    pub attempts: u32,
    #[source]
    pub source: OracleError,
}

impl GradeError {
    pub fn exhausted(attempts: u32, source: OracleError) -> Self {
        Self {
            reason: format!("Unable to evaluate: {source}"),
            attempts,
            source,
        }
    }
}

/// Errors surfaced by persistence gateways.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors returned synchronously by practice operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    /// Bad session-build input (empty bank, no matching question ids).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Double completion, or an answer sent to a completed session.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unknown session, bank or question.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for PracticeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => PracticeError::NotFound(what),
            StoreError::Conflict(what) => PracticeError::Conflict(what),
            StoreError::Backend(msg) => PracticeError::Storage(msg),
        }
    }
}

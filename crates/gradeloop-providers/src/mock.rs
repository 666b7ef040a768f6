//! Mock oracle for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use gradeloop_core::error::OracleError;
use gradeloop_core::traits::{Oracle, OracleRequest, OracleResponse};

/// A mock grading oracle for exercising the orchestrator without real API calls.
///
/// Replies are taken from a script in order; once the script runs out the
/// fallback reply is used for every further call.
pub struct MockOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    fallback: Fallback,
    call_count: AtomicU32,
    last_request: Mutex<Option<OracleRequest>>,
}

enum Fallback {
    Reply(String),
    Status(u16),
}

impl MockOracle {
    /// A mock that always returns the same content.
    pub fn with_fixed_response(content: &str) -> Self {
        Self::build(VecDeque::new(), Fallback::Reply(content.to_string()))
    }

    /// A mock whose every call fails with the given HTTP status.
    pub fn always_failing(status: u16) -> Self {
        Self::build(VecDeque::new(), Fallback::Status(status))
    }

    /// Replay `script` in order, then keep returning `fallback`.
    pub fn scripted(script: Vec<Result<String, OracleError>>, fallback: &str) -> Self {
        Self::build(script.into(), Fallback::Reply(fallback.to_string()))
    }

    fn build(script: VecDeque<Result<String, OracleError>>, fallback: Fallback) -> Self {
        Self {
            script: Mutex::new(script),
            fallback,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this oracle.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this oracle.
    pub fn last_request(&self) -> Option<OracleRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let content = match next {
            Some(reply) => reply?,
            None => match &self.fallback {
                Fallback::Reply(content) => content.clone(),
                Fallback::Status(status) => {
                    return Err(OracleError::ApiError {
                        status: *status,
                        message: "mock failure".into(),
                    })
                }
            },
        };

        Ok(OracleResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }
}

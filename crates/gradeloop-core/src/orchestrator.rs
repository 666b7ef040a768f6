//! Background grading with a per-session completion barrier.
//!
//! Every submitted answer is graded by its own spawned task. Tasks are not
//! tied to the caller: once `submit` returns, the grade will be persisted
//! whether or not anyone is still listening. Failures stay inside the task
//! and end up as `failed` grade records.
//!
//! A session accepts submissions only while it is tracked and its barrier
//! is open. Completion closes the barrier before waiting on it, so nothing
//! can be scheduled behind the final aggregation.
//!
//! `await_session` has no timeout of its own. It is bounded only by the
//! grader's per-call timeout and retry budget, so a stalled oracle stalls
//! every caller waiting on that session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::barrier::CompletionBarrier;
use crate::error::PracticeError;
use crate::grader::Grader;
use crate::mastery::QuestionKey;
use crate::model::GradeRequest;
use crate::store::Store;

pub struct GradingOrchestrator {
    grader: Arc<Grader>,
    store: Arc<dyn Store>,
    barriers: RwLock<HashMap<Uuid, Arc<CompletionBarrier>>>,
    /// Caps concurrent oracle calls across all sessions.
    limiter: Option<Arc<Semaphore>>,
}

impl GradingOrchestrator {
    pub fn new(grader: Arc<Grader>, store: Arc<dyn Store>) -> Self {
        Self {
            grader,
            store,
            barriers: RwLock::new(HashMap::new()),
            limiter: None,
        }
    }

    /// Limit how many grading tasks may call the oracle at once. 0 disables the cap.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.limiter = (parallelism > 0).then(|| Arc::new(Semaphore::new(parallelism)));
        self
    }

    /// Start tracking a session with an empty barrier.
    pub fn register_session(&self, session_id: Uuid) {
        self.barriers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id)
            .or_insert_with(|| Arc::new(CompletionBarrier::new()));
    }

    /// Refuse further submissions for a session. Tasks already admitted
    /// still count towards `await_session`.
    pub fn close_session(&self, session_id: Uuid) {
        if let Some(barrier) = self.barrier(session_id) {
            barrier.close();
        }
    }

    /// Stop tracking a session. Callers already waiting are unaffected.
    pub fn release_session(&self, session_id: Uuid) {
        self.barriers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_id);
    }

    pub fn is_tracked(&self, session_id: Uuid) -> bool {
        self.barrier(session_id).is_some()
    }

    /// Grading tasks still outstanding for a session.
    pub fn pending(&self, session_id: Uuid) -> usize {
        self.barrier(session_id).map_or(0, |b| b.pending())
    }

    fn barrier(&self, session_id: Uuid) -> Option<Arc<CompletionBarrier>> {
        self.barriers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .cloned()
    }

    /// Schedule grading of one answer and return immediately.
    ///
    /// The session's barrier is entered before the task is spawned, so an
    /// `await_session` that starts after this call returns will wait for it.
    ///
    /// # Errors
    ///
    /// `Conflict` if the session is not tracked or has been closed; no task
    /// is spawned in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn submit(&self, request: GradeRequest) -> Result<(), PracticeError> {
        let session = request.session_id;
        let guard = self
            .barrier(session)
            .and_then(|barrier| barrier.try_enter())
            .ok_or_else(|| {
                tracing::warn!(%session, question = %request.question_id, "submission refused");
                PracticeError::Conflict(format!("session {session} is not accepting answers"))
            })?;

        let grader = Arc::clone(&self.grader);
        let store = Arc::clone(&self.store);
        let limiter = self.limiter.clone();

        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };
            grade_and_persist(&grader, store.as_ref(), &request).await;
        });
        Ok(())
    }

    /// Wait until every grading task submitted so far for the session has
    /// persisted its outcome. Returns immediately for untracked sessions.
    pub async fn await_session(&self, session_id: Uuid) {
        if let Some(barrier) = self.barrier(session_id) {
            barrier.wait().await;
        }
    }
}

async fn grade_and_persist(grader: &Grader, store: &dyn Store, request: &GradeRequest) {
    let session = request.session_id;
    let question = request.question_id.as_str();

    match grader.grade(request).await {
        Ok(outcome) => {
            if let Err(e) = store
                .save_grade(
                    session,
                    question,
                    outcome.score,
                    &outcome.covered,
                    &outcome.missed,
                    &request.user_answer,
                )
                .await
            {
                tracing::error!(%session, question, "failed to save grade: {e}");
                return;
            }
            let key = QuestionKey::new(&request.bank_id, question);
            match store.record_score(&key, outcome.score).await {
                Ok(stats) => tracing::info!(
                    %session,
                    question,
                    score = outcome.score,
                    mastery = stats.mastery,
                    "answer graded"
                ),
                Err(e) => tracing::warn!(%session, question, "failed to update question stats: {e}"),
            }
        }
        Err(e) => {
            tracing::warn!(%session, question, attempts = e.attempts, "grading failed: {e}");
            if let Err(store_err) = store
                .save_grade_failure(session, question, &request.user_answer, &e.reason)
                .await
            {
                tracing::error!(%session, question, "failed to save grading failure: {store_err}");
            }
        }
    }
}

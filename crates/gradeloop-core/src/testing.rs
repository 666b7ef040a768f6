//! Test doubles shared by the unit tests in this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;

use crate::error::{OracleError, StoreError};
use crate::mastery::{QuestionKey, QuestionStats, StatsMap};
use crate::model::{Bank, Category, Question, StoredGrade};
use crate::session::PracticeSession;
use crate::store::{InMemoryStore, Store};
use crate::traits::{Oracle, OracleRequest, OracleResponse};

enum Script {
    Always(String),
    Fail(u16),
    Sequence(Mutex<VecDeque<Result<String, OracleError>>>),
}

/// An oracle that replays canned replies, optionally held behind a gate.
pub struct ScriptedOracle {
    script: Script,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicU32,
    last_request: Mutex<Option<OracleRequest>>,
}

impl ScriptedOracle {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            gate: None,
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::with_script(Script::Always(reply.to_string()))
    }

    pub fn failing(status: u16) -> Self {
        Self::with_script(Script::Fail(status))
    }

    /// Replies in order; an exhausted sequence yields empty responses.
    pub fn sequence(replies: Vec<Result<String, OracleError>>) -> Self {
        Self::with_script(Script::Sequence(Mutex::new(replies.into())))
    }

    /// Every call waits for one permit on the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<OracleRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let content = match &self.script {
            Script::Always(reply) => reply.clone(),
            Script::Fail(status) => {
                return Err(OracleError::ApiError {
                    status: *status,
                    message: "scripted failure".into(),
                })
            }
            Script::Sequence(replies) => replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(OracleError::EmptyResponse))?,
        };

        Ok(OracleResponse {
            content,
            model: request.model.clone(),
            latency_ms: 0,
        })
    }
}

/// Wraps an [`InMemoryStore`] with switchable faults.
///
/// While armed, `get_bank` signals `bank_requested` and then waits for a
/// permit on `bank_gate`. `fail_grades` makes `get_grades` return a backend
/// error.
pub struct FaultyStore {
    pub inner: Arc<InMemoryStore>,
    pub bank_gate: Semaphore,
    pub bank_requested: Notify,
    pub gate_bank: AtomicBool,
    pub fail_grades: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            bank_gate: Semaphore::new(0),
            bank_requested: Notify::new(),
            gate_bank: AtomicBool::new(false),
            fail_grades: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn get_bank(&self, id: &str) -> Result<Bank, StoreError> {
        if self.gate_bank.load(Ordering::SeqCst) {
            self.bank_requested.notify_one();
            self.bank_gate.acquire().await.expect("gate closed").forget();
        }
        self.inner.get_bank(id).await
    }

    async fn banks_in_category(&self, category_id: &str) -> Result<Vec<Bank>, StoreError> {
        self.inner.banks_in_category(category_id).await
    }

    async fn categories_in_folder(&self, folder_id: &str) -> Result<Vec<Category>, StoreError> {
        self.inner.categories_in_folder(folder_id).await
    }

    async fn weakest_first(&self, bank_id: &str) -> Result<Vec<Question>, StoreError> {
        self.inner.weakest_first(bank_id).await
    }

    async fn create_session(&self, session: &PracticeSession) -> Result<(), StoreError> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, id: Uuid) -> Result<PracticeSession, StoreError> {
        self.inner.get_session(id).await
    }

    async fn complete_session(&self, id: Uuid) -> Result<PracticeSession, StoreError> {
        self.inner.complete_session(id).await
    }

    async fn save_grade(
        &self,
        session_id: Uuid,
        question_id: &str,
        score: u8,
        covered: &[String],
        missed: &[String],
        user_answer: &str,
    ) -> Result<(), StoreError> {
        self.inner
            .save_grade(session_id, question_id, score, covered, missed, user_answer)
            .await
    }

    async fn save_grade_failure(
        &self,
        session_id: Uuid,
        question_id: &str,
        user_answer: &str,
        reason: &str,
    ) -> Result<(), StoreError> {
        self.inner
            .save_grade_failure(session_id, question_id, user_answer, reason)
            .await
    }

    async fn get_grades(&self, session_id: Uuid) -> Result<Vec<StoredGrade>, StoreError> {
        if self.fail_grades.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("grades table unavailable".into()));
        }
        self.inner.get_grades(session_id).await
    }

    async fn record_score(
        &self,
        key: &QuestionKey,
        score: u8,
    ) -> Result<QuestionStats, StoreError> {
        self.inner.record_score(key, score).await
    }

    async fn stats_for(&self, keys: &[QuestionKey]) -> Result<StatsMap, StoreError> {
        self.inner.stats_for(keys).await
    }
}

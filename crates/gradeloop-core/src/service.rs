//! The practice operations exposed to an outer surface (HTTP handlers, CLI).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::PracticeError;
use crate::mastery::{self, QuestionKey};
use crate::model::{GradeRequest, GradeStatus, StoredGrade};
use crate::orchestrator::GradingOrchestrator;
use crate::session::{PracticeSession, SessionBuilder, SessionConfig};
use crate::store::Store;

/// Acknowledgement that an answer was queued for grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub session_id: Uuid,
    pub question_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionOutcome {
    Graded,
    Failed,
    Unanswered,
}

/// Final result for one session question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub subject: String,
    pub expected_answer: String,
    pub user_answer: Option<String>,
    pub score: u8,
    pub covered: Vec<String>,
    pub missed: Vec<String>,
    pub outcome: QuestionOutcome,
}

/// Aggregated outcome of a completed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResults {
    pub session_id: Uuid,
    pub bank_id: String,
    pub total_score: u32,
    /// 100 per session question.
    pub max_score: u32,
    /// In session order.
    pub results: Vec<QuestionResult>,
}

impl SessionResults {
    pub fn count(&self, outcome: QuestionOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Session lifecycle plus read-time mastery queries.
pub struct PracticeService {
    store: Arc<dyn Store>,
    orchestrator: Arc<GradingOrchestrator>,
}

impl PracticeService {
    pub fn new(store: Arc<dyn Store>, orchestrator: Arc<GradingOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Build a new active session from a bank and start tracking its grades.
    #[instrument(skip(self, config), fields(focus_on_weak = config.focus_on_weak))]
    pub async fn create_session(
        &self,
        bank_id: &str,
        config: SessionConfig,
    ) -> Result<PracticeSession, PracticeError> {
        let bank = self.store.get_bank(bank_id).await?;

        let wants_weak_order = config.focus_on_weak && config.question_ids.is_empty();
        let mut builder = SessionBuilder::new(&bank, config);
        if wants_weak_order {
            builder = builder.weakest_first(self.store.weakest_first(bank_id).await?);
        }
        let session = builder.build()?;

        self.store.create_session(&session).await?;
        self.orchestrator.register_session(session.id);
        tracing::info!(
            session = %session.id,
            questions = session.questions.len(),
            "practice session created"
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<PracticeSession, PracticeError> {
        Ok(self.store.get_session(session_id).await?)
    }

    /// Queue an answer for grading. Returns as soon as the task is scheduled.
    #[instrument(skip(self, answer))]
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        question_id: &str,
        answer: &str,
    ) -> Result<SubmitReceipt, PracticeError> {
        let session = self.store.get_session(session_id).await?;
        session.ensure_active()?;
        let question = session.question(question_id).ok_or_else(|| {
            PracticeError::NotFound(format!(
                "question '{question_id}' is not part of session {session_id}"
            ))
        })?;
        let bank = self.store.get_bank(&session.bank_id).await?;

        self.orchestrator.submit(GradeRequest {
            session_id,
            bank_id: bank.id.clone(),
            question_id: question.id.clone(),
            question: question.subject.clone(),
            expected_answer: question.expected_answer.clone(),
            user_answer: answer.to_string(),
            rubric: bank.rubric.clone(),
            bank_type: bank.bank_type,
        })?;

        Ok(SubmitReceipt {
            session_id,
            question_id: question.id.clone(),
            status: "submitted".to_string(),
        })
    }

    /// Complete a session, wait for its outstanding grades, and aggregate them.
    ///
    /// Submissions still in flight when the session flips to completed are
    /// either admitted before the barrier closes (and waited for) or refused.
    ///
    /// # Errors
    ///
    /// `Conflict` if the session was already completed; nothing is
    /// recomputed in that case. A storage error while collecting grades is
    /// returned as is, and the session is no longer tracked afterwards.
    #[instrument(skip(self))]
    pub async fn complete_session(&self, session_id: Uuid) -> Result<SessionResults, PracticeError> {
        let session = self.store.complete_session(session_id).await?;
        self.orchestrator.close_session(session_id);

        tracing::debug!(
            pending = self.orchestrator.pending(session_id),
            "waiting for outstanding grades"
        );
        self.orchestrator.await_session(session_id).await;

        let grades = self.store.get_grades(session_id).await;
        self.orchestrator.release_session(session_id);
        let grades = grades?;

        let results = aggregate(&session, grades);
        tracing::info!(
            session = %session_id,
            total = results.total_score,
            max = results.max_score,
            failed = results.count(QuestionOutcome::Failed),
            "practice session completed"
        );
        Ok(results)
    }

    /// Mastery of a single bank question; 0 if it was never graded.
    pub async fn question_mastery(
        &self,
        bank_id: &str,
        question_id: &str,
    ) -> Result<u8, PracticeError> {
        let key = QuestionKey::new(bank_id, question_id);
        let stats = self.store.stats_for(std::slice::from_ref(&key)).await?;
        Ok(stats.get(&key).map_or(0, |s| s.mastery))
    }

    pub async fn bank_mastery(&self, bank_id: &str) -> Result<f64, PracticeError> {
        let bank = self.store.get_bank(bank_id).await?;
        let stats = self.store.stats_for(&QuestionKey::for_banks([&bank])).await?;
        Ok(mastery::bank_mastery(&bank, &stats))
    }

    pub async fn category_mastery(&self, category_id: &str) -> Result<f64, PracticeError> {
        let banks = self.store.banks_in_category(category_id).await?;
        let stats = self.store.stats_for(&QuestionKey::for_banks(&banks)).await?;
        Ok(mastery::category_mastery(&banks, &stats))
    }

    pub async fn folder_mastery(&self, folder_id: &str) -> Result<f64, PracticeError> {
        let categories = self.store.categories_in_folder(folder_id).await?;
        let mut per_category = Vec::with_capacity(categories.len());
        for category in &categories {
            per_category.push(self.store.banks_in_category(&category.id).await?);
        }
        let keys = QuestionKey::for_banks(per_category.iter().flatten());
        let stats = self.store.stats_for(&keys).await?;
        Ok(mastery::folder_mastery(&per_category, &stats))
    }
}

/// Join grades onto the session's questions by id, keeping session order.
fn aggregate(session: &PracticeSession, grades: Vec<StoredGrade>) -> SessionResults {
    let mut by_question: HashMap<String, StoredGrade> = grades
        .into_iter()
        .map(|g| (g.question_id.clone(), g))
        .collect();

    let results: Vec<QuestionResult> = session
        .questions
        .iter()
        .map(|q| match by_question.remove(&q.id) {
            Some(grade) => QuestionResult {
                question_id: q.id.clone(),
                subject: q.subject.clone(),
                expected_answer: q.expected_answer.clone(),
                user_answer: Some(grade.user_answer),
                score: grade.score,
                covered: grade.covered,
                missed: grade.missed,
                outcome: match grade.status {
                    GradeStatus::Success => QuestionOutcome::Graded,
                    GradeStatus::Failed => QuestionOutcome::Failed,
                },
            },
            None => QuestionResult {
                question_id: q.id.clone(),
                subject: q.subject.clone(),
                expected_answer: q.expected_answer.clone(),
                user_answer: None,
                score: 0,
                covered: Vec::new(),
                missed: Vec::new(),
                outcome: QuestionOutcome::Unanswered,
            },
        })
        .collect();

    SessionResults {
        session_id: session.id,
        bank_id: session.bank_id.clone(),
        total_score: results.iter().map(|r| u32::from(r.score)).sum(),
        max_score: 100 * session.questions.len() as u32,
        results,
    }
}

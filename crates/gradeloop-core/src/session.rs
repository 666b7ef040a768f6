//! Practice sessions: question selection and the Active → Completed lifecycle.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PracticeError;
use crate::model::{Bank, Question};

/// How to pick the questions for a new session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Cap on the number of questions; `None` or 0 means no cap.
    #[serde(default)]
    pub max_questions: Option<usize>,
    /// Informational time limit, stored and echoed but never enforced.
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Order questions weakest-first instead of shuffling.
    #[serde(default)]
    pub focus_on_weak: bool,
    /// Explicit question selection; takes precedence over everything else.
    #[serde(default)]
    pub question_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// One run through a fixed, ordered set of questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSession {
    pub id: Uuid,
    pub bank_id: String,
    /// Snapshot taken at build time; later bank edits do not affect it.
    pub questions: Vec<Question>,
    pub status: SessionStatus,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub focus_on_weak: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PracticeSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Fails with `Conflict` unless the session still accepts answers.
    pub fn ensure_active(&self) -> Result<(), PracticeError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(PracticeError::Conflict(format!(
                "session {} is already completed",
                self.id
            )))
        }
    }

    /// The one-way Active → Completed transition.
    pub fn complete(&mut self) -> Result<(), PracticeError> {
        self.ensure_active()?;
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Turns a bank and a [`SessionConfig`] into a new active session.
pub struct SessionBuilder<'a> {
    bank: &'a Bank,
    config: SessionConfig,
    weakest_first: Option<Vec<Question>>,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(bank: &'a Bank, config: SessionConfig) -> Self {
        Self {
            bank,
            config,
            weakest_first: None,
        }
    }

    /// Supply the bank's questions ordered by ascending mastery.
    ///
    /// Used only when `focus_on_weak` is set and no explicit ids are given.
    pub fn weakest_first(mut self, ordered: Vec<Question>) -> Self {
        self.weakest_first = Some(ordered);
        self
    }

    pub fn build(self) -> Result<PracticeSession, PracticeError> {
        self.build_with_rng(&mut rand::rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(
        self,
        rng: &mut R,
    ) -> Result<PracticeSession, PracticeError> {
        if self.bank.questions.is_empty() {
            return Err(PracticeError::Validation(format!(
                "bank '{}' has no questions",
                self.bank.id
            )));
        }

        let mut questions = if !self.config.question_ids.is_empty() {
            let selected = select_explicit(&self.bank.questions, &self.config.question_ids);
            if selected.is_empty() {
                return Err(PracticeError::Validation(format!(
                    "none of the requested questions belong to bank '{}'",
                    self.bank.id
                )));
            }
            selected
        } else if let (true, Some(ordered)) = (self.config.focus_on_weak, self.weakest_first) {
            unique_by_id(ordered)
        } else {
            let mut all = unique_by_id(self.bank.questions.clone());
            all.shuffle(rng);
            all
        };

        if let Some(limit) = self.config.max_questions.filter(|&n| n > 0) {
            questions.truncate(limit);
        }

        if questions.is_empty() {
            return Err(PracticeError::Validation(format!(
                "no questions selected from bank '{}'",
                self.bank.id
            )));
        }

        Ok(PracticeSession {
            id: Uuid::new_v4(),
            bank_id: self.bank.id.clone(),
            questions,
            status: SessionStatus::Active,
            time_limit_minutes: self.config.time_limit_minutes,
            focus_on_weak: self.config.focus_on_weak,
            created_at: Utc::now(),
            completed_at: None,
        })
    }
}

/// Keeps the first question for each id. Grades and stats are keyed by id,
/// so a repeated id would otherwise share one record between two entries.
fn unique_by_id(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.id.clone()))
        .collect()
}

/// Bank questions named in `ids`, in request order, each at most once.
/// A repeated bank id resolves to its first question.
fn select_explicit(bank_questions: &[Question], ids: &[String]) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(question) = bank_questions.iter().find(|q| &q.id == id) {
            selected.push(question.clone());
        }
    }
    selected
}

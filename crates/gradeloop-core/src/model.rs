//! Core data model types for gradeloop.
//!
//! Questions live in banks, banks are grouped into categories, and categories
//! into folders. Grades are the per-question outcome of one practice session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A single question/answer pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the owning bank.
    pub id: String,
    /// The question text shown to the user.
    pub subject: String,
    /// The reference answer the grader compares against.
    pub expected_answer: String,
}

/// Grading mode of a bank. Selects the prompt strategy used by the grader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankType {
    #[default]
    Theory,
    Code,
    Cli,
}

impl fmt::Display for BankType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankType::Theory => write!(f, "theory"),
            BankType::Code => write!(f, "code"),
            BankType::Cli => write!(f, "cli"),
        }
    }
}

impl FromStr for BankType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "theory" => Ok(BankType::Theory),
            "code" => Ok(BankType::Code),
            "cli" | "shell" => Ok(BankType::Cli),
            other => Err(format!("unknown bank type: {other}")),
        }
    }
}

/// A named collection of questions sharing a subject and grading mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bank_type: BankType,
    /// Category this bank belongs to, if any.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Custom grading rubric that replaces the default criteria.
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Bank {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

/// Everything the grader needs to judge one answer. Never persisted as such.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub session_id: Uuid,
    pub bank_id: String,
    pub question_id: String,
    pub question: String,
    pub expected_answer: String,
    pub user_answer: String,
    #[serde(default)]
    pub rubric: Option<String>,
    pub bank_type: BankType,
}

/// Whether a grading attempt produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeStatus {
    Success,
    Failed,
}

/// A persisted grade for one (session, question) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGrade {
    pub question_id: String,
    /// 0–100, derived from the covered/missed counts.
    pub score: u8,
    pub covered: Vec<String>,
    pub missed: Vec<String>,
    pub user_answer: String,
    pub status: GradeStatus,
    pub graded_at: DateTime<Utc>,
}

//! Mastery scoring.
//!
//! Per-question mastery is updated on every successful grade:
//!
//! - first grade: mastery = score
//! - later grades: mastery = round(0.6 × latest + 0.4 × mean of all earlier scores)
//!
//! Bank, category and folder mastery are computed at read time by flattening
//! every question underneath and averaging once. Unanswered questions count
//! as 0. Averages of averages are never taken.
//!
//! Question ids are only unique inside their bank, so statistics are keyed
//! by [`QuestionKey`] (bank id plus question id).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Bank;

/// A score at or above this counts as a correct answer.
pub const CORRECT_THRESHOLD: u8 = 70;

const LATEST_WEIGHT: f64 = 0.6;
const HISTORY_WEIGHT: f64 = 0.4;

/// Identifies one question across every bank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionKey {
    pub bank_id: String,
    pub question_id: String,
}

impl QuestionKey {
    pub fn new(bank_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            bank_id: bank_id.into(),
            question_id: question_id.into(),
        }
    }

    /// Keys for every question of the given banks, in bank order.
    pub fn for_banks<'a, I>(banks: I) -> Vec<QuestionKey>
    where
        I: IntoIterator<Item = &'a Bank>,
    {
        banks
            .into_iter()
            .flat_map(|b| b.questions.iter().map(|q| QuestionKey::new(&b.id, &q.id)))
            .collect()
    }
}

/// Statistics indexed by question key.
pub type StatsMap = HashMap<QuestionKey, QuestionStats>;

/// Running grading statistics for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub bank_id: String,
    pub question_id: String,
    pub times_answered: u32,
    pub times_correct: u32,
    /// Sum of every score ever recorded.
    pub total_score: u64,
    pub latest_score: u8,
    /// 0–100.
    pub mastery: u8,
}

impl QuestionStats {
    pub fn new(bank_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            bank_id: bank_id.into(),
            question_id: question_id.into(),
            times_answered: 0,
            times_correct: 0,
            total_score: 0,
            latest_score: 0,
            mastery: 0,
        }
    }

    pub fn key(&self) -> QuestionKey {
        QuestionKey::new(&self.bank_id, &self.question_id)
    }

    /// Fold a new score into the statistics.
    pub fn apply_score(&mut self, score: u8) {
        let score = score.min(100);
        self.times_answered += 1;
        if score >= CORRECT_THRESHOLD {
            self.times_correct += 1;
        }
        self.total_score += u64::from(score);
        self.latest_score = score;

        self.mastery = if self.times_answered == 1 {
            score
        } else {
            let earlier = (self.total_score - u64::from(score)) as f64;
            let historical_avg = earlier / f64::from(self.times_answered - 1);
            let blended = f64::from(score) * LATEST_WEIGHT + historical_avg * HISTORY_WEIGHT;
            blended.round().clamp(0.0, 100.0) as u8
        };
    }
}

/// Mean mastery over a flat list of questions. Empty input yields 0.0.
pub fn mean_mastery<'a, I>(keys: I, stats: &StatsMap) -> f64
where
    I: IntoIterator<Item = &'a QuestionKey>,
{
    let mut count = 0usize;
    let mut sum = 0u64;
    for key in keys {
        count += 1;
        sum += stats.get(key).map(|s| u64::from(s.mastery)).unwrap_or(0);
    }
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Mean mastery of every question in a bank.
pub fn bank_mastery(bank: &Bank, stats: &StatsMap) -> f64 {
    mean_mastery(&QuestionKey::for_banks([bank]), stats)
}

/// Mean mastery over every question of every bank in a category.
pub fn category_mastery(banks: &[Bank], stats: &StatsMap) -> f64 {
    mean_mastery(&QuestionKey::for_banks(banks), stats)
}

/// Mean mastery over every question under a folder, given its categories' banks.
pub fn folder_mastery(categories: &[Vec<Bank>], stats: &StatsMap) -> f64 {
    mean_mastery(&QuestionKey::for_banks(categories.iter().flatten()), stats)
}

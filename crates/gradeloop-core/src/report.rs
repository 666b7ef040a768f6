//! Session reports and question-stats snapshots with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mastery::QuestionStats;
use crate::service::{QuestionOutcome, SessionResults};
use crate::session::PracticeSession;

/// A completed session as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub bank_id: String,
    pub bank_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    pub focus_on_weak: bool,
    pub results: SessionResults,
    /// Bank mastery after this session's grades were applied.
    pub bank_mastery: f64,
}

impl SessionReport {
    pub fn new(
        session: &PracticeSession,
        bank_name: &str,
        results: SessionResults,
        bank_mastery: f64,
    ) -> Self {
        Self {
            session_id: session.id,
            bank_id: session.bank_id.clone(),
            bank_name: bank_name.to_string(),
            created_at: session.created_at,
            completed_at: session.completed_at.or_else(|| Some(Utc::now())),
            time_limit_minutes: session.time_limit_minutes,
            focus_on_weak: session.focus_on_weak,
            results,
            bank_mastery,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let r = &self.results;
        let mut md = String::new();

        md.push_str(&format!("## {} — session {}\n\n", self.bank_name, self.session_id));
        md.push_str(&format!(
            "**Score:** {}/{} ({} graded, {} failed, {} unanswered)\n\n",
            r.total_score,
            r.max_score,
            r.count(QuestionOutcome::Graded),
            r.count(QuestionOutcome::Failed),
            r.count(QuestionOutcome::Unanswered),
        ));
        md.push_str(&format!("**Bank mastery:** {:.1}\n\n", self.bank_mastery));

        md.push_str("| Question | Score | Covered | Missed |\n");
        md.push_str("|----------|-------|---------|--------|\n");
        for q in &r.results {
            let score = match q.outcome {
                QuestionOutcome::Graded => q.score.to_string(),
                QuestionOutcome::Failed => "failed".to_string(),
                QuestionOutcome::Unanswered => "—".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                q.question_id,
                score,
                q.covered.join("; "),
                q.missed.join("; "),
            ));
        }

        md
    }
}

/// Load a stats snapshot. A missing file is an empty history.
pub fn load_stats_file(path: &Path) -> Result<Vec<QuestionStats>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read stats from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse stats JSON: {}", path.display()))
}

pub fn save_stats_file(path: &Path, stats: &[QuestionStats]) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("failed to serialize stats")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write stats to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::QuestionResult;
    use crate::session::SessionStatus;

    fn make_report() -> SessionReport {
        let session = PracticeSession {
            id: Uuid::nil(),
            bank_id: "rust".into(),
            questions: vec![],
            status: SessionStatus::Completed,
            time_limit_minutes: Some(10),
            focus_on_weak: false,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        let results = SessionResults {
            session_id: Uuid::nil(),
            bank_id: "rust".into(),
            total_score: 50,
            max_score: 200,
            results: vec![
                QuestionResult {
                    question_id: "move".into(),
                    subject: "What is a move?".into(),
                    expected_answer: "Ownership transfer".into(),
                    user_answer: Some("copying".into()),
                    score: 50,
                    covered: vec!["value is transferred".into()],
                    missed: vec!["source becomes invalid".into()],
                    outcome: QuestionOutcome::Graded,
                },
                QuestionResult {
                    question_id: "borrow".into(),
                    subject: "What is a borrow?".into(),
                    expected_answer: "A reference".into(),
                    user_answer: Some("?".into()),
                    score: 0,
                    covered: vec![],
                    missed: vec!["Unable to evaluate: request timed out after 180s".into()],
                    outcome: QuestionOutcome::Failed,
                },
            ],
        };
        SessionReport::new(&session, "Rust", results, 25.0)
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        report.save_json(&path).unwrap();
        let loaded = SessionReport::load_json(&path).unwrap();

        assert_eq!(loaded.bank_id, "rust");
        assert_eq!(loaded.time_limit_minutes, Some(10));
        assert_eq!(loaded.results.results.len(), 2);
        assert_eq!(loaded.results.results[1].outcome, QuestionOutcome::Failed);
    }

    #[test]
    fn markdown_output() {
        let md = make_report().to_markdown();
        assert!(md.contains("50/200"));
        assert!(md.contains("1 graded, 1 failed, 0 unanswered"));
        assert!(md.contains("| borrow | failed |"));
        assert!(md.contains("source becomes invalid"));
    }

    #[test]
    fn stats_file_roundtrip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        assert!(load_stats_file(&path).unwrap().is_empty());

        let mut stats = QuestionStats::new("rust", "move");
        stats.apply_score(80);
        save_stats_file(&path, std::slice::from_ref(&stats)).unwrap();

        assert_eq!(load_stats_file(&path).unwrap(), vec![stats]);
    }
}

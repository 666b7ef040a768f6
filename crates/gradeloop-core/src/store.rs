//! The persistence gateway and an in-memory implementation.
//!
//! Storage is injected into every component as an `Arc<dyn Store>`; opening
//! and closing a real backend is the job of whoever assembles the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::mastery::{QuestionKey, QuestionStats, StatsMap};
use crate::model::{Bank, Category, Folder, GradeStatus, Question, StoredGrade};
use crate::session::PracticeSession;

/// Persistence contract consumed by the practice service and orchestrator.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch a bank with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the bank does not exist.
    async fn get_bank(&self, id: &str) -> Result<Bank, StoreError>;

    /// Every bank assigned to a category.
    async fn banks_in_category(&self, category_id: &str) -> Result<Vec<Bank>, StoreError>;

    /// Every category inside a folder.
    async fn categories_in_folder(&self, folder_id: &str) -> Result<Vec<Category>, StoreError>;

    /// The bank's questions ordered by ascending mastery, unanswered first.
    async fn weakest_first(&self, bank_id: &str) -> Result<Vec<Question>, StoreError>;

    async fn create_session(&self, session: &PracticeSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<PracticeSession, StoreError>;

    /// Mark a session completed and return it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if it was already completed.
    async fn complete_session(&self, id: Uuid) -> Result<PracticeSession, StoreError>;

    /// Record a successful grade, replacing any earlier one for the question.
    async fn save_grade(
        &self,
        session_id: Uuid,
        question_id: &str,
        score: u8,
        covered: &[String],
        missed: &[String],
        user_answer: &str,
    ) -> Result<(), StoreError>;

    /// Record a grading failure as a zero-score grade carrying the reason.
    async fn save_grade_failure(
        &self,
        session_id: Uuid,
        question_id: &str,
        user_answer: &str,
        reason: &str,
    ) -> Result<(), StoreError>;

    async fn get_grades(&self, session_id: Uuid) -> Result<Vec<StoredGrade>, StoreError>;

    /// Fold a score into a question's statistics as one atomic update.
    async fn record_score(&self, key: &QuestionKey, score: u8)
        -> Result<QuestionStats, StoreError>;

    /// Statistics for the given questions; unanswered questions are absent.
    async fn stats_for(&self, keys: &[QuestionKey]) -> Result<StatsMap, StoreError>;
}

/// Mutex-guarded maps. Suitable for tests and single-process use.
#[derive(Default)]
pub struct InMemoryStore {
    banks: Mutex<HashMap<String, Bank>>,
    categories: Mutex<HashMap<String, Category>>,
    folders: Mutex<HashMap<String, Folder>>,
    sessions: Mutex<HashMap<Uuid, PracticeSession>>,
    grades: Mutex<HashMap<Uuid, HashMap<String, StoredGrade>>>,
    stats: Mutex<StatsMap>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|e| StoreError::Backend(e.to_string()))
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bank(&self, bank: Bank) -> Result<(), StoreError> {
        lock(&self.banks)?.insert(bank.id.clone(), bank);
        Ok(())
    }

    pub fn put_category(&self, category: Category) -> Result<(), StoreError> {
        lock(&self.categories)?.insert(category.id.clone(), category);
        Ok(())
    }

    pub fn put_folder(&self, folder: Folder) -> Result<(), StoreError> {
        lock(&self.folders)?.insert(folder.id.clone(), folder);
        Ok(())
    }

    /// Replace all question statistics, e.g. from a snapshot file.
    pub fn load_stats(&self, stats: Vec<QuestionStats>) -> Result<(), StoreError> {
        let mut guard = lock(&self.stats)?;
        guard.clear();
        guard.extend(stats.into_iter().map(|s| (s.key(), s)));
        Ok(())
    }

    /// All question statistics, sorted by bank id then question id.
    pub fn stats_snapshot(&self) -> Result<Vec<QuestionStats>, StoreError> {
        let mut stats: Vec<QuestionStats> = lock(&self.stats)?.values().cloned().collect();
        stats.sort_by_key(QuestionStats::key);
        Ok(stats)
    }

    fn put_grade(&self, session_id: Uuid, grade: StoredGrade) -> Result<(), StoreError> {
        if !lock(&self.sessions)?.contains_key(&session_id) {
            return Err(StoreError::NotFound(format!("session {session_id}")));
        }
        lock(&self.grades)?
            .entry(session_id)
            .or_default()
            .insert(grade.question_id.clone(), grade);
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_bank(&self, id: &str) -> Result<Bank, StoreError> {
        lock(&self.banks)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("bank '{id}'")))
    }

    async fn banks_in_category(&self, category_id: &str) -> Result<Vec<Bank>, StoreError> {
        if !lock(&self.categories)?.contains_key(category_id) {
            return Err(StoreError::NotFound(format!("category '{category_id}'")));
        }
        let mut banks: Vec<Bank> = lock(&self.banks)?
            .values()
            .filter(|b| b.category_id.as_deref() == Some(category_id))
            .cloned()
            .collect();
        banks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(banks)
    }

    async fn categories_in_folder(&self, folder_id: &str) -> Result<Vec<Category>, StoreError> {
        if !lock(&self.folders)?.contains_key(folder_id) {
            return Err(StoreError::NotFound(format!("folder '{folder_id}'")));
        }
        let mut categories: Vec<Category> = lock(&self.categories)?
            .values()
            .filter(|c| c.folder_id.as_deref() == Some(folder_id))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(categories)
    }

    async fn weakest_first(&self, bank_id: &str) -> Result<Vec<Question>, StoreError> {
        let mut questions = self.get_bank(bank_id).await?.questions;
        let stats = lock(&self.stats)?;
        questions.sort_by_key(|q| {
            stats
                .get(&QuestionKey::new(bank_id, &q.id))
                .map(|s| s.mastery)
                .unwrap_or(0)
        });
        Ok(questions)
    }

    async fn create_session(&self, session: &PracticeSession) -> Result<(), StoreError> {
        let mut sessions = lock(&self.sessions)?;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<PracticeSession, StoreError> {
        lock(&self.sessions)?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    async fn complete_session(&self, id: Uuid) -> Result<PracticeSession, StoreError> {
        let mut sessions = lock(&self.sessions)?;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        match session.complete() {
            Ok(()) => Ok(session.clone()),
            Err(_) => Err(StoreError::Conflict(format!(
                "session {id} is already completed"
            ))),
        }
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
        self.put_grade(
            session_id,
            StoredGrade {
                question_id: question_id.to_string(),
                score,
                covered: covered.to_vec(),
                missed: missed.to_vec(),
                user_answer: user_answer.to_string(),
                status: GradeStatus::Success,
                graded_at: Utc::now(),
            },
        )
    }

    async fn save_grade_failure(
        &self,
        session_id: Uuid,
        question_id: &str,
        user_answer: &str,
        reason: &str,
    ) -> Result<(), StoreError> {
        self.put_grade(
            session_id,
            StoredGrade {
                question_id: question_id.to_string(),
                score: 0,
                covered: Vec::new(),
                missed: vec![reason.to_string()],
                user_answer: user_answer.to_string(),
                status: GradeStatus::Failed,
                graded_at: Utc::now(),
            },
        )
    }

    async fn get_grades(&self, session_id: Uuid) -> Result<Vec<StoredGrade>, StoreError> {
        Ok(lock(&self.grades)?
            .get(&session_id)
            .map(|g| g.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn record_score(
        &self,
        key: &QuestionKey,
        score: u8,
    ) -> Result<QuestionStats, StoreError> {
        let mut stats = lock(&self.stats)?;
        let entry = stats
            .entry(key.clone())
            .or_insert_with(|| QuestionStats::new(&key.bank_id, &key.question_id));
        entry.apply_score(score);
        Ok(entry.clone())
    }

    async fn stats_for(&self, keys: &[QuestionKey]) -> Result<StatsMap, StoreError> {
        let stats = lock(&self.stats)?;
        Ok(keys
            .iter()
            .filter_map(|k| stats.get(k).map(|s| (k.clone(), s.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BankType;
    use crate::session::{SessionBuilder, SessionConfig, SessionStatus};
    use std::sync::Arc;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            subject: format!("subject {id}"),
            expected_answer: format!("answer {id}"),
        }
    }

    fn bank(id: &str, category: Option<&str>, question_ids: &[&str]) -> Bank {
        Bank {
            id: id.into(),
            name: id.into(),
            bank_type: BankType::Theory,
            category_id: category.map(String::from),
            rubric: None,
            questions: question_ids.iter().map(|q| question(q)).collect(),
        }
    }

    async fn store_with_session() -> (InMemoryStore, PracticeSession) {
        let store = InMemoryStore::new();
        let b = bank("b", None, &["q1", "q2"]);
        store.put_bank(b.clone()).unwrap();
        let session = SessionBuilder::new(&b, SessionConfig::default())
            .build()
            .unwrap();
        store.create_session(&session).await.unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn missing_bank_is_not_found() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.get_bank("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn complete_session_twice_conflicts() {
        let (store, session) = store_with_session().await;

        let completed = store.complete_session(session.id).await.unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);
        assert!(matches!(
            store.complete_session(session.id).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn later_grade_replaces_earlier_one() {
        let (store, session) = store_with_session().await;

        store
            .save_grade_failure(session.id, "q1", "first", "Unable to evaluate: timeout")
            .await
            .unwrap();
        store
            .save_grade(session.id, "q1", 100, &["x".into()], &[], "second")
            .await
            .unwrap();

        let grades = store.get_grades(session.id).await.unwrap();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].status, GradeStatus::Success);
        assert_eq!(grades[0].user_answer, "second");
    }

    #[tokio::test]
    async fn failure_record_carries_reason() {
        let (store, session) = store_with_session().await;
        store
            .save_grade_failure(session.id, "q2", "answer", "Unable to evaluate: HTTP 500")
            .await
            .unwrap();

        let grade = &store.get_grades(session.id).await.unwrap()[0];
        assert_eq!(grade.score, 0);
        assert!(grade.covered.is_empty());
        assert_eq!(grade.missed, vec!["Unable to evaluate: HTTP 500"]);
    }

    #[tokio::test]
    async fn grade_for_unknown_session_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .save_grade(Uuid::new_v4(), "q", 10, &[], &[], "a")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_score_updates_are_not_lost() {
        let store = Arc::new(InMemoryStore::new());
        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store.record_score(&QuestionKey::new("b", "q"), 50).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let key = QuestionKey::new("b", "q");
        let stats = store.stats_for(&[key.clone()]).await.unwrap();
        assert_eq!(stats[&key].times_answered, 100);
        assert_eq!(stats[&key].total_score, 5000);
        assert_eq!(stats[&key].mastery, 50);
    }

    #[tokio::test]
    async fn weakest_first_orders_by_mastery_with_unanswered_first() {
        let store = InMemoryStore::new();
        store.put_bank(bank("b", None, &["a", "b", "c", "d"])).unwrap();
        for (id, score) in [("a", 90), ("b", 20), ("d", 60)] {
            store.record_score(&QuestionKey::new("b", id), score).await.unwrap();
        }
        // Same question id in another bank must not affect this ordering.
        store.record_score(&QuestionKey::new("other", "c"), 100).await.unwrap();

        let ordered: Vec<String> = store
            .weakest_first("b")
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ordered, vec!["c", "b", "d", "a"]);
    }

    #[tokio::test]
    async fn hierarchy_lookups() {
        let store = InMemoryStore::new();
        store
            .put_folder(Folder {
                id: "f".into(),
                name: "F".into(),
            })
            .unwrap();
        store
            .put_category(Category {
                id: "c".into(),
                name: "C".into(),
                folder_id: Some("f".into()),
            })
            .unwrap();
        store.put_bank(bank("b2", Some("c"), &["x"])).unwrap();
        store.put_bank(bank("b1", Some("c"), &["y"])).unwrap();
        store.put_bank(bank("other", None, &["z"])).unwrap();

        let banks = store.banks_in_category("c").await.unwrap();
        assert_eq!(
            banks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["b1", "b2"]
        );
        assert_eq!(store.categories_in_folder("f").await.unwrap().len(), 1);
        assert!(matches!(
            store.banks_in_category("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stats_snapshot_round_trips_through_load() {
        let store = InMemoryStore::new();
        store.record_score(&QuestionKey::new("b", "q2"), 40).await.unwrap();
        store.record_score(&QuestionKey::new("b", "q1"), 80).await.unwrap();
        store.record_score(&QuestionKey::new("a", "q9"), 10).await.unwrap();
        let snapshot = store.stats_snapshot().unwrap();
        let keys: Vec<_> = snapshot.iter().map(QuestionStats::key).collect();
        assert_eq!(
            keys,
            vec![
                QuestionKey::new("a", "q9"),
                QuestionKey::new("b", "q1"),
                QuestionKey::new("b", "q2"),
            ]
        );

        let fresh = InMemoryStore::new();
        fresh.load_stats(snapshot.clone()).unwrap();
        assert_eq!(fresh.stats_snapshot().unwrap(), snapshot);
    }

    #[tokio::test]
    async fn same_question_id_in_two_banks_is_tracked_separately() {
        let store = InMemoryStore::new();
        let go = QuestionKey::new("go", "q1");
        let rust = QuestionKey::new("rust", "q1");
        store.record_score(&go, 90).await.unwrap();

        let stats = store.stats_for(&[go.clone(), rust.clone()]).await.unwrap();
        assert_eq!(stats[&go].mastery, 90);
        assert!(!stats.contains_key(&rust));
    }
}

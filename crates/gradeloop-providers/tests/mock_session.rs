//! Full practice sessions graded by `MockOracle`.

use std::sync::Arc;
use std::time::Duration;

use gradeloop_core::error::OracleError;
use gradeloop_core::grader::{Grader, GraderConfig};
use gradeloop_core::model::{Bank, BankType, Question};
use gradeloop_core::orchestrator::GradingOrchestrator;
use gradeloop_core::service::{PracticeService, QuestionOutcome};
use gradeloop_core::session::SessionConfig;
use gradeloop_core::store::InMemoryStore;
use gradeloop_providers::mock::MockOracle;

fn bank() -> Bank {
    Bank {
        id: "net".into(),
        name: "Networking".into(),
        bank_type: BankType::Theory,
        category_id: None,
        rubric: Some("Accept synonyms.".into()),
        questions: ["tcp", "udp", "dns"]
            .iter()
            .map(|id| Question {
                id: id.to_string(),
                subject: format!("Explain {id}"),
                expected_answer: format!("{id} explained"),
            })
            .collect(),
    }
}

fn service(oracle: Arc<MockOracle>, store: Arc<InMemoryStore>) -> PracticeService {
    let grader = Arc::new(Grader::new(
        oracle,
        GraderConfig {
            model: "mock-model".into(),
            max_attempts: 2,
            retry_delay: Duration::ZERO,
        },
    ));
    let orchestrator = Arc::new(GradingOrchestrator::new(grader, store.clone()));
    PracticeService::new(store, orchestrator)
}

fn explicit(ids: &[&str]) -> SessionConfig {
    SessionConfig {
        question_ids: ids.iter().map(|s| s.to_string()).collect(),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn retry_recovers_from_unparseable_reply() {
    let oracle = Arc::new(MockOracle::scripted(
        vec![Ok("I think it's fine.".into())],
        r#"{"covered": ["a", "b", "c"], "missed": ["d"]}"#,
    ));
    let store = Arc::new(InMemoryStore::new());
    store.put_bank(bank()).unwrap();
    let service = service(oracle.clone(), store.clone());

    let session = service.create_session("net", explicit(&["tcp"])).await.unwrap();
    let receipt = service
        .submit_answer(session.id, "tcp", "reliable stream")
        .await
        .unwrap();
    assert_eq!(receipt.status, "submitted");

    let results = service.complete_session(session.id).await.unwrap();
    assert_eq!(results.total_score, 75);
    assert_eq!(results.results[0].outcome, QuestionOutcome::Graded);
    assert_eq!(oracle.call_count(), 2);

    let prompt = oracle.last_request().unwrap().prompt;
    assert!(prompt.contains("reliable stream"));
    assert!(prompt.contains("Accept synonyms."));
    assert_eq!(service.question_mastery("net", "tcp").await.unwrap(), 75);
}

#[tokio::test]
async fn one_failing_question_leaves_others_intact() {
    // Two attempts for the first submission fail; the rest succeed.
    let oracle = Arc::new(MockOracle::scripted(
        vec![
            Err(OracleError::Timeout(180)),
            Err(OracleError::Timeout(180)),
        ],
        r#"{"covered": ["x"], "missed": []}"#,
    ));
    let store = Arc::new(InMemoryStore::new());
    store.put_bank(bank()).unwrap();
    let service = service(oracle.clone(), store.clone());

    let session = service
        .create_session("net", explicit(&["tcp", "udp", "dns"]))
        .await
        .unwrap();
    service.submit_answer(session.id, "tcp", "first").await.unwrap();
    // Let the first grade exhaust the scripted failures before the others start.
    while oracle.call_count() < 2 {
        tokio::task::yield_now().await;
    }
    service.submit_answer(session.id, "udp", "second").await.unwrap();

    let results = service.complete_session(session.id).await.unwrap();
    let by_id = |id: &str| {
        results
            .results
            .iter()
            .find(|r| r.question_id == id)
            .unwrap()
            .clone()
    };

    let tcp = by_id("tcp");
    assert_eq!(tcp.outcome, QuestionOutcome::Failed);
    assert_eq!(tcp.score, 0);
    assert!(tcp.missed[0].starts_with("Unable to evaluate"));

    assert_eq!(by_id("udp").outcome, QuestionOutcome::Graded);
    assert_eq!(by_id("udp").score, 100);
    assert_eq!(by_id("dns").outcome, QuestionOutcome::Unanswered);
    assert_eq!(results.total_score, 100);
    assert_eq!(results.max_score, 300);

    assert_eq!(service.question_mastery("net", "tcp").await.unwrap(), 0);
    assert_eq!(service.bank_mastery("net").await.unwrap(), 100.0 / 3.0);
}

#[tokio::test]
async fn always_failing_oracle_fails_every_answer() {
    let oracle = Arc::new(MockOracle::always_failing(500));
    let store = Arc::new(InMemoryStore::new());
    store.put_bank(bank()).unwrap();
    let service = service(oracle.clone(), store.clone());

    let session = service
        .create_session("net", explicit(&["tcp", "udp"]))
        .await
        .unwrap();
    service.submit_answer(session.id, "tcp", "a").await.unwrap();
    service.submit_answer(session.id, "udp", "b").await.unwrap();

    let results = service.complete_session(session.id).await.unwrap();
    assert_eq!(results.count(QuestionOutcome::Failed), 2);
    assert_eq!(results.total_score, 0);
    assert_eq!(oracle.call_count(), 4);
    assert!(store.stats_snapshot().unwrap().is_empty());
}

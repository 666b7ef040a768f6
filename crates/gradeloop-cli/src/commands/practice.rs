//! The `gradeloop practice` command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use gradeloop_core::bank_file;
use gradeloop_core::grader::Grader;
use gradeloop_core::orchestrator::GradingOrchestrator;
use gradeloop_core::report::{load_stats_file, save_stats_file, SessionReport};
use gradeloop_core::service::{PracticeService, QuestionOutcome, SessionResults};
use gradeloop_core::session::{PracticeSession, SessionConfig};
use gradeloop_core::store::InMemoryStore;
use gradeloop_providers::config::load_config_from;
use gradeloop_providers::create_oracle;

pub struct PracticeArgs {
    pub bank: PathBuf,
    pub answers: Option<PathBuf>,
    pub max_questions: Option<usize>,
    pub focus_weak: bool,
    pub questions: Option<String>,
    pub time_limit: Option<u32>,
    pub stats: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
}

#[derive(Deserialize)]
struct AnswersFile {
    #[serde(default)]
    answers: HashMap<String, String>,
}

fn load_answers(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers file: {}", path.display()))?;
    let parsed: AnswersFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse answers file: {}", path.display()))?;
    Ok(parsed.answers)
}

pub async fn execute(args: PracticeArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let file = bank_file::parse_bank_file(&args.bank)?;
    for w in bank_file::validate_bank(&file.bank) {
        tracing::warn!(bank = %file.bank.id, question = ?w.question_id, "{}", w.message);
    }
    let bank_id = file.bank.id.clone();
    let bank_name = file.bank.name.clone();

    let store = Arc::new(InMemoryStore::new());
    store.put_bank(file.bank)?;
    if let Some(category) = file.category {
        store.put_category(category)?;
    }
    if let Some(folder) = file.folder {
        store.put_folder(folder)?;
    }
    if let Some(stats_path) = &args.stats {
        store.load_stats(load_stats_file(stats_path)?)?;
    }

    let provider_config = config
        .providers
        .get(&config.default_provider)
        .with_context(|| {
            format!(
                "provider '{}' not found in config. Available: {:?}",
                config.default_provider,
                config.providers.keys().collect::<Vec<_>>()
            )
        })?;
    let oracle = create_oracle(&config.default_provider, provider_config, config.timeout_secs)?;
    let grader = Arc::new(Grader::new(
        oracle,
        config.grader_config(args.model.as_deref()),
    ));
    let orchestrator = Arc::new(
        GradingOrchestrator::new(grader, store.clone()).with_parallelism(config.parallelism),
    );
    let service = PracticeService::new(store.clone(), orchestrator);

    let question_ids = args
        .questions
        .as_deref()
        .map(|s| {
            s.split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let session = service
        .create_session(
            &bank_id,
            SessionConfig {
                max_questions: args.max_questions,
                time_limit_minutes: args.time_limit,
                focus_on_weak: args.focus_weak,
                question_ids,
            },
        )
        .await?;

    eprintln!(
        "gradeloop v{} — {}: {} question(s)",
        env!("CARGO_PKG_VERSION"),
        bank_name,
        session.questions.len()
    );
    if let Some(minutes) = session.time_limit_minutes {
        eprintln!("Time limit: {minutes} min");
    }
    eprintln!();

    let submitted = match &args.answers {
        Some(path) => submit_from_file(&service, &session, &load_answers(path)?).await?,
        None => submit_interactive(&service, &session).await?,
    };
    eprintln!("\nSubmitted {submitted} answer(s), waiting for grades...");

    let results = service.complete_session(session.id).await?;
    let bank_mastery = service.bank_mastery(&bank_id).await?;
    print_results(&results, bank_mastery);

    if let Some(stats_path) = &args.stats {
        save_stats_file(stats_path, &store.stats_snapshot()?)?;
        eprintln!("Stats saved to: {}", stats_path.display());
    }

    if let Some(output) = &args.output {
        let session = service.get_session(session.id).await?;
        let report = SessionReport::new(&session, &bank_name, results, bank_mastery);
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
        let path = output.join(format!("session-{timestamp}.json"));
        report.save_json(&path)?;
        let md_path = path.with_extension("md");
        std::fs::write(&md_path, report.to_markdown())
            .with_context(|| format!("failed to write report to {}", md_path.display()))?;
        eprintln!("Report saved to: {} (+ .md)", path.display());
    }

    Ok(())
}

async fn submit_from_file(
    service: &PracticeService,
    session: &PracticeSession,
    answers: &HashMap<String, String>,
) -> Result<usize> {
    let mut submitted = 0;
    for question in &session.questions {
        let Some(answer) = answers.get(&question.id).filter(|a| !a.trim().is_empty()) else {
            continue;
        };
        service
            .submit_answer(session.id, &question.id, answer)
            .await?;
        submitted += 1;
    }
    Ok(submitted)
}

/// One line per question from stdin; a blank line skips the question.
async fn submit_interactive(service: &PracticeService, session: &PracticeSession) -> Result<usize> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let total = session.questions.len();
    let mut submitted = 0;

    for (i, question) in session.questions.iter().enumerate() {
        eprintln!("[{}/{}] {}", i + 1, total, question.subject);
        eprint!("> ");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }
        service.submit_answer(session.id, &question.id, answer).await?;
        submitted += 1;
    }

    Ok(submitted)
}

fn print_results(results: &SessionResults, bank_mastery: f64) {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Score", "Status", "Covered", "Missed"]);

    for r in &results.results {
        let status = match r.outcome {
            QuestionOutcome::Graded => "graded",
            QuestionOutcome::Failed => "failed",
            QuestionOutcome::Unanswered => "unanswered",
        };
        table.add_row(vec![
            Cell::new(&r.question_id),
            Cell::new(r.score),
            Cell::new(status),
            Cell::new(r.covered.join("\n")),
            Cell::new(r.missed.join("\n")),
        ]);
    }

    println!("{table}");
    println!(
        "Total: {}/{} | graded {} | failed {} | unanswered {} | bank mastery {:.1}",
        results.total_score,
        results.max_score,
        results.count(QuestionOutcome::Graded),
        results.count(QuestionOutcome::Failed),
        results.count(QuestionOutcome::Unanswered),
        bank_mastery,
    );
}

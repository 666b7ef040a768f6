//! gradeloop CLI — practice question banks and track mastery.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gradeloop", version, about = "Practice question banks with an LLM grader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a practice session against one bank
    Practice {
        /// Path to a .toml bank file
        #[arg(long)]
        bank: PathBuf,

        /// TOML file with an `[answers]` table keyed by question id
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Max questions in the session (0 = all)
        #[arg(long)]
        max_questions: Option<usize>,

        /// Order questions by ascending mastery
        #[arg(long)]
        focus_weak: bool,

        /// Explicit question ids (comma-separated)
        #[arg(long)]
        questions: Option<String>,

        /// Time limit in minutes (recorded, not enforced)
        #[arg(long)]
        time_limit: Option<u32>,

        /// Stats snapshot JSON, read before and written after the session
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Directory for the session report
        #[arg(long)]
        output: Option<PathBuf>,

        /// Model override
        #[arg(long)]
        model: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show question, bank, category and folder mastery
    Mastery {
        /// Path to a .toml bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Stats snapshot JSON
        #[arg(long)]
        stats: PathBuf,
    },

    /// Render a saved session report as markdown
    Report {
        /// Report JSON written by `practice --output`
        #[arg(long)]
        input: PathBuf,
    },

    /// Validate bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and example bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gradeloop=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Practice {
            bank,
            answers,
            max_questions,
            focus_weak,
            questions,
            time_limit,
            stats,
            output,
            model,
            config,
        } => {
            commands::practice::execute(commands::practice::PracticeArgs {
                bank,
                answers,
                max_questions,
                focus_weak,
                questions,
                time_limit,
                stats,
                output,
                model,
                config,
            })
            .await
        }
        Commands::Mastery { bank, stats } => commands::mastery::execute(bank, stats),
        Commands::Report { input } => commands::report::execute(input),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

//! The `gradeloop init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradeloop.toml").exists() {
        println!("gradeloop.toml already exists, skipping.");
    } else {
        std::fs::write("gradeloop.toml", SAMPLE_CONFIG)?;
        println!("Created gradeloop.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit gradeloop.toml with your API key (or set GRADELOOP_API_KEY)");
    println!("  2. Run: gradeloop validate --bank banks/example.toml");
    println!("  3. Run: gradeloop practice --bank banks/example.toml --stats stats.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradeloop configuration

default_provider = "openai"
default_model = "gpt-4.1-mini"
timeout_secs = 180
max_attempts = 2
retry_delay_ms = 500
parallelism = 4

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "rust-ownership"
name = "Rust Ownership"
type = "theory"
category = "Rust"
folder = "Programming"

[[questions]]
id = "ownership-move"
subject = "What happens when a String is assigned to another variable?"
expected_answer = """
Ownership moves to the new variable. The original binding becomes invalid
and can no longer be used; the heap data is not copied.
"""

[[questions]]
id = "borrow-rules"
subject = "State the borrowing rules."
expected_answer = """
At any time you may have either one mutable reference or any number of
shared references, and references must always be valid.
"""

[[questions]]
id = "drop-order"
subject = "When is a value dropped?"
expected_answer = """
When its owner goes out of scope. Locals are dropped in reverse order of
declaration.
"""
"#;

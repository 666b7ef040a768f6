//! The `gradeloop validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeloop_core::bank_file;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let files = bank_file::load_banks(&bank_path)?;
    anyhow::ensure!(
        !files.is_empty(),
        "no bank files found under {}",
        bank_path.display()
    );

    let mut total_warnings = 0;

    for file in &files {
        let bank = &file.bank;
        println!(
            "Bank: {} [{}] ({} questions)",
            bank.name,
            bank.bank_type,
            bank.questions.len()
        );

        let warnings = bank_file::validate_bank(bank);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

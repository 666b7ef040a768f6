//! TOML bank file parser.
//!
//! Loads question banks from TOML files and directories, and validates them.
//! A bank file may name a category and folder; those are turned into ids by
//! slugging their names so banks sharing a category name end up together.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Bank, BankType, Category, Folder, Question};

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default = "default_bank_type", rename = "type")]
    bank_type: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    rubric: Option<String>,
}

fn default_bank_type() -> String {
    "theory".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    subject: String,
    expected_answer: String,
}

/// A bank together with the category and folder it declares.
#[derive(Debug, Clone)]
pub struct BankFile {
    pub bank: Bank,
    pub category: Option<Category>,
    pub folder: Option<Folder>,
}

/// Lowercase, with runs of non-alphanumerics collapsed to `-`.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Parse a single TOML file into a `BankFile`.
pub fn parse_bank_file(path: &Path) -> Result<BankFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `BankFile` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<BankFile> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    let header = parsed.bank;

    let bank_type: BankType = header
        .bank_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?;

    let folder = header
        .folder
        .filter(|f| !f.trim().is_empty())
        .map(|name| Folder {
            id: slug(&name),
            name,
        });

    let category = header
        .category
        .filter(|c| !c.trim().is_empty())
        .map(|name| Category {
            id: slug(&name),
            name,
            folder_id: folder.as_ref().map(|f| f.id.clone()),
        });

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            subject: q.subject.trim().to_string(),
            expected_answer: q.expected_answer.trim().to_string(),
        })
        .collect();

    Ok(BankFile {
        bank: Bank {
            id: header.id,
            name: header.name,
            bank_type,
            category_id: category.as_ref().map(|c| c.id.clone()),
            rubric: header.rubric,
            questions,
        },
        category,
        folder,
    })
}

/// Recursively load all `.toml` bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<BankFile>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank_file(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a single bank file, or every bank file under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<BankFile>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank_file(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

/// Validate a bank for common issues.
pub fn validate_bank(bank: &Bank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions; sessions cannot be built from it".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    for question in &bank.questions {
        if question.subject.is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "subject is empty".into(),
            });
        }
        if question.expected_answer.is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(question.id.clone()),
                message: "expected_answer is empty; every answer would be ungradable".into(),
            });
        }
    }

    if bank.rubric.as_deref().is_some_and(|r| r.trim().is_empty()) {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "rubric is blank and will be ignored".into(),
        });
    }

    warnings
}

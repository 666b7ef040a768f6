//! The `gradeloop mastery` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use gradeloop_core::bank_file::{self, BankFile};
use gradeloop_core::mastery::{self, QuestionKey, StatsMap};
use gradeloop_core::model::Bank;
use gradeloop_core::report::load_stats_file;

pub fn execute(bank_path: PathBuf, stats_path: PathBuf) -> Result<()> {
    let files = bank_file::load_banks(&bank_path)?;
    anyhow::ensure!(
        !files.is_empty(),
        "no bank files found under {}",
        bank_path.display()
    );

    let stats: StatsMap = load_stats_file(&stats_path)?
        .into_iter()
        .map(|s| (s.key(), s))
        .collect();

    print_questions(&files, &stats);
    print_banks(&files, &stats);
    print_hierarchy(&files, &stats);

    Ok(())
}

fn print_questions(files: &[BankFile], stats: &StatsMap) {
    let mut table = Table::new();
    table.set_header(vec!["Bank", "Question", "Answered", "Correct", "Latest", "Mastery"]);

    for file in files {
        for q in &file.bank.questions {
            let row = match stats.get(&QuestionKey::new(&file.bank.id, &q.id)) {
                Some(s) => vec![
                    Cell::new(&file.bank.id),
                    Cell::new(&q.id),
                    Cell::new(s.times_answered),
                    Cell::new(s.times_correct),
                    Cell::new(s.latest_score),
                    Cell::new(s.mastery),
                ],
                None => vec![
                    Cell::new(&file.bank.id),
                    Cell::new(&q.id),
                    Cell::new(0),
                    Cell::new(0),
                    Cell::new("-"),
                    Cell::new(0),
                ],
            };
            table.add_row(row);
        }
    }

    println!("{table}");
}

fn print_banks(files: &[BankFile], stats: &StatsMap) {
    let mut table = Table::new();
    table.set_header(vec!["Bank", "Type", "Questions", "Mastery"]);

    for file in files {
        let bank = &file.bank;
        table.add_row(vec![
            Cell::new(&bank.name),
            Cell::new(bank.bank_type),
            Cell::new(bank.questions.len()),
            Cell::new(format!("{:.1}", mastery::bank_mastery(bank, stats))),
        ]);
    }

    println!("\n{table}");
}

/// Category and folder rollups, each flattening every question underneath.
fn print_hierarchy(files: &[BankFile], stats: &StatsMap) {
    let mut categories: BTreeMap<String, (String, Vec<Bank>)> = BTreeMap::new();
    let mut folders: BTreeMap<String, (String, BTreeMap<String, Vec<Bank>>)> = BTreeMap::new();

    for file in files {
        let Some(category) = &file.category else {
            continue;
        };
        categories
            .entry(category.id.clone())
            .or_insert_with(|| (category.name.clone(), Vec::new()))
            .1
            .push(file.bank.clone());

        if let Some(folder) = &file.folder {
            folders
                .entry(folder.id.clone())
                .or_insert_with(|| (folder.name.clone(), BTreeMap::new()))
                .1
                .entry(category.id.clone())
                .or_default()
                .push(file.bank.clone());
        }
    }

    if categories.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Level", "Name", "Banks", "Mastery"]);

    for (name, banks) in categories.values() {
        table.add_row(vec![
            Cell::new("category"),
            Cell::new(name),
            Cell::new(banks.len()),
            Cell::new(format!("{:.1}", mastery::category_mastery(banks, stats))),
        ]);
    }

    for (name, per_category) in folders.values() {
        let grouped: Vec<Vec<Bank>> = per_category.values().cloned().collect();
        let bank_count: usize = grouped.iter().map(Vec::len).sum();
        table.add_row(vec![
            Cell::new("folder"),
            Cell::new(name),
            Cell::new(bank_count),
            Cell::new(format!("{:.1}", mastery::folder_mastery(&grouped, stats))),
        ]);
    }

    println!("\n{table}");
}

//! Grading prompt construction, one strategy per bank type.

use crate::model::{BankType, GradeRequest};

const THEORY_CRITERIA: &str = "Break the expected answer into its key facts and concepts. \
A point counts as covered when the user's answer states it correctly, even in different words. \
A point is missed when it is absent or stated incorrectly.";

const CODE_CRITERIA: &str = "Break the expected solution into its essential elements: \
algorithm, data structures, edge cases and API usage. \
Accept code that is functionally equivalent even if naming, formatting or style differ. \
Syntax slips that do not change behaviour do not make a point missed.";

const CLI_CRITERIA: &str = "Break the expected command into its essential parts: \
the program, subcommands, flags and arguments. \
Accept equivalent spellings (short vs long flags, reordered options) and alternative commands \
that produce the same effect. A point is missed when the command would not achieve it.";

const OUTPUT_CONTRACT: &str = r#"Respond with a single JSON object and nothing else, in exactly this shape:
{"score": <0-100>, "covered": ["<point the answer covers>", ...], "missed": ["<point the answer misses>", ...]}
Every key point of the expected answer must appear in exactly one of the two lists."#;

/// Default grading criteria for a bank type.
pub fn default_criteria(bank_type: BankType) -> &'static str {
    match bank_type {
        BankType::Theory => THEORY_CRITERIA,
        BankType::Code => CODE_CRITERIA,
        BankType::Cli => CLI_CRITERIA,
    }
}

fn role_line(bank_type: BankType) -> &'static str {
    match bank_type {
        BankType::Theory => "You are a strict but fair examiner grading a written answer.",
        BankType::Code => "You are a senior engineer reviewing a candidate's code answer.",
        BankType::Cli => "You are a systems administrator checking a shell command answer.",
    }
}

/// Build the full prompt for a grade request.
///
/// A non-blank custom rubric replaces the bank type's default criteria; the
/// role line and output contract are always kept.
pub fn build_prompt(request: &GradeRequest) -> String {
    let criteria = request
        .rubric
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| default_criteria(request.bank_type));

    let answer_label = match request.bank_type {
        BankType::Theory => "User's answer",
        BankType::Code => "User's code",
        BankType::Cli => "User's command",
    };

    format!(
        "{role}\n\n\
         Grading criteria:\n{criteria}\n\n\
         Question:\n{question}\n\n\
         Expected answer:\n{expected}\n\n\
         {answer_label}:\n{answer}\n\n\
         {contract}",
        role = role_line(request.bank_type),
        question = request.question,
        expected = request.expected_answer,
        answer = request.user_answer,
        contract = OUTPUT_CONTRACT,
    )
}

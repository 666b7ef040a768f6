//! The `gradeloop report` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeloop_core::report::SessionReport;

pub fn execute(input: PathBuf) -> Result<()> {
    let report = SessionReport::load_json(&input)?;
    print!("{}", report.to_markdown());
    Ok(())
}

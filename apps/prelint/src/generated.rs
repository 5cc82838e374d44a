//! Generated-artifact checker: regenerate, then fail on tracked drift.

use crate::config::Effective;
use crate::drift;
use crate::error::{CheckError, Result};
use crate::models::DiffReport;
use crate::process::Stdout;

pub const CHECK: &str = "check-generated";
pub const REMEDY: &str = "run the generator and commit the result";

/// Run `[generate].command` and diff the tracked set under `[generate].paths`.
pub fn run_check(eff: &Effective) -> Result<DiffReport> {
    let command = eff.generate_command.as_ref().ok_or_else(|| {
        CheckError::Usage(
            "no generator configured; set [generate].command in prelint.toml".to_string(),
        )
    })?;
    drift::run_and_compare(
        CHECK,
        command,
        &eff.repo_root,
        &eff.generate_paths,
        eff.timeout,
        Stdout::for_output(&eff.output),
    )
}

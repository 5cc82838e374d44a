//! Dependency tidiness checker: run the tidy step, then fail if any
//! tracked manifest changed.

use crate::config::Effective;
use crate::drift;
use crate::error::Result;
use crate::models::DiffReport;
use crate::process::Stdout;

pub const CHECK: &str = "check-deps";
pub const REMEDY: &str = "run the tidy step and commit the updated manifests";

/// `cargo metadata` prints the whole dependency graph; keep it off stdout.
fn stdout_for(command: &[String], output: &str) -> Stdout {
    match command {
        [program, sub, ..] if program == "cargo" && sub == "metadata" => Stdout::Discard,
        _ => Stdout::for_output(output),
    }
}

pub fn run_check(eff: &Effective) -> Result<DiffReport> {
    drift::run_and_compare(
        CHECK,
        &eff.deps_command,
        &eff.repo_root,
        &eff.deps_manifests,
        eff.timeout,
        stdout_for(&eff.deps_command, &eff.output),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_output_is_discarded() {
        let argv = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            stdout_for(&argv(&["cargo", "metadata", "--format-version", "1"]), "json"),
            Stdout::Discard
        );
        assert_eq!(
            stdout_for(&argv(&["go", "mod", "tidy"]), "human"),
            Stdout::Inherit
        );
        assert_eq!(stdout_for(&argv(&["go", "mod", "tidy"]), "json"), Stdout::Stderr);
        assert_eq!(stdout_for(&argv(&["cargo"]), "human"), Stdout::Inherit);
    }
}

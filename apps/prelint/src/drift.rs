//! Drift detection over the tracked file set.
//!
//! The tracked set is whatever `git ls-files` reports for the configured
//! pathspecs. Each file is fingerprinted with SHA-256 before and after a
//! regeneration step; any path whose fingerprint differs, appears, or
//! disappears is reported as changed.

use crate::error::{CheckError, Result};
use crate::models::DiffReport;
use crate::process::{self, Stdout};
use crate::utils;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Fingerprints keyed by repository-relative path. `None` marks a tracked
/// path that is absent from the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<String, Option<String>>);


/// List tracked files matching `pathspecs` (all tracked files when empty).
pub fn tracked_files(
    repo_root: &Path,
    pathspecs: &[String],
    timeout: Option<Duration>,
) -> Result<Vec<String>> {
    let mut argv: Vec<String> = ["git", "ls-files", "-z", "--"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    argv.extend(pathspecs.iter().cloned());
    let out = process::run_captured(&argv, repo_root, timeout)?;
    Ok(out
        .split(|b| *b == 0)
        .filter(|p| !p.is_empty())
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect())
}

fn fingerprint(path: &Path) -> Result<Option<String>> {
    if path.is_dir() {
        // Submodule gitlinks show up as directories.
        return Ok(Some("dir".to_string()));
    }
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CheckError::io(format!("opening {}", path.display()), e)),
    };
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| CheckError::io(format!("reading {}", path.display()), e))?;
    Ok(Some(hex::encode(hasher.finalize())))
}

/// Fingerprint each of `paths` under `repo_root`.
pub fn snapshot<'a, I>(repo_root: &Path, paths: I) -> Result<Snapshot>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut map = BTreeMap::new();
    for rel in paths {
        map.insert(rel.clone(), fingerprint(&repo_root.join(rel))?);
    }
    Ok(Snapshot(map))
}

/// Compare two snapshots; paths present in only one side count as changed.
pub fn compare(before: &Snapshot, after: &Snapshot) -> DiffReport {
    let keys: BTreeSet<&String> = before.0.keys().chain(after.0.keys()).collect();
    let changed = keys
        .into_iter()
        .filter(|k| before.0.get(*k).cloned().flatten() != after.0.get(*k).cloned().flatten())
        .cloned()
        .collect();
    DiffReport::from_changed(changed)
}

/// Snapshot the tracked set, run `argv`, snapshot again, and report drift.
pub fn run_and_compare(
    check: &str,
    argv: &[String],
    repo_root: &Path,
    pathspecs: &[String],
    timeout: Option<Duration>,
    stdout: Stdout,
) -> Result<DiffReport> {
    let program = argv
        .first()
        .ok_or_else(|| CheckError::Usage(format!("{check}: empty command")))?;
    if utils::resolve_program(program, repo_root).is_none() {
        return Err(CheckError::ToolNotFound {
            tool: program.clone(),
            searched: "PATH".to_string(),
        });
    }
    let before_paths = tracked_files(repo_root, pathspecs, timeout)?;
    let before = snapshot(repo_root, &before_paths)?;
    debug!(check, tracked = before.0.len(), "snapshot taken");

    process::run_checked(argv, repo_root, timeout, stdout)?;

    let mut after_paths: BTreeSet<String> =
        tracked_files(repo_root, pathspecs, timeout)?.into_iter().collect();
    after_paths.extend(before_paths);
    let after = snapshot(repo_root, &after_paths)?;

    let report = compare(&before, &after);
    info!(check, clean = report.clean, changed = report.changed.len(), "drift check finished");
    Ok(report)
}

/// Turn a dirty report into `CheckError::Drift`.
pub fn enforce(check: &'static str, remedy: &'static str, report: &DiffReport) -> Result<()> {
    if report.clean {
        Ok(())
    } else {
        Err(CheckError::Drift {
            check,
            changed: report.changed.clone(),
            remedy,
        })
    }
}

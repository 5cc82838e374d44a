//! Per-run data models shared by checks and printers.
//!
//! Everything here is created during a single run and dropped at exit.

use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A declared cache resolved to an absolute root.
pub struct CacheLocation {
    pub tool: String,
    pub root: PathBuf,
    pub marker: String,
}

impl CacheLocation {
    pub fn marker_path(&self) -> PathBuf {
        self.root.join(&self.marker)
    }
}

#[derive(Debug, Clone, Serialize)]
/// Outcome of probing one cache.
pub struct ProbeResult {
    pub tool: String,
    pub root: Option<PathBuf>,
    pub marker_path: Option<PathBuf>,
    pub found: bool,
    pub preview: Option<String>,
    /// Resolution diagnostic when the root could not be determined.
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Where the linter binary was found.
pub enum LintSource {
    Cache,
    Path,
}

#[derive(Debug, Clone, Serialize)]
pub struct LintInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub source: LintSource,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Tracked-file state before vs. after a regeneration step.
pub struct DiffReport {
    pub clean: bool,
    pub changed: Vec<String>,
}

impl DiffReport {
    pub fn from_changed(mut changed: Vec<String>) -> Self {
        changed.sort();
        changed.dedup();
        Self {
            clean: changed.is_empty(),
            changed,
        }
    }
}

//! Error taxonomy shared by all checks.
//!
//! Every failure surfaces through `CheckError` and maps to a process exit
//! code: `1` for check failures, `2` for usage and configuration errors.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Debug, Error)]
pub enum CheckError {
    /// A required executable (linter, generator, git) could not be located.
    #[error("tool not found: {tool} (searched: {searched})")]
    ToolNotFound { tool: String, searched: String },

    /// A driven tool exited non-zero, was killed, or timed out.
    #[error("{program} failed: {reason}")]
    Subprocess { program: String, reason: String },

    /// Tracked files differ from the committed state after regeneration.
    #[error("{check}: {} tracked file(s) changed:\n{}\n{remedy}", .changed.len(), list_paths(.changed))]
    Drift {
        check: &'static str,
        changed: Vec<String>,
        remedy: &'static str,
    },

    #[error("missing cache markers: {}", .missing.join(", "))]
    MissingMarkers { missing: Vec<String> },

    #[error("{0}")]
    Usage(String),

    #[error("invalid config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Config { .. } => 2,
            _ => 1,
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn list_paths(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| format!("  {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

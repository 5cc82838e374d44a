//! Prelint core library.
//!
//! This crate exposes the pre-build checks a CI pipeline runs before the
//! main build: a read-only cache probe, the pinned linter, and drift checks
//! for generated files and dependency manifests.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `probe`: Read-only cache marker probe.
//! - `lint`: Linter resolution (cache, then PATH) and execution.
//! - `generated` / `deps`: Regenerate-and-diff checks built on `drift`.
//! - `process`: Subprocess execution with deadlines.
//! - `models`: Per-run data models.
//! - `output`: Human/JSON printers.
//! - `error`: Error taxonomy and exit codes.
pub mod cli;
pub mod config;
pub mod deps;
pub mod drift;
pub mod error;
pub mod generated;
pub mod lint;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod process;
pub mod runner;
pub mod utils;

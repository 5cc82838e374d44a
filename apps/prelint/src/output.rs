//! Output rendering for probe, lint, and drift checks.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-item fields and a top-level summary.

use crate::models::{DiffReport, LintInvocation, ProbeResult};
use crate::runner::RunnerIdentity;
use crate::utils::rel_to_root;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::path::Path;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn print_json(value: &JsonVal) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
    }
}

/// Print probe results in the requested format.
pub fn print_probe(results: &[ProbeResult], runner: &RunnerIdentity, output: &str) {
    if output == "json" {
        print_json(&compose_probe_json(results, runner));
        return;
    }
    let color = use_colors(output);
    for r in results {
        let where_ = r
            .marker_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        let (icon, label) = if r.found {
            ("✔", "found")
        } else {
            ("✖", "missing")
        };
        if color {
            let icon = if r.found {
                icon.green().to_string()
            } else {
                icon.yellow().to_string()
            };
            println!("{} {} ❲{}❳ {}", icon, label.bold(), r.tool, where_);
        } else {
            println!("{} {} ❲{}❳ {}", icon, label, r.tool, where_);
        }
        if let Some(note) = &r.note {
            println!("    {note}");
        }
        if let Some(preview) = &r.preview {
            for line in preview.lines() {
                println!("    │ {line}");
            }
        }
    }
    let found = results.iter().filter(|r| r.found).count();
    let summary = format!(
        "— Summary — found={} missing={} total={}",
        found,
        results.len() - found,
        results.len()
    );
    if color {
        println!("{}", summary.bold());
    } else {
        println!("{summary}");
    }
}

/// Print the lint invocation after the linter has run.
pub fn print_lint(inv: &LintInvocation, repo_root: &Path, output: &str) {
    if output == "json" {
        print_json(&compose_lint_json(inv, repo_root));
        return;
    }
    let program = rel_to_root(&inv.program, repo_root);
    let ok = inv.exit_code == Some(0);
    let status = match inv.exit_code {
        Some(c) => format!("exit {c}"),
        None => "killed".to_string(),
    };
    let line = format!("lint ({}) {} — {}", source_label(inv), program, status);
    if use_colors(output) {
        if ok {
            println!("{} {}", "✔".green(), line.bold());
        } else {
            println!("{} {}", "✖".red(), line.bold());
        }
    } else {
        println!("{} {}", if ok { "✔" } else { "✖" }, line);
    }
}

fn source_label(inv: &LintInvocation) -> &'static str {
    match inv.source {
        crate::models::LintSource::Cache => "cache",
        crate::models::LintSource::Path => "PATH",
    }
}

/// Print a drift report. Failures are reported again by the caller as an
/// error, so the human form only lists paths.
pub fn print_drift(check: &str, report: &DiffReport, output: &str) {
    if output == "json" {
        print_json(&compose_drift_json(check, report));
        return;
    }
    let color = use_colors(output);
    if report.clean {
        if color {
            println!("{} {}", "✔".green(), format!("{check}: clean").bold());
        } else {
            println!("✔ {check}: clean");
        }
        return;
    }
    for path in &report.changed {
        if color {
            println!("{} {} {}", "✖".red(), "changed:".red().bold(), path.bold());
        } else {
            println!("✖ changed: {path}");
        }
    }
}

/// Compose probe JSON object (pure) for testing/snapshot purposes.
pub fn compose_probe_json(results: &[ProbeResult], runner: &RunnerIdentity) -> JsonVal {
    let found = results.iter().filter(|r| r.found).count();
    json!({
        "results": results,
        "runner": runner,
        "summary": {
            "found": found,
            "missing": results.len() - found,
            "total": results.len(),
        }
    })
}

pub fn compose_lint_json(inv: &LintInvocation, repo_root: &Path) -> JsonVal {
    json!({
        "program": rel_to_root(&inv.program, repo_root),
        "args": inv.args,
        "source": inv.source,
        "exit_code": inv.exit_code,
        "ok": inv.exit_code == Some(0),
    })
}

pub fn compose_drift_json(check: &str, report: &DiffReport) -> JsonVal {
    json!({
        "check": check,
        "clean": report.clean,
        "changed": report.changed,
    })
}

//! Lint runner.
//!
//! Locates the pinned linter binary, preferring a copy in the local tool
//! cache built for the current OS/arch over anything on PATH, then runs it
//! with the argument list pinned in the committed config.

use crate::error::{CheckError, Result};
use crate::models::{LintInvocation, LintSource};
use crate::process::{self, Stdout};
use crate::utils;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

/// Names a release archive may use for the current OS.
pub fn os_tokens() -> &'static [&'static str] {
    match std::env::consts::OS {
        "macos" => &["darwin", "macos", "osx"],
        "windows" => &["windows", "win"],
        "linux" => &["linux"],
        "freebsd" => &["freebsd"],
        _ => std::slice::from_ref(&std::env::consts::OS),
    }
}

/// Names a release archive may use for the current architecture.
pub fn arch_tokens() -> &'static [&'static str] {
    match std::env::consts::ARCH {
        "x86_64" => &["amd64", "x86_64", "x64"],
        "aarch64" => &["arm64", "aarch64"],
        "x86" => &["386", "x86", "i686"],
        "arm" => &["armv6", "armv7", "arm"],
        _ => std::slice::from_ref(&std::env::consts::ARCH),
    }
}

/// Tokens that contain the `_` separator and must survive splitting.
const COMPOUND_TOKENS: &[&str] = &["x86_64"];

fn name_tokens(name: &str) -> Vec<String> {
    let parts: Vec<&str> = name
        .split(|c: char| matches!(c, '-' | '.' | '_' | ' '))
        .filter(|t| !t.is_empty())
        .collect();
    let mut tokens = Vec::with_capacity(parts.len());
    let mut i = 0;
    while i < parts.len() {
        if let Some(next) = parts.get(i + 1) {
            let joined = format!("{}_{}", parts[i], next).to_ascii_lowercase();
            if COMPOUND_TOKENS.contains(&joined.as_str()) {
                tokens.push(joined);
                i += 2;
                continue;
            }
        }
        tokens.push(parts[i].to_ascii_lowercase());
        i += 1;
    }
    tokens
}

fn matches_platform(name: &str) -> bool {
    let tokens = name_tokens(name);
    let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));
    has(os_tokens()) && has(arch_tokens())
}

/// The first dotted version segment (`1.2.3`, `v0.9`) bounded by a
/// separator. Architecture suffixes such as `amd64` never count.
fn version_of(name: &str) -> Vec<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:^|[-_ ])v?(\d+(?:\.\d+)+)(?:$|[-_ .])")
            .expect("version pattern is valid")
    });
    re.captures(name)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .split('.')
                .filter_map(|p| p.parse::<u64>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Scan `cache_dir` for a `binary` built for this platform.
///
/// Entries are matched by glob `<binary>*`; an entry is either the binary
/// itself or a directory holding a file named `binary`. The highest
/// embedded version wins.
pub fn find_cached(binary: &str, cache_dir: &Path) -> Option<PathBuf> {
    let pattern = format!(
        "{}/{}*",
        glob::Pattern::escape(&cache_dir.to_string_lossy()),
        glob::Pattern::escape(binary)
    );
    let entries = glob::glob(&pattern).ok()?;
    let mut candidates: Vec<(Vec<u64>, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name()?.to_string_lossy().to_string();
            if !matches_platform(&name) {
                return None;
            }
            let exe = if entry.is_dir() {
                let inner = if cfg!(windows) {
                    format!("{binary}.exe")
                } else {
                    binary.to_string()
                };
                entry.join(inner)
            } else {
                entry.clone()
            };
            if !utils::is_executable(&exe) {
                debug!(candidate = %exe.display(), "skipping non-executable cache entry");
                return None;
            }
            Some((version_of(&name), exe))
        })
        .collect();
    candidates.sort();
    candidates.pop().map(|(_, p)| p)
}

/// Resolve the linter: local cache first, then PATH.
pub fn resolve_linter(binary: &str, cache_dir: &Path) -> Result<(PathBuf, LintSource)> {
    if let Some(p) = find_cached(binary, cache_dir) {
        info!(binary, path = %p.display(), "using cached linter");
        return Ok((p, LintSource::Cache));
    }
    if let Some(p) = utils::find_executable_in_path(binary) {
        info!(binary, path = %p.display(), "using linter from PATH");
        return Ok((p, LintSource::Path));
    }
    Err(CheckError::ToolNotFound {
        tool: binary.to_string(),
        searched: format!(
            "{} (for {}/{}), PATH",
            cache_dir.display(),
            std::env::consts::OS,
            std::env::consts::ARCH
        ),
    })
}

/// Resolve and run the linter in `repo_root`, streaming its output.
///
/// A non-zero exit is not an error here; it is recorded on the returned
/// invocation and turned into a failure by [`outcome`].
pub fn run_lint(
    repo_root: &Path,
    binary: &str,
    cache_dir: &Path,
    args: &[String],
    timeout: Option<Duration>,
    stdout: Stdout,
) -> Result<LintInvocation> {
    let (program, source) = resolve_linter(binary, cache_dir)?;
    let mut argv = vec![program.to_string_lossy().to_string()];
    argv.extend(args.iter().cloned());
    let status = process::run_streaming(&argv, repo_root, timeout, stdout)?;
    info!(binary, status = %process::describe_status(&status), "linter finished");
    Ok(LintInvocation {
        program,
        args: args.to_vec(),
        source,
        exit_code: status.code(),
    })
}

pub fn outcome(inv: &LintInvocation) -> Result<()> {
    match inv.exit_code {
        Some(0) => Ok(()),
        Some(code) => Err(CheckError::Subprocess {
            program: inv.program.to_string_lossy().to_string(),
            reason: format!("exit status {code}"),
        }),
        None => Err(CheckError::Subprocess {
            program: inv.program.to_string_lossy().to_string(),
            reason: "terminated by signal".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn platform_suffix() -> String {
        format!("{}-{}", os_tokens()[0], arch_tokens()[0])
    }

    #[cfg(unix)]
    fn make_exec(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_version_ordering_is_numeric() {
        assert_eq!(version_of("golangci-lint-1.10.0-linux-amd64"), vec![1, 10, 0]);
        assert!(version_of("tool-1.10.0-x") > version_of("tool-1.9.3-x"));
        assert!(version_of("tool-linux").is_empty());
    }

    #[test]
    fn test_version_ignores_non_version_digits() {
        assert!(version_of("revive-linux-amd64").is_empty());
        assert_eq!(version_of("revive-v1.3.7-linux-amd64"), vec![1, 3, 7]);
        assert_eq!(version_of("fl_1.2.0_linux_amd64"), vec![1, 2, 0]);
        assert_eq!(version_of("lint-2.0"), vec![2, 0]);
        assert_eq!(version_of("lint-2.0.1.exe"), vec![2, 0, 1]);
    }

    #[test]
    fn test_underscore_names_keep_compound_arch() {
        assert_eq!(
            name_tokens("fl_1.2.0_Linux_x86_64"),
            vec!["fl", "1", "2", "0", "linux", "x86_64"]
        );
        assert!(!name_tokens("tool_x86_64").contains(&"x86".to_string()));
        let goreleaser = format!("fl_1.2.0_{}_{}", os_tokens()[0], arch_tokens()[0]);
        assert!(matches_platform(&goreleaser));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_cached_accepts_underscore_layout() {
        let tmp = tempdir().unwrap();
        let entry = tmp
            .path()
            .join(format!("fl_1.2.0_{}_{}", os_tokens()[0], arch_tokens()[0]));
        make_exec(&entry, "exit 0");
        assert_eq!(find_cached("fl", tmp.path()), Some(entry));
    }

    #[test]
    fn test_platform_tokens_are_exact() {
        let ok = format!("lint-1.0-{}", platform_suffix());
        assert!(matches_platform(&ok));
        assert!(!matches_platform("lint-1.0-plan9-mips"));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_cached_prefers_highest_version() {
        let tmp = tempdir().unwrap();
        let cache = tmp.path();
        let suffix = platform_suffix();
        make_exec(&cache.join(format!("golangci-lint-1.9.0-{suffix}/golangci-lint")), "exit 0");
        make_exec(&cache.join(format!("golangci-lint-1.10.2-{suffix}/golangci-lint")), "exit 0");
        make_exec(&cache.join("golangci-lint-9.9.9-plan9-mips/golangci-lint"), "exit 0");
        let found = find_cached("golangci-lint", cache).unwrap();
        assert!(found
            .to_string_lossy()
            .contains(&format!("golangci-lint-1.10.2-{suffix}")));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_cached_requires_executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempdir().unwrap();
        let entry = tmp.path().join(format!("revive-{}", platform_suffix()));
        fs::write(&entry, "not a program").unwrap();
        fs::set_permissions(&entry, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(find_cached("revive", tmp.path()).is_none());
        fs::set_permissions(&entry, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_cached("revive", tmp.path()), Some(entry));
    }

    #[test]
    fn test_missing_linter_names_the_tool() {
        let tmp = tempdir().unwrap();
        let err = resolve_linter("prelint-no-such-linter", tmp.path()).unwrap_err();
        match &err {
            CheckError::ToolNotFound { tool, searched } => {
                assert_eq!(tool, "prelint-no-such-linter");
                assert!(searched.contains("PATH"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_lint_propagates_exit_code() {
        let tmp = tempdir().unwrap();
        let cache = tmp.path().join("cache");
        make_exec(
            &cache.join(format!("fakelint-{}", platform_suffix())),
            "test \"$1\" = run || exit 9\nexit 4",
        );
        let inv = run_lint(
            tmp.path(),
            "fakelint",
            &cache,
            &["run".to_string()],
            None,
            Stdout::Discard,
        )
        .unwrap();
        assert_eq!(inv.source, LintSource::Cache);
        assert_eq!(inv.exit_code, Some(4));
        assert!(matches!(outcome(&inv), Err(CheckError::Subprocess { .. })));
    }
}

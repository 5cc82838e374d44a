//! Configuration discovery and effective settings resolution.
//!
//! Prelint reads `prelint.toml|yaml|yml` from the repository root (or the
//! closest ancestor) and merges it with CLI flags and a small set of
//! environment overrides to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `timeout_secs`: 600 (`0` disables the deadline)
//! - `probe.preview_bytes`: 256, `probe.caches`: tool-cache, cargo, pip
//! - `lint.binary`: `golangci-lint`, `lint.cache_dir`: `build/cache`
//! - `deps.command`: `cargo metadata --format-version 1`
//! - `deps.manifests`: `Cargo.toml`, `Cargo.lock`
//!
//! Overrides precedence: CLI > environment > config file > defaults.

use crate::error::{CheckError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILES: [&str; 3] = ["prelint.toml", "prelint.yaml", "prelint.yml"];
pub const TOOL_CACHE_ENV: &str = "PRELINT_TOOL_CACHE";

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_PREVIEW_BYTES: usize = 256;
const DEFAULT_LINT_BINARY: &str = "golangci-lint";
const DEFAULT_LINT_CACHE: &str = "build/cache";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `prelint.toml|yaml`.
pub struct PrelintConfig {
    pub output: Option<String>,
    pub log_level: Option<String>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub probe: Option<ProbeCfg>,
    #[serde(default)]
    pub lint: Option<LintCfg>,
    #[serde(default)]
    pub generate: Option<GenerateCfg>,
    #[serde(default)]
    pub deps: Option<DepsCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[probe]` section.
pub struct ProbeCfg {
    pub preview_bytes: Option<usize>,
    #[serde(default)]
    pub caches: Vec<CacheDecl>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
/// One declared cache under `[[probe.caches]]`.
pub struct CacheDecl {
    pub tool: String,
    /// Environment variable that overrides the root when set and non-empty.
    #[serde(default)]
    pub env: Option<String>,
    /// Root template; `~` and `$VAR` are expanded.
    #[serde(default)]
    pub path: Option<String>,
    pub marker: String,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// `[lint]` section. Arguments are pinned here and nowhere else.
pub struct LintCfg {
    pub binary: Option<String>,
    pub cache_dir: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct GenerateCfg {
    pub command: Option<Vec<String>>,
    pub paths: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct DepsCfg {
    pub command: Option<Vec<String>>,
    pub manifests: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_file: Option<PathBuf>,
    pub output: String,
    pub log_level: Option<String>,
    pub timeout: Option<Duration>,
    pub preview_bytes: usize,
    pub caches: Vec<CacheDecl>,
    pub lint_binary: String,
    pub lint_cache_dir: PathBuf,
    pub lint_args: Vec<String>,
    pub generate_command: Option<Vec<String>>,
    pub generate_paths: Vec<String>,
    pub deps_command: Vec<String>,
    pub deps_manifests: Vec<String>,
}

/// Caches probed when the config declares none.
pub fn default_caches() -> Vec<CacheDecl> {
    vec![
        CacheDecl {
            tool: "tool-cache".into(),
            env: Some("RUNNER_TOOL_CACHE".into()),
            path: Some("~/hostedtoolcache".into()),
            marker: ".complete".into(),
        },
        CacheDecl {
            tool: "cargo".into(),
            env: Some("CARGO_HOME".into()),
            path: Some("~/.cargo".into()),
            marker: ".package-cache".into(),
        },
        // No template: the platform cache dir applies.
        CacheDecl {
            tool: "pip".into(),
            env: Some("PIP_CACHE_DIR".into()),
            path: None,
            marker: "selfcheck.json".into(),
        },
    ]
}

fn default_lint_args() -> Vec<String> {
    ["run", "--config", ".golangci.yml"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_deps_command() -> Vec<String> {
    ["cargo", "metadata", "--format-version", "1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `prelint.toml|yaml|yml` or a `.git` entry is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let start = fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let mut cur = start.as_path();
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).is_file()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start,
        }
    }
}

/// Load `PrelintConfig` from the first config file present under `root`.
///
/// A missing file is not an error; an unreadable or malformed one is.
pub fn load_config(root: &Path) -> Result<Option<(PathBuf, PrelintConfig)>> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|e| CheckError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<PrelintConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<PrelintConfig>(&s).map_err(|e| e.to_string())
        };
        return match parsed {
            Ok(cfg) => Ok(Some((path, cfg))),
            Err(message) => Err(CheckError::Config { path, message }),
        };
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, process environment, the
/// discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_timeout_secs: Option<u64>,
) -> Result<Effective> {
    resolve_effective_with(cli_repo_root, cli_output, cli_timeout_secs, |k| {
        std::env::var(k).ok()
    })
}

/// Same as [`resolve_effective`] with an explicit environment lookup.
pub fn resolve_effective_with<F>(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_timeout_secs: Option<u64>,
    env: F,
) -> Result<Effective>
where
    F: Fn(&str) -> Option<String>,
{
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let (config_file, cfg) = match load_config(&repo_root)? {
        Some((p, c)) => (Some(p), c),
        None => (None, PrelintConfig::default()),
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    if output != "human" && output != "json" {
        return Err(CheckError::Usage(format!(
            "unsupported output mode '{output}' (expected human|json)"
        )));
    }

    let timeout_secs = cli_timeout_secs
        .or(cfg.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    let probe = cfg.probe.unwrap_or_default();
    let preview_bytes = probe.preview_bytes.unwrap_or(DEFAULT_PREVIEW_BYTES);
    let caches = if probe.caches.is_empty() {
        default_caches()
    } else {
        probe.caches
    };

    let lint = cfg.lint.unwrap_or_default();
    let lint_binary = lint
        .binary
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LINT_BINARY.to_string());
    let lint_cache_dir = env(TOOL_CACHE_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| lint.cache_dir.map(PathBuf::from))
        .map(|p| repo_root.join(p))
        .unwrap_or_else(|| repo_root.join(DEFAULT_LINT_CACHE));
    let lint_args = lint.args.unwrap_or_else(default_lint_args);

    let generate = cfg.generate.unwrap_or_default();
    let generate_command = generate.command.filter(|c| !c.is_empty());
    let generate_paths = generate.paths.unwrap_or_default();

    let deps = cfg.deps.unwrap_or_default();
    let deps_command = deps
        .command
        .filter(|c| !c.is_empty())
        .unwrap_or_else(default_deps_command);
    let deps_manifests = deps
        .manifests
        .unwrap_or_else(|| vec!["Cargo.toml".to_string(), "Cargo.lock".to_string()]);

    Ok(Effective {
        repo_root,
        config_file,
        output,
        log_level: cfg.log_level,
        timeout,
        preview_bytes,
        caches,
        lint_binary,
        lint_cache_dir,
        lint_args,
        generate_command,
        generate_paths,
        deps_command,
        deps_manifests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("prelint.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"
timeout_secs = 30
[lint]
binary = "revive"
args = ["-config", "revive.toml", "./..."]
[generate]
command = ["go", "generate", "./..."]
paths = ["gen"]
    "#
        )
        .unwrap();

        let eff = resolve_effective_with(root.to_str(), None, None, no_env).unwrap();
        assert_eq!(eff.output, "json");
        assert_eq!(eff.timeout, Some(Duration::from_secs(30)));
        assert_eq!(eff.lint_binary, "revive");
        assert_eq!(eff.lint_args, vec!["-config", "revive.toml", "./..."]);
        assert_eq!(
            eff.generate_command,
            Some(vec!["go".into(), "generate".into(), "./...".into()])
        );
        assert_eq!(eff.generate_paths, vec!["gen"]);
        assert!(eff.config_file.unwrap().ends_with("prelint.toml"));
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("prelint.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: human
probe:
  preview_bytes: 16
  caches:
    - tool: npm
      env: npm_config_cache
      path: ~/.npm
      marker: _cacache/index-v5
            "#
        )
        .unwrap();

        let eff = resolve_effective_with(root.to_str(), None, None, no_env).unwrap();
        assert_eq!(eff.output, "human");
        assert_eq!(eff.preview_bytes, 16);
        assert_eq!(eff.caches.len(), 1);
        assert_eq!(eff.caches[0].tool, "npm");
        // untouched sections fall back to defaults
        assert_eq!(eff.lint_binary, "golangci-lint");
        assert_eq!(eff.lint_cache_dir, eff.repo_root.join("build/cache"));
        assert_eq!(eff.timeout, Some(Duration::from_secs(600)));
        assert_eq!(eff.deps_manifests, vec!["Cargo.toml", "Cargo.lock"]);
        assert!(eff.generate_command.is_none());
    }

    #[test]
    fn test_cli_and_env_take_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("prelint.toml"),
            "output = \"json\"\ntimeout_secs = 30\n[lint]\ncache_dir = \"tools\"\n",
        )
        .unwrap();

        let eff = resolve_effective_with(root.to_str(), Some("human"), Some(0), |k| {
            (k == TOOL_CACHE_ENV).then(|| "/opt/lint-cache".to_string())
        })
        .unwrap();
        assert_eq!(eff.output, "human");
        assert_eq!(eff.timeout, None);
        assert_eq!(eff.lint_cache_dir, PathBuf::from("/opt/lint-cache"));

        let eff = resolve_effective_with(root.to_str(), None, None, no_env).unwrap();
        assert_eq!(eff.lint_cache_dir, eff.repo_root.join("tools"));
    }

    #[test]
    fn test_default_caches_when_none_declared() {
        let dir = tempdir().unwrap();
        let eff = resolve_effective_with(dir.path().to_str(), None, None, no_env).unwrap();
        assert!(eff.config_file.is_none());
        let tools: Vec<_> = eff.caches.iter().map(|c| c.tool.as_str()).collect();
        assert_eq!(tools, vec!["tool-cache", "cargo", "pip"]);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("prelint.toml"), "timeout_secs = \"soon\"").unwrap();
        let err = resolve_effective_with(dir.path().to_str(), None, None, no_env).unwrap_err();
        assert!(matches!(err, CheckError::Config { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_output_mode_is_usage_error() {
        let dir = tempdir().unwrap();
        let err =
            resolve_effective_with(dir.path().to_str(), Some("xml"), None, no_env).unwrap_err();
        assert!(matches!(err, CheckError::Usage(_)));
    }

    #[test]
    fn test_detect_repo_root_walks_up_to_git() {
        let dir = tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        assert_eq!(detect_repo_root(&root.join("a/b")), root);
    }
}

//! Read-only cache probe.
//!
//! Resolves each declared cache root (environment override, then path
//! template, then platform default), checks for its marker file, and keeps
//! a bounded preview of the marker for diagnostics. Nothing is written and
//! every resolution or read problem degrades to "not found". Symlinked
//! markers, and markers whose real path leaves the cache root, are never
//! opened.

use crate::config::CacheDecl;
use crate::models::{CacheLocation, ProbeResult};
use directories::{BaseDirs, UserDirs};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

const TRUNCATED: &str = "...(truncated)";

/// Probe every declared cache under the process environment.
pub fn run_probe(repo_root: &Path, caches: &[CacheDecl], preview_bytes: usize) -> Vec<ProbeResult> {
    run_probe_with(repo_root, caches, preview_bytes, |k| std::env::var(k).ok())
}

pub fn run_probe_with<F>(
    repo_root: &Path,
    caches: &[CacheDecl],
    preview_bytes: usize,
    env: F,
) -> Vec<ProbeResult>
where
    F: Fn(&str) -> Option<String>,
{
    caches
        .iter()
        .map(|decl| match resolve_location(decl, repo_root, &env) {
            Ok(loc) => probe_location(&loc, preview_bytes),
            Err(note) => {
                warn!(tool = %decl.tool, %note, "cache root unresolved; treating as not found");
                ProbeResult {
                    tool: decl.tool.clone(),
                    root: None,
                    marker_path: None,
                    found: false,
                    preview: None,
                    note: Some(note),
                }
            }
        })
        .collect()
}

/// Resolve a declared cache to an absolute location.
pub fn resolve_location<F>(
    decl: &CacheDecl,
    repo_root: &Path,
    env: &F,
) -> Result<CacheLocation, String>
where
    F: Fn(&str) -> Option<String>,
{
    if !is_contained(Path::new(&decl.marker)) {
        return Err(format!(
            "marker '{}' must be a relative path inside the cache root",
            decl.marker
        ));
    }
    let from_env = decl
        .env
        .as_deref()
        .and_then(|var| env(var))
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let root = match (from_env, decl.path.as_deref()) {
        (Some(p), _) => p,
        (None, Some(template)) => expand_template(template, env)?,
        (None, None) => platform_default(&decl.tool)?,
    };
    if root.as_os_str().is_empty() {
        return Err("cache root resolved to an empty path".to_string());
    }
    let root = if root.is_absolute() {
        root
    } else {
        repo_root.join(root)
    };
    Ok(CacheLocation {
        tool: decl.tool.clone(),
        root,
        marker: decl.marker.clone(),
    })
}

fn is_contained(rel: &Path) -> bool {
    !rel.as_os_str().is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn expand_template<F>(template: &str, env: &F) -> Result<PathBuf, String>
where
    F: Fn(&str) -> Option<String>,
{
    let home = || UserDirs::new().map(|u| u.home_dir().to_string_lossy().into_owned());
    shellexpand::full_with_context(
        template,
        home,
        |var: &str| -> Result<Option<String>, std::env::VarError> {
            env(var).map(Some).ok_or(std::env::VarError::NotPresent)
        },
    )
    .map(|s| PathBuf::from(s.into_owned()))
    .map_err(|e| format!("cannot expand '{template}': {e}"))
}

fn platform_default(tool: &str) -> Result<PathBuf, String> {
    BaseDirs::new()
        .map(|b| b.cache_dir().join(tool))
        .ok_or_else(|| format!("no home directory to derive a default root for '{tool}'"))
}

/// Check one resolved location. Reads at most `preview_bytes` of the marker.
pub fn probe_location(loc: &CacheLocation, preview_bytes: usize) -> ProbeResult {
    let marker_path = loc.marker_path();
    let (found, note) = match inspect_marker(&loc.root, &marker_path) {
        Ok(found) => (found, None),
        Err(note) => {
            warn!(tool = %loc.tool, %note, "marker rejected; treating as not found");
            (false, Some(note))
        }
    };
    let preview = if found {
        read_preview(&marker_path, preview_bytes)
    } else {
        None
    };
    info!(
        tool = %loc.tool,
        root = %loc.root.display(),
        marker = %loc.marker,
        found,
        "cache probe"
    );
    ProbeResult {
        tool: loc.tool.clone(),
        root: Some(loc.root.clone()),
        marker_path: Some(marker_path),
        found,
        preview,
        note,
    }
}

/// `Ok(true)` for a regular file that really lives under `root`.
fn inspect_marker(root: &Path, marker_path: &Path) -> Result<bool, String> {
    let Ok(meta) = fs::symlink_metadata(marker_path) else {
        return Ok(false);
    };
    if meta.file_type().is_symlink() {
        return Err(format!(
            "marker {} is a symlink; not followed",
            marker_path.display()
        ));
    }
    if !meta.is_file() {
        return Ok(false);
    }
    let (Ok(real_root), Ok(real_marker)) = (fs::canonicalize(root), fs::canonicalize(marker_path))
    else {
        return Ok(false);
    };
    if !real_marker.starts_with(&real_root) {
        return Err(format!(
            "marker {} resolves outside the cache root",
            marker_path.display()
        ));
    }
    Ok(true)
}

fn read_preview(path: &Path, max: usize) -> Option<String> {
    if max == 0 {
        return None;
    }
    let file = File::open(path).ok()?;
    let mut buf = Vec::with_capacity(max.min(4096) + 1);
    // One extra byte tells us whether the file was cut.
    file.take(max as u64 + 1).read_to_end(&mut buf).ok()?;
    let truncated = buf.len() > max;
    buf.truncate(max);
    let mut s = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        s.push_str(TRUNCATED);
    }
    Some(s)
}

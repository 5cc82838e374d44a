//! Supporting helpers: message prefixes, path display, executable lookup.

use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Display `path` relative to `root` when it lives beneath it.
pub fn rel_to_root(path: &Path, root: &Path) -> String {
    match pathdiff::diff_paths(path, root) {
        Some(rel) if !rel.starts_with("..") && !rel.as_os_str().is_empty() => {
            rel.to_string_lossy().replace('\\', "/")
        }
        _ => path.to_string_lossy().to_string(),
    }
}

#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) && Path::new(name).extension().is_none() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

pub fn find_executable_in_path(name: &str) -> Option<PathBuf> {
    if name.trim().is_empty() {
        return None;
    }
    let path_var = std::env::var_os("PATH")?;
    let dirs = std::env::split_paths(&path_var).collect::<Vec<_>>();
    find_executable_in_dirs(name, &dirs)
}

pub fn find_executable_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let file = exe_name(name);
    dirs.iter()
        .filter(|d| !d.as_os_str().is_empty())
        .map(|d| d.join(&file))
        .find(|candidate| is_executable(candidate))
}

/// Resolve a command's program: paths (relative ones against `cwd`) must
/// be executable, bare names are looked up on PATH.
pub fn resolve_program(program: &str, cwd: &Path) -> Option<PathBuf> {
    let trimmed = program.trim();
    if trimmed.contains('/') || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let p = cwd.join(trimmed);
        return is_executable(&p).then_some(p);
    }
    find_executable_in_path(trimmed)
}

//! Path helpers shared by the file tools and the permission gate.

use std::path::{Path, PathBuf};

/// Resolve a tool-supplied path against the working directory.
///
/// Models send paths with forward slashes on every platform; `Path::join`
/// handles them natively on Unix and Windows alike. Absolute paths pass
/// through untouched.
pub fn resolve_path(raw: &str, working_dir: &Path) -> PathBuf {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        working_dir.join(candidate)
    }
}

/// The path as presented back to the model: relative to the working
/// directory when the target lies inside it, absolute otherwise.
pub fn display_path(path: &Path, working_dir: &Path) -> String {
    match path.strip_prefix(working_dir) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
        _ => path.to_string_lossy().into_owned(),
    }
}

/// The scope recorded with a permission decision.
///
/// Targets inside the working directory are scoped to the working directory
/// itself, so an "allow for this session" decision covers the whole project
/// rather than a single file. Anything outside is scoped to its own
/// absolute path.
pub fn permission_scope(path: &Path, working_dir: &Path) -> String {
    if path.starts_with(working_dir) {
        working_dir.to_string_lossy().into_owned()
    } else {
        path.to_string_lossy().into_owned()
    }
}

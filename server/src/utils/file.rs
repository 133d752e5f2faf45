//! Path helpers for user-supplied locations (`SCRIB_DATA_DIR`, `--config`)

use std::path::{Path, PathBuf};

/// Resolve a user-supplied path to an absolute one
///
/// A leading `~` is the home directory. Relative paths resolve against the
/// working directory at startup; blank input means the working directory.
/// Components are kept as given, nothing is canonicalized here.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    let expanded = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            match dirs::home_dir() {
                Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
                None => PathBuf::from(path),
            }
        }
        _ => PathBuf::from(path),
    };

    absolute(&expanded)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) if path.as_os_str().is_empty() => cwd,
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

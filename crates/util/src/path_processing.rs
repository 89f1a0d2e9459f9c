use std::env;
use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Resolves a configuration file path.
///
/// A non-blank `override_var` environment variable wins (with `~` expansion);
/// otherwise the file lives under `<config_dir>/upward/<file_name>`.
pub fn config_file_path(override_var: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = env::var(override_var)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("upward").join(file_name)
}

//! File utility functions

use std::path::PathBuf;

/// Expand a leading `~` to the home directory.
///
/// Everything else is returned unchanged; relative paths stay relative to the
/// working directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }

    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/etc/breedql.json"), PathBuf::from("/etc/breedql.json"));
    }

    #[test]
    fn test_expand_path_relative_unchanged() {
        assert_eq!(expand_path("./catalog.json"), PathBuf::from("./catalog.json"));
        assert_eq!(expand_path(" request.json "), PathBuf::from("request.json"));
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/.breedql"), home.join(".breedql"));
        }
    }
}

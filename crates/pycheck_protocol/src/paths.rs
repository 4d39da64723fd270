use std::path::PathBuf;

/// Resolve the Pycheck home directory.
///
/// Priority:
/// 1) PYCHECK_HOME
/// 2) the user's home directory
/// 3) ./.pycheck
pub fn pycheck_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("PYCHECK_HOME") {
        return PathBuf::from(override_path);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".pycheck");
    }
    PathBuf::from(".").join(".pycheck")
}

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

const STATE_FILE: &str = ".taskgrid.state.json";

/// Persisted console state (written to .taskgrid.state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiState {
    /// Remembered expand-all preference. Stored even when the root count
    /// exceeds the auto-apply threshold; only the auto-apply is skipped.
    #[serde(default)]
    pub expand_all: bool,
    /// Scope the console was last viewing (flow task id, empty = root)
    #[serde(default)]
    pub last_scope: String,
}

/// Read state from the given directory; None on missing or malformed file
pub fn read_ui_state(dir: &Path) -> Option<UiState> {
    let content = fs::read_to_string(dir.join(STATE_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write state to the given directory. Goes through a temp file in the
/// same directory and renames over the target, so a crash mid-write
/// never leaves a truncated state file.
pub fn write_ui_state(dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(dir.join(STATE_FILE)).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let state = UiState {
            expand_all: true,
            last_scope: "T-002".into(),
        };
        write_ui_state(dir.path(), &state).unwrap();
        let loaded = read_ui_state(dir.path()).unwrap();
        assert!(loaded.expand_all);
        assert_eq!(loaded.last_scope, "T-002");
    }

    #[test]
    fn rewriting_replaces_the_file_without_leaving_temp_files() {
        let dir = TempDir::new().unwrap();
        let first = UiState {
            expand_all: true,
            last_scope: String::new(),
        };
        write_ui_state(dir.path(), &first).unwrap();
        let second = UiState {
            expand_all: false,
            last_scope: "T-002".into(),
        };
        write_ui_state(dir.path(), &second).unwrap();

        let loaded = read_ui_state(dir.path()).unwrap();
        assert!(!loaded.expand_all);
        assert_eq!(loaded.last_scope, "T-002");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STATE_FILE), "not json {{{").unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_empty_object() {
        let state: UiState = serde_json::from_str("{}").unwrap();
        assert!(!state.expand_all);
        assert!(state.last_scope.is_empty());
    }
}

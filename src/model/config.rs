use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Configuration from taskgrid.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Theme color overrides by slot name (hex strings like "#FF4444")
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default)]
    pub show_key_hints: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Above this many root items the remembered expand-all preference is
    /// stored but not auto-applied (avoids unbounded eager fetch).
    #[serde(default = "default_expand_all_threshold")]
    pub expand_all_auto_threshold: usize,
    /// Quiet window for the detail-editor autosave
    #[serde(default = "default_autosave_ms")]
    pub autosave_debounce_ms: u64,
    /// Quiet window for reference-search input
    #[serde(default = "default_search_ms")]
    pub search_debounce_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            expand_all_auto_threshold: 200,
            autosave_debounce_ms: 800,
            search_debounce_ms: 300,
        }
    }
}

fn default_expand_all_threshold() -> usize {
    200
}

fn default_autosave_ms() -> u64 {
    800
}

fn default_search_ms() -> u64 {
    300
}

/// Load taskgrid.toml, falling back to defaults when absent
pub fn load_config(path: Option<&Path>) -> Result<ConsoleConfig, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p,
        None => return Ok(ConsoleConfig::default()),
    };
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_on_empty_toml() {
        let cfg: ConsoleConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.behavior.expand_all_auto_threshold, 200);
        assert_eq!(cfg.behavior.autosave_debounce_ms, 800);
        assert_eq!(cfg.behavior.search_debounce_ms, 300);
        assert!(cfg.ui.colors.is_empty());
    }

    #[test]
    fn partial_behavior_section_keeps_other_defaults() {
        let cfg: ConsoleConfig = toml::from_str(
            "[behavior]\nautosave_debounce_ms = 500\n",
        )
        .unwrap();
        assert_eq!(cfg.behavior.autosave_debounce_ms, 500);
        assert_eq!(cfg.behavior.search_debounce_ms, 300);
    }
}

use crate::http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::{HunterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 3;
const MAX_MAX_CONCURRENT_FETCHES: usize = 16;

/// How duplicate candidate URLs are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Keep the first position, take the metadata of the last duplicate.
    #[default]
    LastWriteWins,
    /// Keep the first position, take the duplicate with the most non-empty context fields.
    RichestContext,
}

/// How the winning logo is picked from the ranked URL list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SelectionPolicy {
    /// First reachable candidate with an accepted content type, in rank order.
    #[default]
    FirstReachable,
    /// Fetch the top `k` ranked URLs and keep the largest one that validates.
    LargestOfTop { k: usize },
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HunterConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub dedup_policy: DedupPolicy,
    pub selection_policy: SelectionPolicy,
    /// Optional rule-weight table replacing the bundled one.
    pub weights_path: Option<String>,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            dedup_policy: DedupPolicy::default(),
            selection_policy: SelectionPolicy::default(),
            weights_path: None,
        }
    }
}

impl HunterConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrent_fetches.clamp(1, MAX_MAX_CONCURRENT_FETCHES)
    }
}

pub fn load_hunter_config(path: &Path) -> Result<HunterConfig> {
    if !path.exists() {
        return Ok(HunterConfig::default());
    }
    let bytes = std::fs::read(path)?;
    let parsed: HunterConfig = serde_json::from_slice(&bytes).map_err(|e| {
        HunterError::Config(format!(
            "failed to parse hunter config at {}: {e}",
            path.to_string_lossy()
        ))
    })?;
    Ok(parsed)
}

pub fn save_hunter_config(path: &Path, config: &HunterConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_hunter_config(&dir.path().join("absent.json")).expect("config");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_concurrent_fetches, 3);
        assert_eq!(config.dedup_policy, DedupPolicy::LastWriteWins);
        assert_eq!(config.selection_policy, SelectionPolicy::FirstReachable);
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("hunter.json");
        let config = HunterConfig {
            selection_policy: SelectionPolicy::LargestOfTop { k: 4 },
            dedup_policy: DedupPolicy::RichestContext,
            weights_path: Some("weights.txt".to_string()),
            ..HunterConfig::default()
        };
        save_hunter_config(&path, &config).expect("save");
        let loaded = load_hunter_config(&path).expect("load");
        assert_eq!(loaded.selection_policy, SelectionPolicy::LargestOfTop { k: 4 });
        assert_eq!(loaded.dedup_policy, DedupPolicy::RichestContext);
        assert_eq!(loaded.weights_path.as_deref(), Some("weights.txt"));
    }

    #[test]
    fn partial_config_fills_defaults_and_bad_json_names_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hunter.json");
        std::fs::write(&path, r#"{"timeout_secs": 5}"#).expect("write");
        let loaded = load_hunter_config(&path).expect("load");
        assert_eq!(loaded.timeout_secs, 5);
        assert_eq!(loaded.max_concurrent_fetches, 3);

        std::fs::write(&path, "{ nope").expect("write");
        let err = load_hunter_config(&path).expect_err("must fail");
        assert!(err.to_string().contains("hunter.json"), "err={err}");
    }

    #[test]
    fn concurrency_is_clamped() {
        let mut config = HunterConfig::default();
        config.max_concurrent_fetches = 0;
        assert_eq!(config.effective_concurrency(), 1);
        config.max_concurrent_fetches = 500;
        assert_eq!(config.effective_concurrency(), 16);
    }
}

//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::deck::DEFAULT_NUM_DECKS;

/// Persisted engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_num_decks")]
    pub num_decks: i32,
    /// How far (in BPM) the applied tempo may drift from the live estimate
    /// before the engine adopts the estimate.
    #[serde(default = "default_tempo_error_adjust_range")]
    pub tempo_error_adjust_range: f64,
    /// Events older than this at tick time are dropped unprocessed.
    #[serde(default = "default_event_max_age_ms")]
    pub event_max_age_ms: i64,
    /// Tempo assumed before the first tempo event arrives.
    #[serde(default = "default_bpm")]
    pub default_bpm: f64,
    /// Template file overriding the built-in one.
    #[serde(default)]
    pub template_path: Option<PathBuf>,
}

fn default_num_decks() -> i32 { DEFAULT_NUM_DECKS }
fn default_tempo_error_adjust_range() -> f64 { 1.0 }
fn default_event_max_age_ms() -> i64 { 2000 }
fn default_bpm() -> f64 { 120.0 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_decks: DEFAULT_NUM_DECKS,
            tempo_error_adjust_range: 1.0,
            event_max_age_ms: 2000,
            default_bpm: 120.0,
            template_path: None,
        }
    }
}

impl EngineConfig {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("cadence").join("engine.json")
    }

    pub fn load() -> Self {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded engine config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse engine config: {e}");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No engine config found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create config dir: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::error!("Failed to write engine config: {e}");
                } else {
                    log::debug!("Saved engine config to {}", path.display());
                }
            }
            Err(e) => log::error!("Failed to serialize engine config: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.num_decks, 4);
        assert_eq!(c.event_max_age_ms, 2000);
        assert!((c.tempo_error_adjust_range - 1.0).abs() < 1e-9);
        assert!((c.default_bpm - 120.0).abs() < 1e-9);
        assert!(c.template_path.is_none());
    }

    #[test]
    fn engine_config_partial_json_defaults() {
        let json = r#"{"num_decks": 2, "template_path": "/shows/custom.json"}"#;
        let c: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.num_decks, 2);
        assert_eq!(c.template_path, Some(PathBuf::from("/shows/custom.json")));
        assert_eq!(c.event_max_age_ms, 2000); // default
        assert!((c.default_bpm - 120.0).abs() < 1e-9); // default
    }
}

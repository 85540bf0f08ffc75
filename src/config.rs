use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine tuning knobs.
///
/// Defaults match the production game; a YAML file can override them for
/// embedders that want faster ticks or stricter resolution deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on one redirect lookup before falling back to the
    /// original title.
    pub resolve_timeout_secs: u64,
    /// Random draws attempted before an unconstrained replacement pick.
    pub replacement_max_draws: u32,
    /// Game clock tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Size of the match-event channel buffer.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: 5,
            replacement_max_draws: 50,
            tick_interval_ms: 1000,
            event_buffer: 64,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if file doesn't exist
    pub fn load_or_default(path: Option<&PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.resolve_timeout_secs, 5);
        assert_eq!(config.replacement_max_draws, 50);
        assert_eq!(config.tick_interval_ms, 1000);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            EngineConfig::load_or_default(Some(&PathBuf::from("/nonexistent/engine.yaml")))
                .unwrap();
        assert_eq!(config.resolve_timeout_secs, 5);
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "resolve_timeout_secs: 2\nreplacement_max_draws: 10\ntick_interval_ms: 100\nevent_buffer: 8\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.resolve_timeout(), Duration::from_secs(2));
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }
}

use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Engine configuration, consumed at construction.
///
/// Every field carries a serde default, so a partial YAML document (or an
/// empty one) is valid. `connection_pool_enabled` and `max_connections`
/// are pass-through values kept for configuration-surface compatibility
/// with collaborators that share this file; the engine itself does not act
/// on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_true")]
    pub caching_enabled: bool,
    #[serde(default = "default_true")]
    pub index_optimization_enabled: bool,
    #[serde(default = "default_true")]
    pub query_analysis_enabled: bool,
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: u64,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default = "default_statistics_capacity")]
    pub statistics_capacity: usize,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_min_healthy_rate")]
    pub min_healthy_rate: f64,
    #[serde(default)]
    pub connection_pool_enabled: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_true() -> bool {
    true
}

fn default_slow_query_threshold_ms() -> u64 {
    1000
}

fn default_max_cache_entries() -> u64 {
    1000
}

fn default_cache_ttl_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_statistics_capacity() -> usize {
    1000
}

fn default_health_check_interval_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_min_healthy_rate() -> f64 {
    0.8
}

fn default_max_connections() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            caching_enabled: default_true(),
            index_optimization_enabled: default_true(),
            query_analysis_enabled: default_true(),
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
            max_cache_entries: default_max_cache_entries(),
            cache_ttl_ms: default_cache_ttl_ms(),
            statistics_capacity: default_statistics_capacity(),
            health_check_interval_ms: default_health_check_interval_ms(),
            min_healthy_rate: default_min_healthy_rate(),
            connection_pool_enabled: false,
            max_connections: default_max_connections(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config file at {}", path))?;
        let mut config: EngineConfig = serde_yaml::from_str(&content)
            .context(format!("Failed to parse config file at {}", path))?;

        // Environment variable overrides
        if let Ok(threshold) = std::env::var("CAMBER_SLOW_QUERY_THRESHOLD_MS") {
            if let Ok(value) = threshold.parse() {
                config.slow_query_threshold_ms = value;
            }
        }
        if let Ok(ttl) = std::env::var("CAMBER_CACHE_TTL_MS") {
            if let Ok(value) = ttl.parse() {
                config.cache_ttl_ms = value;
            }
        }

        Ok(config)
    }
}

/// Partial runtime update for [`EngineConfig`]. Only the fields that are
/// `Some` are applied.
///
/// Capacity fields (`max_cache_entries`, `statistics_capacity`) size their
/// stores at construction; a patch updates the surfaced value without
/// resizing the live store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPatch {
    pub caching_enabled: Option<bool>,
    pub index_optimization_enabled: Option<bool>,
    pub query_analysis_enabled: Option<bool>,
    pub slow_query_threshold_ms: Option<u64>,
    pub max_cache_entries: Option<u64>,
    pub cache_ttl_ms: Option<u64>,
    pub statistics_capacity: Option<usize>,
    pub health_check_interval_ms: Option<u64>,
    pub min_healthy_rate: Option<f64>,
    pub connection_pool_enabled: Option<bool>,
    pub max_connections: Option<usize>,
}

impl ConfigPatch {
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(v) = self.caching_enabled {
            config.caching_enabled = v;
        }
        if let Some(v) = self.index_optimization_enabled {
            config.index_optimization_enabled = v;
        }
        if let Some(v) = self.query_analysis_enabled {
            config.query_analysis_enabled = v;
        }
        if let Some(v) = self.slow_query_threshold_ms {
            config.slow_query_threshold_ms = v;
        }
        if let Some(v) = self.max_cache_entries {
            config.max_cache_entries = v;
        }
        if let Some(v) = self.cache_ttl_ms {
            config.cache_ttl_ms = v;
        }
        if let Some(v) = self.statistics_capacity {
            config.statistics_capacity = v;
        }
        if let Some(v) = self.health_check_interval_ms {
            config.health_check_interval_ms = v;
        }
        if let Some(v) = self.min_healthy_rate {
            config.min_healthy_rate = v;
        }
        if let Some(v) = self.connection_pool_enabled {
            config.connection_pool_enabled = v;
        }
        if let Some(v) = self.max_connections {
            config.max_connections = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.caching_enabled);
        assert!(config.index_optimization_enabled);
        assert!(config.query_analysis_enabled);
        assert_eq!(config.slow_query_threshold_ms, 1000);
        assert_eq!(config.max_cache_entries, 1000);
        assert_eq!(config.cache_ttl_ms, 300_000);
        assert_eq!(config.min_healthy_rate, 0.8);
    }

    #[test]
    fn test_partial_yaml_parsing() {
        let yaml = r#"
caching_enabled: false
slow_query_threshold_ms: 250
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.caching_enabled);
        assert_eq!(config.slow_query_threshold_ms, 250);
        // Unspecified fields fall back to defaults
        assert!(config.query_analysis_enabled);
        assert_eq!(config.max_cache_entries, 1000);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_ttl_ms: 60000").unwrap();
        let config = EngineConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.cache_ttl_ms, 60_000);
        assert!(config.caching_enabled);
    }

    #[test]
    fn test_patch_applies_only_provided_fields() {
        let mut config = EngineConfig::default();
        let patch = ConfigPatch {
            caching_enabled: Some(false),
            slow_query_threshold_ms: Some(500),
            ..Default::default()
        };
        patch.apply(&mut config);

        assert!(!config.caching_enabled);
        assert_eq!(config.slow_query_threshold_ms, 500);
        assert!(config.index_optimization_enabled);
        assert_eq!(config.cache_ttl_ms, 300_000);
    }
}

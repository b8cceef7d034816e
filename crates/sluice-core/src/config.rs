use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings for the lifecycle coordinator and executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix for every cache key
    pub cache_key_prefix: String,

    /// Expiry of cached process instances
    pub flow_instance_cache_ttl_secs: u64,

    /// Expiry of cached deployments
    pub flow_info_cache_ttl_secs: u64,

    /// Upper bound on nodes visited by a single walk
    pub max_walk_steps: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_key_prefix: "sluice".to_string(),
            flow_instance_cache_ttl_secs: 300,
            flow_info_cache_ttl_secs: 300,
            max_walk_steps: 1000,
        }
    }
}

impl RuntimeConfig {
    /// Cache key of a process instance
    pub fn flow_instance_key(&self, flow_instance_id: &str) -> String {
        format!("{}:flow_instance:{}", self.cache_key_prefix, flow_instance_id)
    }

    /// Cache key of a deployment
    pub fn flow_info_key(&self, flow_deploy_id: &str) -> String {
        format!("{}:flow_info:{}", self.cache_key_prefix, flow_deploy_id)
    }

    /// Expiry of cached process instances
    pub fn flow_instance_ttl(&self) -> Duration {
        Duration::from_secs(self.flow_instance_cache_ttl_secs)
    }

    /// Expiry of cached deployments
    pub fn flow_info_ttl(&self) -> Duration {
        Duration::from_secs(self.flow_info_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_and_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.flow_instance_key("fi-1"), "sluice:flow_instance:fi-1");
        assert_eq!(config.flow_info_key("fd-1"), "sluice:flow_info:fd-1");
        assert_eq!(config.flow_instance_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"cache_key_prefix": "tenant-a", "max_walk_steps": 10}"#).unwrap();
        assert_eq!(config.cache_key_prefix, "tenant-a");
        assert_eq!(config.max_walk_steps, 10);
        assert_eq!(config.flow_info_cache_ttl_secs, 300);
    }
}

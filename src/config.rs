use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    /// Ledger contract configuration
    #[serde(default)]
    pub contract: ContractConfig,
    /// Gateway retry/timeout/breaker tuning
    #[serde(default)]
    pub gateway: GatewayPolicyConfig,
    /// Read-cache TTL tiers
    #[serde(default)]
    pub cache: CacheConfig,
    /// Audit retention tiers
    #[serde(default)]
    pub audit: AuditConfig,
    /// Notification fanout
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractConfig {
    /// Name of the export contract on the shared ledger
    pub name: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            name: "exportlifecycle".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayPolicyConfig {
    /// Attempts per call, transient failures only
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub attempt_timeout_ms: u64,
    /// Consecutive transport failures before a submit breaker opens
    pub breaker_threshold: u32,
    pub breaker_cooldown_ms: u64,
}

impl Default for GatewayPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            attempt_timeout_ms: 3_000,
            breaker_threshold: 5,
            breaker_cooldown_ms: 30_000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Single-export reads
    pub short_ttl_secs: u64,
    /// List/search results
    pub medium_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_ttl_secs: 10,
            medium_ttl_secs: 180,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    pub retention_days: u64,
    /// Authorization rejections are kept longer
    pub security_retention_days: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            security_retention_days: 365,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyConfig {
    /// Capacity of the engine -> fanout event queue
    pub queue_size: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { queue_size: 4_096 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "cofex.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),
            enable_tracing: true,
            contract: ContractConfig::default(),
            gateway: GatewayPolicyConfig::default(),
            cache: CacheConfig::default(),
            audit: AuditConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.contract.name, "exportlifecycle");
        assert_eq!(config.gateway.max_attempts, 4);
        assert_eq!(config.gateway.breaker_threshold, 5);
        assert_eq!(config.cache.short_ttl_secs, 10);
        assert_eq!(config.audit.security_retention_days, 365);
    }

    #[test]
    fn test_yaml_sections_default_when_absent() {
        let yaml = r#"
log_level: debug
log_dir: ./logs
log_file: core.log
use_json: true
rotation: hourly
enable_tracing: true
gateway:
  max_attempts: 6
  base_delay_ms: 50
  max_delay_ms: 1000
  attempt_timeout_ms: 2000
  breaker_threshold: 3
  breaker_cooldown_ms: 10000
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.max_attempts, 6);
        assert_eq!(config.gateway.breaker_threshold, 3);
        // Untouched sections fall back to defaults
        assert_eq!(config.cache.medium_ttl_secs, 180);
        assert_eq!(config.notify.queue_size, 4_096);
    }
}

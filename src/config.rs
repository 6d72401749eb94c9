use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Signature authentication settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Allowed |now - timestamp| in milliseconds
    pub max_time_drift_ms: i64,
    /// Hex public keys granted admin permissions
    pub admin_keys: Vec<String>,
    pub enable_metrics: bool,
    /// Period of the nonce garbage-collection sweep
    pub nonce_gc_interval_ms: u64,
    /// HS256 secret for the bearer token provider; provider disabled when unset
    pub token_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_time_drift_ms: 300_000,
            admin_keys: Vec::new(),
            enable_metrics: false,
            nonce_gc_interval_ms: 300_000,
            token_secret: None,
        }
    }
}

impl AuthConfig {
    /// Age after which a nonce record may be swept.
    pub fn nonce_retention_ms(&self) -> i64 {
        self.max_time_drift_ms.saturating_mul(2)
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`.
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        if config.auth.max_time_drift_ms <= 0 {
            anyhow::bail!("auth.max_time_drift_ms must be positive");
        }
        if config.auth.nonce_gc_interval_ms == 0 {
            anyhow::bail!("auth.nonce_gc_interval_ms must be positive");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
log_level: info
log_dir: ./logs
log_file: auth.log
use_json: false
rotation: daily
enable_tracing: true
gateway:
  host: 127.0.0.1
  port: 8080
auth:
  max_time_drift_ms: 60000
  admin_keys:
    - d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a
  enable_metrics: true
"#;

    #[test]
    fn test_parse_yaml() {
        let config = AppConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.auth.max_time_drift_ms, 60_000);
        assert_eq!(config.auth.admin_keys.len(), 1);
        assert!(config.auth.enable_metrics);
        // Unset fields fall back to defaults
        assert_eq!(config.auth.nonce_gc_interval_ms, 300_000);
        assert_eq!(config.auth.token_secret, None);
        assert_eq!(config.auth.nonce_retention_ms(), 120_000);
    }

    #[test]
    fn test_auth_section_optional() {
        let yaml = YAML.split("auth:").next().unwrap();
        let config = AppConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[test]
    fn test_reject_non_positive_drift() {
        let yaml = YAML.replace("60000", "0");
        assert!(AppConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.log_file, "auth.log");
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load_from("/nonexistent/dev.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

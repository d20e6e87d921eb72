//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: AUTHCACHE_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/authcache/{service_name}/config.toml
//! 4. System directory: /etc/authcache/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "accounts"
//! port = 8080
//!
//! [session]
//! secret = "...at least 64 bytes..."
//! secure = true
//!
//! [redis]
//! url = "redis://localhost:6379"
//!
//! [bindings.github]
//! path = "/oauth/github"
//! provider = "github"
//! redirect_to = "/home"
//! client_id = "..."
//! client_secret = "..."
//! redirect_url = "https://example.com/oauth/github"
//! scopes = ["read:user"]
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::binding::BindingConfig;
use crate::error::Result;
use crate::session::SessionConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Session cookie configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Redis configuration (optional; the in-memory cache is used without it)
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    /// Provider bindings keyed by binding name
    #[serde(default)]
    pub bindings: BTreeMap<String, BindingSettings>,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level filter (tracing `EnvFilter` syntax)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Timeout for calls to identity providers in seconds
    #[serde(default = "default_oauth_timeout")]
    pub oauth_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn oauth_timeout(&self) -> Duration {
        Duration::from_secs(self.oauth_timeout_secs)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (redis://host:port)
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Maximum retry attempts for establishing Redis connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// One `[bindings.<name>]` table: the route path plus the binding itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSettings {
    /// Callback route path (e.g. `/oauth/github`)
    pub path: String,

    #[serde(flatten)]
    pub binding: BindingConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_oauth_timeout() -> u64 {
    10
}

fn default_redis_max_connections() -> usize {
    16
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "authcache".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later merges win
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed("AUTHCACHE_").split("__"));

        let config: Config = figment.extract()?;
        Ok(config.with_binding_names())
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories. Environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("AUTHCACHE_").split("__"))
            .extract()?;

        Ok(config.with_binding_names())
    }

    /// Binding names default to their table key
    fn with_binding_names(mut self) -> Self {
        for (key, settings) in self.bindings.iter_mut() {
            if settings.binding.name.is_empty() {
                settings.binding.name = key.clone();
            }
        }
        self
    }

    /// Config file paths in priority order (highest first)
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix("authcache");
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc/authcache")
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Get Redis URL
    pub fn redis_url(&self) -> Option<&str> {
        self.redis.as_ref().map(|r| r.url.as_str())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "authcache".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                oauth_timeout_secs: default_oauth_timeout(),
            },
            session: SessionConfig::default(),
            redis: None,
            bindings: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.oauth_timeout(), Duration::from_secs(10));
        assert!(config.redis_url().is_none());
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_load_from_file_with_bindings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "accounts"
port = 9000

[redis]
url = "redis://localhost:6379"

[bindings.github]
path = "/oauth/github"
provider = "github"
redirect_to = "/home"
client_id = "id"
client_secret = "secret"
redirect_url = "https://example.com/oauth/github"
scopes = ["read:user"]
cache_ttl_secs = 3600
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "accounts");
        assert_eq!(config.service.port, 9000);
        assert_eq!(config.redis_url(), Some("redis://localhost:6379"));

        let github = &config.bindings["github"];
        assert_eq!(github.path, "/oauth/github");
        assert_eq!(github.binding.name, "github");
        assert_eq!(github.binding.cache_ttl_secs, 3600);
        assert_eq!(github.binding.scopes, vec!["read:user".to_string()]);
    }

    #[test]
    fn test_redis_defaults_applied() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "accounts"

[redis]
url = "redis://cache:6379"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        let redis = config.redis.unwrap();
        assert_eq!(redis.max_connections, 16);
        assert_eq!(redis.max_retries, 3);
    }
}

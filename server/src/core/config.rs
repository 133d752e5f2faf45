use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PORT,
    DEFAULT_QUERY_CACHE_MAX_ENTRIES, DEFAULT_RATE_LIMIT_QUOTA, DEFAULT_RATE_LIMIT_WINDOW_SECS,
    DEFAULT_STORE_TIMEOUT_MS,
};

// =============================================================================
// Store Backend Enum
// =============================================================================

/// Shared store backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendType {
    /// Process-local store (single instance deployments and tests)
    #[default]
    Memory,
    /// Redis-compatible store shared by all instances
    Redis,
}

impl fmt::Display for StoreBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackendType::Memory => write!(f, "memory"),
            StoreBackendType::Redis => write!(f, "redis"),
        }
    }
}

// =============================================================================
// Eviction Policy Enum
// =============================================================================

/// Query cache eviction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Least-recently-used
    #[default]
    Lru,
    /// TinyLFU - LRU eviction + LFU admission
    TinyLfu,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => write!(f, "lru"),
            EvictionPolicy::TinyLfu => write!(f, "tinylfu"),
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Shared store configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoreFileConfig {
    pub backend: Option<StoreBackendType>,
    /// Connection URL for Redis-compatible backends
    pub redis_url: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Query cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryCacheFileConfig {
    pub max_entries: Option<u64>,
    pub eviction_policy: Option<EvictionPolicy>,
    pub max_page_size: Option<u32>,
}

/// Rate limit configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub quota: Option<u32>,
    pub window_secs: Option<u64>,
    pub bypass_header: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub store: Option<StoreFileConfig>,
    pub query_cache: Option<QueryCacheFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        if let Some(store) = other.store {
            let current = self.store.get_or_insert_with(StoreFileConfig::default);
            if store.backend.is_some() {
                tracing::trace!(backend = ?store.backend, "Merging store.backend");
                current.backend = store.backend;
            }
            if store.redis_url.is_some() {
                tracing::trace!("Merging store.redis_url");
                current.redis_url = store.redis_url;
            }
            if store.timeout_ms.is_some() {
                tracing::trace!(timeout_ms = ?store.timeout_ms, "Merging store.timeout_ms");
                current.timeout_ms = store.timeout_ms;
            }
        }

        if let Some(query_cache) = other.query_cache {
            let current = self
                .query_cache
                .get_or_insert_with(QueryCacheFileConfig::default);
            if query_cache.max_entries.is_some() {
                tracing::trace!(max_entries = ?query_cache.max_entries, "Merging query_cache.max_entries");
                current.max_entries = query_cache.max_entries;
            }
            if query_cache.eviction_policy.is_some() {
                tracing::trace!(policy = ?query_cache.eviction_policy, "Merging query_cache.eviction_policy");
                current.eviction_policy = query_cache.eviction_policy;
            }
            if query_cache.max_page_size.is_some() {
                tracing::trace!(max_page_size = ?query_cache.max_page_size, "Merging query_cache.max_page_size");
                current.max_page_size = query_cache.max_page_size;
            }
        }

        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            if rate_limit.enabled.is_some() {
                tracing::trace!(enabled = ?rate_limit.enabled, "Merging rate_limit.enabled");
                current.enabled = rate_limit.enabled;
            }
            if rate_limit.quota.is_some() {
                tracing::trace!(quota = ?rate_limit.quota, "Merging rate_limit.quota");
                current.quota = rate_limit.quota;
            }
            if rate_limit.window_secs.is_some() {
                tracing::trace!(window_secs = ?rate_limit.window_secs, "Merging rate_limit.window_secs");
                current.window_secs = rate_limit.window_secs;
            }
            if rate_limit.bypass_header.is_some() {
                tracing::trace!("Merging rate_limit.bypass_header");
                current.bypass_header = rate_limit.bypass_header;
            }
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Shared store configuration (used by CacheService)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackendType,
    /// Redis URL (redis backend)
    pub redis_url: Option<String>,
    /// Upper bound for every store call
    pub timeout: Duration,
}

/// Read-path query cache configuration
#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    pub max_entries: u64,
    pub eviction_policy: EvictionPolicy,
    /// Page sizes above this are clamped
    pub max_page_size: u32,
}

/// Admission control configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per client per window
    pub quota: u32,
    pub window_secs: u64,
    pub bypass_header: Option<String>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub query_cache: QueryCacheConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.scrib/scrib.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            store = %config.store.backend,
            store_timeout_ms = config.store.timeout.as_millis() as u64,
            query_cache_max_entries = config.query_cache.max_entries,
            eviction_policy = %config.query_cache.eviction_policy,
            rate_limit_enabled = config.rate_limit.enabled,
            rate_limit_quota = config.rate_limit.quota,
            rate_limit_window_secs = config.rate_limit.window_secs,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Built-in defaults only, ignoring files and the environment
    #[cfg(test)]
    pub fn defaults() -> Self {
        Self::resolve(&CliConfig::default(), FileConfig::default())
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_store = file_config.store.unwrap_or_default();
        let file_query_cache = file_config.query_cache.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let store = StoreConfig {
            backend: cli.store_backend.or(file_store.backend).unwrap_or_default(),
            redis_url: cli
                .store_redis_url
                .clone()
                .or(file_store.redis_url)
                .filter(|u| !u.is_empty()),
            timeout: Duration::from_millis(
                cli.store_timeout_ms
                    .or(file_store.timeout_ms)
                    .unwrap_or(DEFAULT_STORE_TIMEOUT_MS),
            ),
        };

        let query_cache = QueryCacheConfig {
            max_entries: cli
                .query_cache_max_entries
                .or(file_query_cache.max_entries)
                .unwrap_or(DEFAULT_QUERY_CACHE_MAX_ENTRIES),
            eviction_policy: cli
                .query_cache_eviction_policy
                .or(file_query_cache.eviction_policy)
                .unwrap_or_default(),
            max_page_size: cli
                .max_page_size
                .or(file_query_cache.max_page_size)
                .unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        };

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate_limit.enabled)
                .unwrap_or(true),
            quota: cli
                .rate_limit_quota
                .or(file_rate_limit.quota)
                .unwrap_or(DEFAULT_RATE_LIMIT_QUOTA),
            window_secs: cli
                .rate_limit_window_secs
                .or(file_rate_limit.window_secs)
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            bypass_header: cli
                .rate_limit_bypass_header
                .clone()
                .or(file_rate_limit.bypass_header)
                .filter(|s| !s.is_empty()),
        };

        Self {
            server,
            store,
            query_cache,
            rate_limit,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.store.backend == StoreBackendType::Redis && self.store.redis_url.is_none() {
            anyhow::bail!(
                "Configuration error: store.redis_url is required when store.backend is 'redis'"
            );
        }

        if self.store.timeout.is_zero() {
            anyhow::bail!("Configuration error: store.timeout_ms must be greater than 0");
        }

        if self.query_cache.max_page_size == 0 {
            anyhow::bail!("Configuration error: query_cache.max_page_size must be greater than 0");
        }

        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            anyhow::bail!("Configuration error: rate_limit.window_secs must be greater than 0");
        }

        if self.rate_limit.enabled && self.rate_limit.quota == 0 {
            tracing::warn!("rate_limit.quota is 0, all requests will be rejected");
        }

        if is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Server is bound to all interfaces; notes are reachable from the network"
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.scrib/scrib.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub(crate) fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_serde() {
        let backend: StoreBackendType = serde_json::from_str(r#""redis""#).unwrap();
        assert_eq!(backend, StoreBackendType::Redis);
        assert_eq!(StoreBackendType::Memory.to_string(), "memory");
    }

    #[test]
    fn test_eviction_policy_default_is_lru() {
        assert_eq!(EvictionPolicy::default(), EvictionPolicy::Lru);
        let policy: EvictionPolicy = serde_json::from_str(r#""tinylfu""#).unwrap();
        assert_eq!(policy, EvictionPolicy::TinyLfu);
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 9000 },
            "store": { "backend": "redis", "redis_url": "redis://cache:6379/0", "timeout_ms": 100 },
            "query_cache": { "max_entries": 500, "eviction_policy": "lru", "max_page_size": 50 },
            "rate_limit": { "enabled": true, "quota": 3, "window_secs": 60 }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.backend, Some(StoreBackendType::Redis));
        assert_eq!(store.timeout_ms, Some(100));
        assert_eq!(config.query_cache.as_ref().unwrap().max_page_size, Some(50));
        assert_eq!(config.rate_limit.as_ref().unwrap().quota, Some(3));
    }

    #[test]
    fn test_file_config_unknown_fields_collected() {
        let json = r#"{ "sever": { "port": 1 } }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert!(config.server.is_none());
        assert!(config.extra.get("sever").is_some());
    }

    #[test]
    fn test_merge_overlay_takes_precedence() {
        let mut base: FileConfig =
            serde_json::from_str(r#"{ "rate_limit": { "quota": 10, "window_secs": 30 } }"#)
                .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "rate_limit": { "quota": 20 } }"#).unwrap();
        base.merge(overlay);

        let rate_limit = base.rate_limit.unwrap();
        assert_eq!(rate_limit.quota, Some(20));
        assert_eq!(rate_limit.window_secs, Some(30));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default());
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.store.backend, StoreBackendType::Memory);
        assert_eq!(
            config.store.timeout,
            Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS)
        );
        assert_eq!(config.query_cache.eviction_policy, EvictionPolicy::Lru);
        assert_eq!(config.query_cache.max_page_size, DEFAULT_MAX_PAGE_SIZE);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.quota, 100);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "server": { "port": 9000 }, "rate_limit": { "quota": 5 } }"#)
                .unwrap();
        let cli = CliConfig {
            port: Some(7000),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, file);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.rate_limit.quota, 5);
    }

    #[test]
    fn test_validate_redis_requires_url() {
        let cli = CliConfig {
            store_backend: Some(StoreBackendType::Redis),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store.redis_url"));
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let cli = CliConfig {
            rate_limit_window_secs: Some(0),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cli = CliConfig {
            store_timeout_ms: Some(0),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(!is_all_interfaces("127.0.0.1"));
    }
}

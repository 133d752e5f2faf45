use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{EvictionPolicy, StoreBackendType};
use super::constants::{
    ENV_CONFIG, ENV_HOST, ENV_PORT, ENV_QUERY_CACHE_EVICTION_POLICY, ENV_QUERY_CACHE_MAX_ENTRIES,
    ENV_QUERY_CACHE_MAX_PAGE_SIZE, ENV_RATE_LIMIT_BYPASS_HEADER, ENV_RATE_LIMIT_ENABLED,
    ENV_RATE_LIMIT_QUOTA, ENV_RATE_LIMIT_WINDOW_SECS, ENV_STORE_BACKEND, ENV_STORE_REDIS_URL,
    ENV_STORE_TIMEOUT_MS,
};

#[derive(Parser)]
#[command(name = "scrib")]
#[command(version, about = "Notes service with shared admission control and coherent query caching", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Shared store options
    /// Shared store backend (memory or redis)
    #[arg(long, global = true, env = ENV_STORE_BACKEND, value_parser = parse_store_backend_type)]
    pub store_backend: Option<StoreBackendType>,

    /// Redis-compatible store URL. Supports Redis, Sentinel, Valkey, Dragonfly.
    /// Formats: redis://host:port/db, redis+sentinel://s1:port,s2:port/master/db
    #[arg(long, global = true, env = ENV_STORE_REDIS_URL)]
    pub store_redis_url: Option<String>,

    /// Timeout for every shared store call, in milliseconds
    #[arg(long, global = true, env = ENV_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: Option<u64>,

    // Query cache options
    /// Maximum number of cached query pages
    #[arg(long, global = true, env = ENV_QUERY_CACHE_MAX_ENTRIES)]
    pub query_cache_max_entries: Option<u64>,

    /// Query cache eviction policy (lru or tinylfu)
    #[arg(long, global = true, env = ENV_QUERY_CACHE_EVICTION_POLICY, value_parser = parse_eviction_policy)]
    pub query_cache_eviction_policy: Option<EvictionPolicy>,

    /// Largest page size a client may request
    #[arg(long, global = true, env = ENV_QUERY_CACHE_MAX_PAGE_SIZE)]
    pub max_page_size: Option<u32>,

    // Rate limit options
    /// Enable or disable admission control
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Requests allowed per client per window
    #[arg(long, global = true, env = ENV_RATE_LIMIT_QUOTA)]
    pub rate_limit_quota: Option<u32>,

    /// Window length in seconds
    #[arg(long, global = true, env = ENV_RATE_LIMIT_WINDOW_SECS)]
    pub rate_limit_window_secs: Option<u64>,

    /// Rate limit bypass header secret
    #[arg(long, global = true, env = ENV_RATE_LIMIT_BYPASS_HEADER)]
    pub rate_limit_bypass_header: Option<String>,
}

/// Parse store backend type from CLI/env string
fn parse_store_backend_type(s: &str) -> Result<StoreBackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(StoreBackendType::Memory),
        "redis" => Ok(StoreBackendType::Redis),
        _ => Err(format!(
            "Invalid store backend '{}'. Valid options: memory, redis",
            s
        )),
    }
}

/// Parse eviction policy from CLI/env string
fn parse_eviction_policy(s: &str) -> Result<EvictionPolicy, String> {
    match s.to_lowercase().as_str() {
        "lru" => Ok(EvictionPolicy::Lru),
        "tinylfu" => Ok(EvictionPolicy::TinyLfu),
        _ => Err(format!(
            "Invalid eviction policy '{}'. Valid options: lru, tinylfu",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub store_backend: Option<StoreBackendType>,
    pub store_redis_url: Option<String>,
    pub store_timeout_ms: Option<u64>,
    pub query_cache_max_entries: Option<u64>,
    pub query_cache_eviction_policy: Option<EvictionPolicy>,
    pub max_page_size: Option<u32>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_quota: Option<u32>,
    pub rate_limit_window_secs: Option<u64>,
    pub rate_limit_bypass_header: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        store_backend: cli.store_backend,
        store_redis_url: cli.store_redis_url,
        store_timeout_ms: cli.store_timeout_ms,
        query_cache_max_entries: cli.query_cache_max_entries,
        query_cache_eviction_policy: cli.query_cache_eviction_policy,
        max_page_size: cli.max_page_size,
        rate_limit_enabled: cli.rate_limit_enabled,
        rate_limit_quota: cli.rate_limit_quota,
        rate_limit_window_secs: cli.rate_limit_window_secs,
        rate_limit_bypass_header: cli.rate_limit_bypass_header,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_backend_type() {
        assert_eq!(
            parse_store_backend_type("Redis").unwrap(),
            StoreBackendType::Redis
        );
        assert!(parse_store_backend_type("memcached").is_err());
    }

    #[test]
    fn test_parse_eviction_policy() {
        assert_eq!(parse_eviction_policy("LRU").unwrap(), EvictionPolicy::Lru);
        assert!(parse_eviction_policy("fifo").is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "scrib",
            "--port",
            "9000",
            "--rate-limit-quota",
            "3",
            "--store-backend",
            "redis",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.rate_limit_quota, Some(3));
        assert_eq!(cli.store_backend, Some(StoreBackendType::Redis));
    }
}

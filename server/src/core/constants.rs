// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Scrib";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "scrib";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".scrib";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "scrib.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SCRIB_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "SCRIB_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "SCRIB_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "SCRIB_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 8080;

/// Default request body limit (note bodies are text)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "SCRIB_DATA_DIR";

// =============================================================================
// SQLite
// =============================================================================

/// SQLite database filename (inside the data directory)
pub const SQLITE_DB_FILENAME: &str = "scrib.db";

/// Maximum pooled SQLite connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout for lock contention
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Page cache size (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// Pages between automatic WAL checkpoints
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval for the background WAL checkpoint task
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Shared Store
// =============================================================================

/// Environment variable for store backend (memory or redis)
pub const ENV_STORE_BACKEND: &str = "SCRIB_STORE_BACKEND";

/// Environment variable for Redis-compatible store URL
///
/// Supports Redis, Sentinel, Valkey, Dragonfly.
pub const ENV_STORE_REDIS_URL: &str = "SCRIB_STORE_REDIS_URL";

/// Environment variable for per-call store timeout (milliseconds)
pub const ENV_STORE_TIMEOUT_MS: &str = "SCRIB_STORE_TIMEOUT_MS";

/// Default per-call store timeout
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 250;

/// In-memory store: expired counters are swept every N increments
pub const MEMORY_STORE_CLEANUP_EVERY: u64 = 256;

/// Rate limit counter key prefix
pub const KEY_PREFIX_RATE_LIMIT: &str = "ratelimit";

/// Generation counter key prefix
pub const KEY_PREFIX_GENERATION: &str = "gen";

// =============================================================================
// Query Cache
// =============================================================================

/// Environment variable for query cache capacity
pub const ENV_QUERY_CACHE_MAX_ENTRIES: &str = "SCRIB_QUERY_CACHE_MAX_ENTRIES";

/// Environment variable for query cache eviction policy (lru or tinylfu)
pub const ENV_QUERY_CACHE_EVICTION_POLICY: &str = "SCRIB_QUERY_CACHE_EVICTION_POLICY";

/// Environment variable for maximum page size
pub const ENV_QUERY_CACHE_MAX_PAGE_SIZE: &str = "SCRIB_MAX_PAGE_SIZE";

/// Default query cache capacity (entries)
pub const DEFAULT_QUERY_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Default page size when the caller does not give one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default upper bound for page size
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Capacity of the in-process invalidation broadcast channel
pub const INVALIDATION_CHANNEL_CAPACITY: usize = 1024;

/// First delay before retrying deferred invalidations
pub const INVALIDATION_RETRY_INITIAL_MS: u64 = 100;

/// Upper bound for the deferred invalidation retry backoff
pub const INVALIDATION_RETRY_MAX_MS: u64 = 5_000;

// =============================================================================
// Rate Limiting
// =============================================================================

/// Environment variable to enable/disable admission control
pub const ENV_RATE_LIMIT_ENABLED: &str = "SCRIB_RATE_LIMIT_ENABLED";

/// Environment variable for requests allowed per window
pub const ENV_RATE_LIMIT_QUOTA: &str = "SCRIB_RATE_LIMIT_QUOTA";

/// Environment variable for window length in seconds
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "SCRIB_RATE_LIMIT_WINDOW_SECS";

/// Environment variable for the bypass header secret
pub const ENV_RATE_LIMIT_BYPASS_HEADER: &str = "SCRIB_RATE_LIMIT_BYPASS_HEADER";

/// Default requests per window
pub const DEFAULT_RATE_LIMIT_QUOTA: u32 = 100;

/// Default window length
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Header carrying the bypass secret
pub const RATE_LIMIT_BYPASS_HEADER: &str = "X-RateLimit-Bypass";

// =============================================================================
// Notes
// =============================================================================

/// Maximum note title length
pub const MAX_TITLE_LENGTH: u64 = 200;

/// Maximum free-text search query length
pub const MAX_QUERY_LENGTH: u64 = 100;

/// Maximum language tag length
pub const MAX_LANGUAGE_LENGTH: u64 = 50;

//! Shared store error types

use std::time::Duration;

use thiserror::Error;

/// Errors from the shared key-value store
///
/// Every variant is an "unreachable store" condition for the admission
/// controller and the coherency coordinator.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Store operation failed: {0}")]
    Operation(String),

    #[error("Store call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CacheError::Config("redis_url required".to_string());
        assert_eq!(
            err.to_string(),
            "Store configuration error: redis_url required"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let err = CacheError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Store call timed out after 250ms");
    }

    #[test]
    fn test_operation_error_display() {
        let err = CacheError::Operation("counter is not an integer".to_string());
        assert_eq!(
            err.to_string(),
            "Store operation failed: counter is not an integer"
        );
    }
}

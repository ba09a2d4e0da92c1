//! Error types for the elastic pool

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur while configuring or feeding the pool manager
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Per-pool capacity was changed after the first pool was created
    #[error(
        "Capacity is fixed at {current} once pools exist (requested {requested}, {live_pools} live pools)"
    )]
    CapacityLocked {
        /// Capacity currently in effect
        current: usize,
        /// Capacity the caller asked for
        requested: usize,
        /// Number of pools alive when the change was attempted
        live_pools: usize,
    },

    /// Failed to spawn the thread of a new worker pool
    #[error("Failed to spawn thread for pool #{pool_id}: {message}")]
    SpawnError {
        /// ID of the pool that could not be started
        pool_id: u64,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: std::io::Error,
    },
}

impl PoolError {
    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a capacity locked error
    pub fn capacity_locked(current: usize, requested: usize, live_pools: usize) -> Self {
        PoolError::CapacityLocked {
            current,
            requested,
            live_pools,
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        pool_id: u64,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::SpawnError {
            pool_id,
            message: message.into(),
            source,
        }
    }

    /// Whether this error reports misuse of the configuration API
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PoolError::InvalidConfig { .. } | PoolError::CapacityLocked { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_creation() {
        let err = PoolError::capacity_locked(4, 8, 2);
        assert!(matches!(err, PoolError::CapacityLocked { .. }));
        assert!(err.is_usage_error());

        let err = PoolError::invalid_config("capacity_per_pool", "must be greater than 0");
        assert!(err.is_usage_error());

        let io_err = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no more threads");
        let err = PoolError::spawn_with_source(3, "Cannot start pool thread", io_err);
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_error_display() {
        let err = PoolError::capacity_locked(4, 8, 2);
        assert_eq!(
            err.to_string(),
            "Capacity is fixed at 4 once pools exist (requested 8, 2 live pools)"
        );

        let err = PoolError::invalid_config("poll_interval", "must be non-zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'poll_interval': must be non-zero"
        );
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "resource unavailable");
        let err = PoolError::spawn_with_source(5, "Cannot create thread", io_err);

        assert!(matches!(err, PoolError::SpawnError { .. }));
        assert!(err.to_string().contains("pool #5"));
        assert!(err.source().is_some());
    }
}

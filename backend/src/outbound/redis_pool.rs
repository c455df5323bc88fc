//! Shared `bb8` pool of Redis connections.
//!
//! One pool backs both the user cache and the list-based ingestion source.

use std::time::Duration;

use bb8_redis::{RedisConnectionManager, bb8};

/// Pool of multiplexed Redis connections.
pub type RedisPool = bb8::Pool<RedisConnectionManager>;

/// Failures building a [`RedisPool`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedisPoolError {
    /// The URL was rejected by the client.
    #[error("invalid redis url: {message}")]
    Url {
        /// Client error description.
        message: String,
    },
    /// The initial connections could not be opened.
    #[error("failed to build redis pool: {message}")]
    Build {
        /// Client error description.
        message: String,
    },
}

/// Connect to `redis_url` with up to `max_size` connections.
///
/// # Errors
///
/// Returns [`RedisPoolError`] for a malformed URL or an unreachable server.
pub async fn connect_redis(redis_url: &str, max_size: u32) -> Result<RedisPool, RedisPoolError> {
    let manager = RedisConnectionManager::new(redis_url).map_err(|err| RedisPoolError::Url {
        message: err.to_string(),
    })?;
    bb8::Pool::builder()
        .max_size(max_size.max(2))
        .connection_timeout(Duration::from_secs(5))
        .build(manager)
        .await
        .map_err(|err| RedisPoolError::Build {
            message: err.to_string(),
        })
}

//! Service configuration loaded via OrthoConfig.
//!
//! Values merge from CLI flags, `USERSTREAM_*` environment variables and
//! configuration files. Every key except `encryption_key` has a default.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::Timeouts;
use crate::domain::ingestion::IngestionSettings;

const DEFAULT_QUEUE_NAME: &str = "user_batches";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Errors raised when settings are missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The configuration layers could not be merged or parsed.
    #[error("failed to load settings: {message}")]
    Load {
        /// Loader diagnostic.
        message: String,
    },
    /// No cipher key was configured.
    #[error("encryption_key is required (set USERSTREAM_ENCRYPTION_KEY)")]
    MissingEncryptionKey,
    /// `bind_addr` is not a socket address.
    #[error("bind_addr {value:?} is not a socket address")]
    InvalidBindAddr {
        /// Rejected value.
        value: String,
    },
    /// A size or count setting was zero.
    #[error("{key} must be greater than zero")]
    Zero {
        /// Offending key.
        key: &'static str,
    },
}

/// Runtime settings for the userstream service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERSTREAM")]
pub struct AppSettings {
    /// PostgreSQL URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Redis URL. The in-memory cache and channel source are used when absent.
    pub redis_url: Option<String>,
    /// Redis list carrying ingestion batches.
    pub queue_name: Option<String>,
    /// Base64 of the 32-byte PII cipher key.
    pub encryption_key: Option<String>,
    /// Cache entry lifetime in seconds.
    #[ortho_config(default = 60)]
    pub cache_ttl_secs: u64,
    /// Capacity of each bounded pipeline channel.
    #[ortho_config(default = 50)]
    pub channel_size: usize,
    /// Capacity of the error sink queue.
    pub error_buffer: Option<usize>,
    /// Deadline for a single store call, in seconds.
    pub store_timeout_secs: Option<u64>,
    /// Deadline for a single cache call, in seconds.
    pub cache_timeout_secs: Option<u64>,
    /// HTTP listen address.
    pub bind_addr: Option<String>,
    /// Upper bound on pooled database connections.
    #[ortho_config(default = 10)]
    pub db_max_connections: u32,
}

impl AppSettings {
    /// Merge defaults, configuration files, `USERSTREAM_*` variables and
    /// the given command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Load`] when a layer cannot be parsed.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::load_from_iter(args).map_err(|err| SettingsError::Load {
            message: err.to_string(),
        })
    }

    /// Configured queue name, or `user_batches`.
    pub fn queue_name(&self) -> &str {
        self.queue_name.as_deref().unwrap_or(DEFAULT_QUEUE_NAME)
    }

    /// The cipher key.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingEncryptionKey`] when unset or blank.
    pub fn encryption_key(&self) -> Result<&str, SettingsError> {
        self.encryption_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(SettingsError::MissingEncryptionKey)
    }

    /// Lifetime of a cache entry, 60 seconds unless configured.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Capacity of each pipeline channel.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] when configured as zero.
    pub fn channel_size(&self) -> Result<usize, SettingsError> {
        non_zero("channel_size", self.channel_size)
    }

    /// Store and cache deadlines.
    pub fn timeouts(&self) -> Timeouts {
        let defaults = Timeouts::default();
        Timeouts {
            store: self
                .store_timeout_secs
                .map_or(defaults.store, Duration::from_secs),
            cache: self
                .cache_timeout_secs
                .map_or(defaults.cache, Duration::from_secs),
        }
    }

    /// Pipeline tuning derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero `error_buffer`.
    pub fn ingestion(&self) -> Result<IngestionSettings, SettingsError> {
        let error_buffer = non_zero(
            "error_buffer",
            self.error_buffer
                .unwrap_or(IngestionSettings::DEFAULT_ERROR_BUFFER),
        )?;
        Ok(IngestionSettings {
            error_buffer,
            timeouts: self.timeouts(),
        })
    }

    /// HTTP listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when unparseable.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    /// Pool size shared by the database and Redis connections.
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }
}

fn non_zero(key: &'static str, value: usize) -> Result<usize, SettingsError> {
    if value == 0 {
        Err(SettingsError::Zero { key })
    } else {
        Ok(value)
    }
}

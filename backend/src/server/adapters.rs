//! Adapter selection driven by [`AppSettings`].
//!
//! Real adapters are used when their URL is configured; otherwise the
//! in-memory variants stand in so the service still runs standalone.

use std::io;
use std::sync::Arc;

use tracing::info;

use userstream::config::AppSettings;
use userstream::domain::ports::{IngestionSource, PiiCipher, UserCache, UserStore};
use userstream::outbound::cache::{InMemoryUserCache, RedisUserCache};
use userstream::outbound::crypto::ChaChaPiiCipher;
use userstream::outbound::persistence::{DbPool, DieselUserStore, InMemoryUserStore, PoolConfig};
use userstream::outbound::queue::{
    ChannelIngestionSource, RedisListIngestionSource, RedisListSettings,
};
use userstream::outbound::redis_pool::connect_redis;

/// Driven ports shared by the pipeline and the HTTP services.
pub struct Adapters {
    pub store: Arc<dyn UserStore>,
    pub cache: Arc<dyn UserCache>,
    pub source: Arc<dyn IngestionSource>,
    pub cipher: Arc<dyn PiiCipher>,
}

/// Build every adapter named by `settings`.
///
/// # Errors
/// Returns [`io::Error`] when a setting is invalid or a backend is
/// unreachable at startup.
pub async fn build_adapters(settings: &AppSettings) -> io::Result<Adapters> {
    let key = settings.encryption_key().map_err(io::Error::other)?;
    let cipher: Arc<dyn PiiCipher> = Arc::new(
        ChaChaPiiCipher::from_base64_key(key)
            .map_err(|err| io::Error::other(format!("invalid encryption key: {err}")))?,
    );

    let store: Arc<dyn UserStore> = match settings.database_url.as_deref() {
        Some(url) => {
            let config = PoolConfig::new(url).with_max_size(settings.db_max_connections());
            let pool = DbPool::new(config)
                .await
                .map_err(|err| io::Error::other(format!("database pool: {err}")))?;
            info!("using postgres user store");
            Arc::new(DieselUserStore::new(pool))
        }
        None => {
            info!("no database_url configured; using in-memory user store");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let (cache, source): (Arc<dyn UserCache>, Arc<dyn IngestionSource>) =
        match settings.redis_url.as_deref() {
            Some(url) => {
                let pool = connect_redis(url, settings.db_max_connections())
                    .await
                    .map_err(|err| io::Error::other(format!("redis pool: {err}")))?;
                info!(queue = settings.queue_name(), "using redis cache and queue");
                (
                    Arc::new(RedisUserCache::new(pool.clone(), settings.cache_ttl())),
                    Arc::new(RedisListIngestionSource::new(
                        pool,
                        RedisListSettings::new(settings.queue_name()),
                    )),
                )
            }
            None => {
                info!("no redis_url configured; using in-memory cache and channel source");
                let capacity = settings.channel_size().map_err(io::Error::other)?;
                (
                    Arc::new(InMemoryUserCache::new(settings.cache_ttl())),
                    Arc::new(ChannelIngestionSource::new(capacity)),
                )
            }
        };

    Ok(Adapters {
        store,
        cache,
        source,
        cipher,
    })
}

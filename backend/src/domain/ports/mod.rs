//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_key;
mod ingestion_source;
mod pii_cipher;
mod user_cache;
mod user_records;
mod user_store;

pub use cache_key::{UserCacheKey, UserCacheKeyValidationError};
#[cfg(test)]
pub use ingestion_source::MockIngestionSource;
pub use ingestion_source::{Delivery, IngestionSource, IngestionSourceError};
#[cfg(test)]
pub use pii_cipher::MockPiiCipher;
pub use pii_cipher::{CipherError, FixturePiiCipher, PiiCipher};
#[cfg(test)]
pub use user_cache::MockUserCache;
pub use user_cache::{UserCache, UserCacheError};
#[cfg(test)]
pub use user_records::{MockUserPagesQuery, MockUserRecordsCommand, MockUserRecordsQuery};
pub use user_records::{UserPagesQuery, UserRecordsCommand, UserRecordsQuery};
#[cfg(test)]
pub use user_store::MockUserStore;
pub use user_store::{UserStore, UserStoreError};

//! User store adapters.
//!
//! - [`DieselUserStore`]: PostgreSQL via Diesel with async support through
//!   `diesel-async` and `bb8` connection pooling. Row structs (`models.rs`)
//!   and table definitions (`schema.rs`) never leave this module.
//! - [`InMemoryUserStore`]: process-local ordered map with the same
//!   semantics, used when no database URL is configured.
//!
//! # Example
//!
//! ```no_run
//! use userstream::outbound::persistence::{DbPool, DieselUserStore, PoolConfig};
//!
//! # async fn connect() -> Result<(), userstream::outbound::persistence::PoolError> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/userstream")).await?;
//! let store = DieselUserStore::new(pool);
//! # let _ = store;
//! # Ok(())
//! # }
//! ```

mod diesel_user_store;
mod memory;
mod models;
mod pool;
mod schema;

pub use diesel_user_store::DieselUserStore;
pub use memory::InMemoryUserStore;
pub use pool::{DbPool, PoolConfig, PoolError};

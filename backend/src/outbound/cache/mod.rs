//! User cache adapters.
//!
//! Both adapters store [`SealedUserRecord`](crate::domain::SealedUserRecord)
//! values only and apply a TTL fixed at construction.

mod memory;
mod redis;

pub use memory::InMemoryUserCache;
pub use redis::RedisUserCache;

//! Ingestion source adapters.
//!
//! - [`ChannelIngestionSource`]: in-process bounded channel, used when no
//!   Redis URL is configured and by tests.
//! - [`RedisListIngestionSource`]: Redis list consumed with `BRPOP`, fed by
//!   producers through `LPUSH`, which keeps deliveries in FIFO order.

mod channel;
mod redis_list;

pub use channel::ChannelIngestionSource;
pub use redis_list::{RedisListIngestionSource, RedisListSettings};

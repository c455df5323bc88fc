//! Userstream service library.
//!
//! A staged ingestion pipeline moves user batches from a queue into a
//! durable store and a cache, with the email field encrypted before it leaves
//! the pipeline. Read paths serve the same records cache-aside, paged, or as
//! an event stream.
//!
//! - [`domain`]: records, services, ports and the ingestion pipeline
//! - [`outbound`]: store, cache, queue and cipher adapters
//! - [`inbound`]: the HTTP adapter
//! - [`config`]: runtime settings

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

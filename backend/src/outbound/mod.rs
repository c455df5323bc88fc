//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL user store using Diesel, plus an in-memory
//!   store
//! - **cache**: Redis user cache, plus an in-memory cache
//! - **queue**: Redis list and in-process channel ingestion sources
//! - **crypto**: ChaCha20-Poly1305 PII cipher
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod cache;
pub mod crypto;
pub mod persistence;
pub mod queue;
pub mod redis_pool;

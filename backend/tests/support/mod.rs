//! Shared harness for integration tests: in-memory adapters and a real
//! ChaCha20-Poly1305 cipher.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use userstream::domain::ports::PiiCipher;
use userstream::outbound::cache::InMemoryUserCache;
use userstream::outbound::crypto::ChaChaPiiCipher;
use userstream::outbound::persistence::InMemoryUserStore;
use userstream::outbound::queue::ChannelIngestionSource;

pub const TEST_KEY: [u8; 32] = [7; 32];

/// Adapters wired the way the binary does without a database or Redis.
pub struct Harness {
    pub source: Arc<ChannelIngestionSource>,
    pub store: Arc<InMemoryUserStore>,
    pub cache: Arc<InMemoryUserCache>,
    pub cipher: Arc<dyn PiiCipher>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            source: Arc::new(ChannelIngestionSource::new(8)),
            store: Arc::new(InMemoryUserStore::new()),
            cache: Arc::new(InMemoryUserCache::new(Duration::from_secs(60))),
            cipher: Arc::new(ChaChaPiiCipher::from_key_bytes(&TEST_KEY).expect("valid key")),
        }
    }
}

/// One wire record with every key present.
pub fn wire_user(id: i64, first_name: &str, email: &str) -> Value {
    json!({
        "id": id,
        "first_name": first_name,
        "last_name": "Doe",
        "email": email,
        "created_at": "2024-03-01T12:00:00Z",
        "deleted_at": null,
        "merged_at": null,
        "parent_user_id": null,
    })
}

/// Serialise records as one batch payload.
pub fn batch(records: &[Value]) -> Vec<u8> {
    serde_json::to_vec(records).expect("batch serialises")
}

//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{UserPagesQuery, UserRecordsCommand, UserRecordsQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub records: Arc<dyn UserRecordsQuery>,
    pub commands: Arc<dyn UserRecordsCommand>,
    pub pages: Arc<dyn UserPagesQuery>,
}

impl HttpState {
    /// Construct state from the driving ports.
    pub fn new(
        records: Arc<dyn UserRecordsQuery>,
        commands: Arc<dyn UserRecordsCommand>,
        pages: Arc<dyn UserPagesQuery>,
    ) -> Self {
        Self {
            records,
            commands,
            pages,
        }
    }
}

//! Diesel table definitions for the PostgreSQL schema.
//!
//! Must match `backend/migrations/` exactly.

diesel::table! {
    /// Ingested user records. `email` holds ciphertext only.
    user_records (id) {
        /// Primary key: upstream record id.
        id -> Int8,
        /// Given name.
        first_name -> Text,
        /// Family name.
        last_name -> Text,
        /// Base64 email ciphertext.
        email -> Text,
        /// Upstream creation instant.
        created_at -> Nullable<Timestamptz>,
        /// Upstream deletion instant.
        deleted_at -> Nullable<Timestamptz>,
        /// Upstream merge instant.
        merged_at -> Nullable<Timestamptz>,
        /// Account this record was merged into.
        parent_user_id -> Nullable<Int8>,
    }
}

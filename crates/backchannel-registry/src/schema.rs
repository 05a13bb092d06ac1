//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Connection records, keyed by `connection_id`.
    pub const CONNECTIONS: &str = "connections";

    /// Index: connections by user, keyed by
    /// `len(user_id) || user_id || connection_id`.
    pub const CONNECTIONS_BY_USER: &str = "connections_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::USERS, cf::CONNECTIONS, cf::CONNECTIONS_BY_USER]
}

//! Key encoding utilities for `RocksDB`.
//!
//! User and connection IDs are variable-length strings, so the per-user
//! index key carries a big-endian `u16` length prefix for the user
//! segment. That keeps prefix scans unambiguous: no user prefix can be a
//! proper prefix of another user's keys.

use backchannel_core::{ConnectionId, UserId};

/// Encode a user key (the user ID bytes).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_str().as_bytes().to_vec()
}

/// Encode a connection key (the connection ID bytes).
#[must_use]
pub fn connection_key(connection_id: &ConnectionId) -> Vec<u8> {
    connection_id.as_str().as_bytes().to_vec()
}

/// Encode a user-connection index key:
/// `len(user_id) (u16 BE) || user_id || connection_id`.
#[must_use]
pub fn user_connection_key(user_id: &UserId, connection_id: &ConnectionId) -> Vec<u8> {
    let user = user_id.as_str().as_bytes();
    let conn = connection_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(2 + user.len() + conn.len());
    key.extend_from_slice(&u16::try_from(user.len()).unwrap_or(u16::MAX).to_be_bytes());
    key.extend_from_slice(user);
    key.extend_from_slice(conn);
    key
}

/// Encode a user prefix for scanning all connections of a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    let user = user_id.as_str().as_bytes();
    let mut key = Vec::with_capacity(2 + user.len());
    key.extend_from_slice(&u16::try_from(user.len()).unwrap_or(u16::MAX).to_be_bytes());
    key.extend_from_slice(user);
    key
}

/// Extract the connection ID from a user-connection index key.
///
/// Returns `None` if the key is malformed.
#[must_use]
pub fn connection_id_from_user_key(key: &[u8]) -> Option<ConnectionId> {
    if key.len() < 2 {
        return None;
    }
    let user_len = usize::from(u16::from_be_bytes([key[0], key[1]]));
    let conn = key.get(2 + user_len..)?;
    std::str::from_utf8(conn).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_connection_key_roundtrip() {
        let user: UserId = "alice".parse().unwrap();
        let conn: ConnectionId = "C1".parse().unwrap();

        let key = user_connection_key(&user, &conn);
        assert!(key.starts_with(&user_prefix(&user)));
        assert_eq!(connection_id_from_user_key(&key), Some(conn));
    }

    #[test]
    fn prefixes_do_not_collide() {
        // "ab" must not prefix-match keys belonging to "abc".
        let ab: UserId = "ab".parse().unwrap();
        let abc: UserId = "abc".parse().unwrap();
        let conn: ConnectionId = "C1".parse().unwrap();

        let key = user_connection_key(&abc, &conn);
        assert!(!key.starts_with(&user_prefix(&ab)));
    }

    #[test]
    fn malformed_keys_yield_none() {
        assert_eq!(connection_id_from_user_key(&[0x00]), None);
        // Length prefix pointing past the end.
        assert_eq!(connection_id_from_user_key(&[0xff, 0xff, b'x']), None);
    }
}

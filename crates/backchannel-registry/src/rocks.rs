//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::Arc;

use backchannel_core::{ConnectionId, UserId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{ConnectedUser, Connection};
use crate::ConnectionStore;

/// RocksDB-backed registry storage.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a record using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a record from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl ConnectionStore for RocksStore {
    fn put_user(&self, user: &ConnectedUser) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(&user.user_id);
        let value = Self::serialize(user)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<ConnectedUser>> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_connection(&self, connection: &Connection) -> Result<()> {
        let cf_connections = self.cf(cf::CONNECTIONS)?;
        let cf_by_user = self.cf(cf::CONNECTIONS_BY_USER)?;

        let connection_key = keys::connection_key(&connection.connection_id);
        let index_key = keys::user_connection_key(&connection.user_id, &connection.connection_id);
        let value = Self::serialize(connection)?;

        // If the row is moving between users, drop the old index entry in
        // the same batch.
        let old_index = self
            .get_connection(&connection.connection_id)?
            .filter(|old| old.user_id != connection.user_id)
            .map(|old| keys::user_connection_key(&old.user_id, &old.connection_id));

        let mut batch = WriteBatch::default();
        if let Some(old_key) = old_index {
            batch.delete_cf(&cf_by_user, &old_key);
        }
        batch.put_cf(&cf_connections, &connection_key, &value);
        batch.put_cf(&cf_by_user, &index_key, []);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_connection(&self, connection_id: &ConnectionId) -> Result<Option<Connection>> {
        let cf = self.cf(cf::CONNECTIONS)?;
        let key = keys::connection_key(connection_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_connection(&self, connection_id: &ConnectionId) -> Result<bool> {
        let cf_connections = self.cf(cf::CONNECTIONS)?;
        let cf_by_user = self.cf(cf::CONNECTIONS_BY_USER)?;

        let Some(connection) = self.get_connection(connection_id)? else {
            return Ok(false);
        };

        let connection_key = keys::connection_key(connection_id);
        let index_key = keys::user_connection_key(&connection.user_id, connection_id);

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_connections, &connection_key);
        batch.delete_cf(&cf_by_user, &index_key);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(true)
    }

    fn connections_of_user(&self, user_id: &UserId) -> Result<Vec<Connection>> {
        let cf_by_user = self.cf(cf::CONNECTIONS_BY_USER)?;
        let prefix = keys::user_prefix(user_id);

        let mut connections = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let Some(connection_id) = keys::connection_id_from_user_key(&key) else {
                continue;
            };
            if let Some(connection) = self.get_connection(&connection_id)? {
                connections.push(connection);
            }
        }

        Ok(connections)
    }

    fn all_connections(&self) -> Result<Vec<Connection>> {
        let cf = self.cf(cf::CONNECTIONS)?;

        let mut connections = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            connections.push(Self::deserialize(&value)?);
        }

        Ok(connections)
    }

    fn count_connections(&self) -> Result<usize> {
        let cf = self.cf(cf::CONNECTIONS)?;

        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::Database(e.to_string()))?;
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn connection(user: &str, conn: &str) -> Connection {
        Connection {
            connection_id: conn.parse().unwrap(),
            user_id: user.parse().unwrap(),
            user_agent: Some("test-agent".to_string()),
            active: true,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn user_crud() {
        let (store, _dir) = create_test_store();
        let user_id: UserId = "U1".parse().unwrap();

        assert!(store.get_user(&user_id).unwrap().is_none());

        let mut user = ConnectedUser::new(user_id.clone());
        user.last_connect_at = Some(Utc::now());
        store.put_user(&user).unwrap();

        let retrieved = store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(retrieved.user_id, user_id);
        assert!(retrieved.last_connect_at.is_some());
        assert!(retrieved.last_disconnect_at.is_none());
    }

    #[test]
    fn connection_crud() {
        let (store, _dir) = create_test_store();
        let conn = connection("U1", "C1");

        store.put_connection(&conn).unwrap();

        let retrieved = store.get_connection(&conn.connection_id).unwrap().unwrap();
        assert_eq!(retrieved.user_id, conn.user_id);
        assert!(retrieved.active);

        assert!(store.delete_connection(&conn.connection_id).unwrap());
        assert!(store.get_connection(&conn.connection_id).unwrap().is_none());
        assert!(!store.delete_connection(&conn.connection_id).unwrap());
    }

    #[test]
    fn connections_of_user_scans_index() {
        let (store, _dir) = create_test_store();

        store.put_connection(&connection("U1", "C1")).unwrap();
        store.put_connection(&connection("U1", "C2")).unwrap();
        store.put_connection(&connection("U2", "C3")).unwrap();

        let u1: UserId = "U1".parse().unwrap();
        let mut ids: Vec<String> = store
            .connections_of_user(&u1)
            .unwrap()
            .into_iter()
            .map(|c| c.connection_id.to_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["C1", "C2"]);

        let u2: UserId = "U2".parse().unwrap();
        assert_eq!(store.connections_of_user(&u2).unwrap().len(), 1);
    }

    #[test]
    fn similar_user_ids_stay_separate() {
        let (store, _dir) = create_test_store();

        store.put_connection(&connection("ab", "C1")).unwrap();
        store.put_connection(&connection("abc", "C2")).unwrap();

        let ab: UserId = "ab".parse().unwrap();
        let found = store.connections_of_user(&ab).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].connection_id.to_string(), "C1");
    }

    #[test]
    fn delete_removes_index_entry() {
        let (store, _dir) = create_test_store();
        let conn = connection("U1", "C1");
        store.put_connection(&conn).unwrap();
        store.delete_connection(&conn.connection_id).unwrap();

        let u1: UserId = "U1".parse().unwrap();
        assert!(store.connections_of_user(&u1).unwrap().is_empty());
    }

    #[test]
    fn reassigning_connection_moves_index() {
        let (store, _dir) = create_test_store();
        store.put_connection(&connection("U1", "C1")).unwrap();
        store.put_connection(&connection("U2", "C1")).unwrap();

        let u1: UserId = "U1".parse().unwrap();
        let u2: UserId = "U2".parse().unwrap();
        assert!(store.connections_of_user(&u1).unwrap().is_empty());
        assert_eq!(store.connections_of_user(&u2).unwrap().len(), 1);
    }

    #[test]
    fn counts_and_listing() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.count_connections().unwrap(), 0);

        store.put_connection(&connection("U1", "C1")).unwrap();
        store.put_connection(&connection("U2", "C2")).unwrap();

        assert_eq!(store.count_connections().unwrap(), 2);
        assert_eq!(store.all_connections().unwrap().len(), 2);
    }
}

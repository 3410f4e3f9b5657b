use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::checkout::types::CheckoutRecord;
use crate::error::DirectoryError;
use crate::membership::types::Node;
use crate::registry::cache::RegistryStore;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed directory database.
///
/// Connections are opened per operation from the stored path; SQLite's
/// own locking serializes writers, and `BUSY_TIMEOUT` lets concurrent
/// handlers wait out short write bursts instead of failing.
pub struct DirectoryDb {
    db_path: PathBuf,
}

impl DirectoryDb {
    pub fn open(db_path: &Path) -> Result<Self, DirectoryError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DirectoryError::Unavailable(format!("state dir: {e}")))?;
            }
        }

        let db = Self {
            db_path: db_path.to_path_buf(),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn connection(&self) -> Result<Connection, DirectoryError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<(), DirectoryError> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS network_nodes (
                node_name TEXT PRIMARY KEY,
                gossip_address TEXT NOT NULL,
                public_id BLOB NOT NULL,
                https_address TEXT NOT NULL,
                port INTEGER NOT NULL,
                boot_time INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS dataset_lookup (
                dataset_id TEXT PRIMARY KEY,
                node_name TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS dataset_checkouts (
                dataset_id TEXT NOT NULL,
                client_token TEXT NOT NULL,
                checkout_time INTEGER NOT NULL,
                PRIMARY KEY (dataset_id, client_token, checkout_time)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_checkouts_dataset
             ON dataset_checkouts(dataset_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_lookup_node
             ON dataset_lookup(node_name)",
            [],
        )?;

        Ok(())
    }

    // --- network_nodes ---

    pub fn upsert_node(&self, node: &Node) -> Result<(), DirectoryError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO network_nodes
                (node_name, gossip_address, public_id, https_address, port, boot_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(node_name) DO UPDATE SET
                gossip_address = ?2,
                public_id = ?3,
                https_address = ?4,
                port = ?5,
                boot_time = ?6",
            params![
                node.name,
                node.gossip_addr,
                node.public_id,
                node.https_addr,
                node.port,
                node.boot_time_ms,
            ],
        )?;
        Ok(())
    }

    pub fn select_node(&self, name: &str) -> Result<Option<Node>, DirectoryError> {
        let conn = self.connection()?;
        let node = conn
            .query_row(
                "SELECT node_name, gossip_address, public_id, https_address, port, boot_time
                 FROM network_nodes WHERE node_name = ?1",
                params![name],
                row_to_node,
            )
            .optional()?;
        Ok(node)
    }

    pub fn node_exists(&self, name: &str) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM network_nodes WHERE node_name = ?1)",
            params![name],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    /// Returns whether a row was actually deleted.
    pub fn delete_node(&self, name: &str) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let affected = conn.execute(
            "DELETE FROM network_nodes WHERE node_name = ?1",
            params![name],
        )?;
        Ok(affected > 0)
    }

    pub fn all_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT node_name, gossip_address, public_id, https_address, port, boot_time
             FROM network_nodes",
        )?;
        let rows = stmt.query_map([], row_to_node)?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    // --- dataset_lookup ---

    pub fn upsert_lookup_entry(
        &self,
        dataset_id: &str,
        node_name: &str,
    ) -> Result<(), DirectoryError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO dataset_lookup (dataset_id, node_name) VALUES (?1, ?2)
             ON CONFLICT(dataset_id) DO UPDATE SET node_name = ?2",
            params![dataset_id, node_name],
        )?;
        Ok(())
    }

    pub fn select_lookup_entry(&self, dataset_id: &str) -> Result<Option<String>, DirectoryError> {
        let conn = self.connection()?;
        let owner = conn
            .query_row(
                "SELECT node_name FROM dataset_lookup WHERE dataset_id = ?1",
                params![dataset_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(owner)
    }

    pub fn lookup_entry_exists(&self, dataset_id: &str) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM dataset_lookup WHERE dataset_id = ?1)",
            params![dataset_id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    pub fn delete_lookup_entry(&self, dataset_id: &str) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let affected = conn.execute(
            "DELETE FROM dataset_lookup WHERE dataset_id = ?1",
            params![dataset_id],
        )?;
        Ok(affected > 0)
    }

    pub fn dataset_identifiers(&self) -> Result<Vec<String>, DirectoryError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT dataset_id FROM dataset_lookup")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// Identifiers currently mapped to the given node. Used by delta
    /// resolution so removals never touch other nodes' entries.
    pub fn dataset_identifiers_for_node(
        &self,
        node_name: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let conn = self.connection()?;
        let mut stmt =
            conn.prepare("SELECT dataset_id FROM dataset_lookup WHERE node_name = ?1")?;
        let rows = stmt.query_map(params![node_name], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    pub fn all_lookup_entries(&self) -> Result<Vec<(String, String)>, DirectoryError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT dataset_id, node_name FROM dataset_lookup")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    // --- dataset_checkouts ---

    /// Inserts a checkout record. With `exclusive` set, the insert only
    /// happens if no record exists for the dataset yet; the single
    /// conditional statement makes the database the final arbiter of the
    /// check-then-insert race. Returns whether a row was inserted.
    pub fn insert_checkout(
        &self,
        record: &CheckoutRecord,
        exclusive: bool,
    ) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;

        let affected = if exclusive {
            conn.execute(
                "INSERT INTO dataset_checkouts (dataset_id, client_token, checkout_time)
                 SELECT ?1, ?2, ?3
                 WHERE NOT EXISTS (
                     SELECT 1 FROM dataset_checkouts WHERE dataset_id = ?1
                 )",
                params![
                    record.dataset_id,
                    record.client_token,
                    record.checkout_time_ms
                ],
            )?
        } else {
            conn.execute(
                "INSERT INTO dataset_checkouts (dataset_id, client_token, checkout_time)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.dataset_id,
                    record.client_token,
                    record.checkout_time_ms
                ],
            )?
        };

        Ok(affected > 0)
    }

    pub fn is_checked_out(&self, dataset_id: &str) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM dataset_checkouts WHERE dataset_id = ?1)",
            params![dataset_id],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    pub fn is_checked_out_by_client(
        &self,
        dataset_id: &str,
        client_token: &str,
    ) -> Result<bool, DirectoryError> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM dataset_checkouts
                WHERE dataset_id = ?1 AND client_token = ?2
            )",
            params![dataset_id, client_token],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    pub fn checkouts(&self, dataset_id: &str) -> Result<Vec<CheckoutRecord>, DirectoryError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT dataset_id, client_token, checkout_time
             FROM dataset_checkouts
             WHERE dataset_id = ?1
             ORDER BY checkout_time",
        )?;
        let rows = stmt.query_map(params![dataset_id], |row| {
            Ok(CheckoutRecord {
                dataset_id: row.get(0)?,
                client_token: row.get(1)?,
                checkout_time_ms: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        name: row.get(0)?,
        gossip_addr: row.get(1)?,
        public_id: row.get(2)?,
        https_addr: row.get(3)?,
        port: row.get(4)?,
        boot_time_ms: row.get(5)?,
    })
}

/// Durable tier of the membership registry.
pub struct NodeStore {
    db: Arc<DirectoryDb>,
}

impl NodeStore {
    pub fn new(db: Arc<DirectoryDb>) -> Self {
        Self { db }
    }
}

impl RegistryStore<Node> for NodeStore {
    fn get(&self, key: &str) -> Result<Option<Node>, DirectoryError> {
        self.db.select_node(key)
    }

    fn insert(&self, _key: &str, value: &Node) -> Result<(), DirectoryError> {
        self.db.upsert_node(value)
    }

    fn remove(&self, key: &str) -> Result<bool, DirectoryError> {
        self.db.delete_node(key)
    }

    fn exists(&self, key: &str) -> Result<bool, DirectoryError> {
        self.db.node_exists(key)
    }

    fn load_all(&self) -> Result<Vec<(String, Node)>, DirectoryError> {
        Ok(self
            .db
            .all_nodes()?
            .into_iter()
            .map(|node| (node.name.clone(), node))
            .collect())
    }
}

/// Durable tier of the dataset lookup registry. Values are owning node
/// names.
pub struct LookupStore {
    db: Arc<DirectoryDb>,
}

impl LookupStore {
    pub fn new(db: Arc<DirectoryDb>) -> Self {
        Self { db }
    }
}

impl RegistryStore<String> for LookupStore {
    fn get(&self, key: &str) -> Result<Option<String>, DirectoryError> {
        self.db.select_lookup_entry(key)
    }

    fn insert(&self, key: &str, value: &String) -> Result<(), DirectoryError> {
        self.db.upsert_lookup_entry(key, value)
    }

    fn remove(&self, key: &str) -> Result<bool, DirectoryError> {
        self.db.delete_lookup_entry(key)
    }

    fn exists(&self, key: &str) -> Result<bool, DirectoryError> {
        self.db.lookup_entry_exists(key)
    }

    fn load_all(&self) -> Result<Vec<(String, String)>, DirectoryError> {
        self.db.all_lookup_entries()
    }
}

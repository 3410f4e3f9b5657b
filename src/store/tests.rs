//! Persistent Store Tests
//!
//! Runs against throwaway SQLite files. Covers upsert semantics on the
//! node table, last-writer-wins on the lookup table, and the conditional
//! checkout insert that arbitrates the exclusivity race.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::checkout::types::CheckoutRecord;
    use crate::membership::types::Node;
    use crate::store::sqlite::DirectoryDb;

    fn test_db() -> (TempDir, Arc<DirectoryDb>) {
        let dir = TempDir::new().expect("tempdir");
        let db = DirectoryDb::open(&dir.path().join("directory.db")).expect("open db");
        (dir, Arc::new(db))
    }

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            gossip_addr: "127.0.0.1:5000".to_string(),
            public_id: vec![1, 2, 3],
            https_addr: "127.0.0.1:6000".to_string(),
            port: 5000,
            boot_time_ms: 1_700_000_000_000,
        }
    }

    // ============================================================
    // NODE TABLE
    // ============================================================

    #[test]
    fn test_node_roundtrip() {
        let (_dir, db) = test_db();
        let original = node("node-a");

        db.upsert_node(&original).unwrap();

        let loaded = db.select_node("node-a").unwrap().expect("node present");
        assert_eq!(loaded, original);
        assert!(db.node_exists("node-a").unwrap());
        assert!(!db.node_exists("node-b").unwrap());
    }

    #[test]
    fn test_node_upsert_overwrites() {
        let (_dir, db) = test_db();

        db.upsert_node(&node("node-a")).unwrap();

        let mut updated = node("node-a");
        updated.gossip_addr = "10.0.0.1:5050".to_string();
        updated.boot_time_ms = 1_700_000_999_000;
        db.upsert_node(&updated).unwrap();

        // Exactly one record, carrying the latest field values.
        assert_eq!(db.all_nodes().unwrap().len(), 1);
        let loaded = db.select_node("node-a").unwrap().unwrap();
        assert_eq!(loaded.gossip_addr, "10.0.0.1:5050");
        assert_eq!(loaded.boot_time_ms, 1_700_000_999_000);
    }

    #[test]
    fn test_node_delete_reports_affected_rows() {
        let (_dir, db) = test_db();
        db.upsert_node(&node("node-a")).unwrap();

        assert!(db.delete_node("node-a").unwrap());
        assert!(!db.delete_node("node-a").unwrap(), "second delete affects nothing");
        assert!(db.select_node("node-a").unwrap().is_none());
    }

    // ============================================================
    // LOOKUP TABLE
    // ============================================================

    #[test]
    fn test_lookup_last_writer_wins() {
        let (_dir, db) = test_db();

        db.upsert_lookup_entry("ds-1", "node-a").unwrap();
        db.upsert_lookup_entry("ds-1", "node-b").unwrap();

        assert_eq!(
            db.select_lookup_entry("ds-1").unwrap(),
            Some("node-b".to_string())
        );
        assert_eq!(db.dataset_identifiers().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_identifiers_for_node() {
        let (_dir, db) = test_db();

        db.upsert_lookup_entry("ds-1", "node-a").unwrap();
        db.upsert_lookup_entry("ds-2", "node-a").unwrap();
        db.upsert_lookup_entry("ds-3", "node-b").unwrap();

        let mut for_a = db.dataset_identifiers_for_node("node-a").unwrap();
        for_a.sort();
        assert_eq!(for_a, vec!["ds-1", "ds-2"]);

        assert_eq!(db.dataset_identifiers_for_node("node-b").unwrap(), vec!["ds-3"]);
        assert!(db.dataset_identifiers_for_node("node-c").unwrap().is_empty());
    }

    // ============================================================
    // CHECKOUT TABLE
    // ============================================================

    #[test]
    fn test_exclusive_checkout_insert() {
        let (_dir, db) = test_db();
        let first = CheckoutRecord {
            dataset_id: "ds-1".into(),
            client_token: "client-x".into(),
            checkout_time_ms: 100,
        };
        let second = CheckoutRecord {
            dataset_id: "ds-1".into(),
            client_token: "client-y".into(),
            checkout_time_ms: 200,
        };

        assert!(db.insert_checkout(&first, true).unwrap());
        // Conditional insert refuses a second active checkout.
        assert!(!db.insert_checkout(&second, true).unwrap());

        assert!(db.is_checked_out("ds-1").unwrap());
        assert!(db.is_checked_out_by_client("ds-1", "client-x").unwrap());
        assert!(!db.is_checked_out_by_client("ds-1", "client-y").unwrap());
    }

    #[test]
    fn test_multiple_checkout_insert() {
        let (_dir, db) = test_db();
        let first = CheckoutRecord {
            dataset_id: "ds-1".into(),
            client_token: "client-x".into(),
            checkout_time_ms: 100,
        };
        let second = CheckoutRecord {
            dataset_id: "ds-1".into(),
            client_token: "client-y".into(),
            checkout_time_ms: 200,
        };

        assert!(db.insert_checkout(&first, false).unwrap());
        assert!(db.insert_checkout(&second, false).unwrap());

        let audit = db.checkouts("ds-1").unwrap();
        assert_eq!(audit.len(), 2);
        // Ordered by checkout time.
        assert_eq!(audit[0].client_token, "client-x");
        assert_eq!(audit[1].client_token, "client-y");
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("directory.db");

        {
            let db = DirectoryDb::open(&path).unwrap();
            db.upsert_node(&node("node-a")).unwrap();
            db.upsert_lookup_entry("ds-1", "node-a").unwrap();
        }

        let db = DirectoryDb::open(&path).unwrap();
        assert!(db.node_exists("node-a").unwrap());
        assert_eq!(
            db.select_lookup_entry("ds-1").unwrap(),
            Some("node-a".to_string())
        );
    }
}

//! Membership Manager Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::directory::core::MembershipDirectory;
    use crate::error::DirectoryError;
    use crate::membership::manager::MembershipManager;
    use crate::membership::types::Node;
    use crate::store::sqlite::DirectoryDb;

    fn manager() -> (TempDir, MembershipManager) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DirectoryDb::open(&dir.path().join("directory.db")).unwrap());
        (dir, MembershipManager::new(db))
    }

    fn node(name: &str, gossip_addr: &str) -> Node {
        Node {
            name: name.to_string(),
            gossip_addr: gossip_addr.to_string(),
            public_id: vec![9; 32],
            https_addr: "127.0.0.1:6000".to_string(),
            port: 5000,
            boot_time_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_register_and_query() {
        let (_dir, manager) = manager();
        let n = node("node-a", "127.0.0.1:5000");

        manager.add_network_node("node-a", &n).unwrap();

        assert!(manager.network_node_exists("node-a"));
        assert_eq!(manager.network_node("node-a"), Some(n));
        assert!(!manager.network_node_exists("node-b"));
        assert_eq!(manager.network_node("node-b"), None);
    }

    #[test]
    fn test_reregistration_is_upsert() {
        let (_dir, manager) = manager();

        manager
            .add_network_node("node-a", &node("node-a", "127.0.0.1:5000"))
            .unwrap();
        manager
            .add_network_node("node-a", &node("node-a", "10.0.0.1:5050"))
            .unwrap();

        // Exactly one membership record with the latest field values.
        let nodes = manager.network_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes["node-a"].gossip_addr, "10.0.0.1:5050");
    }

    #[test]
    fn test_empty_name_rejected() {
        let (_dir, manager) = manager();
        let err = manager
            .add_network_node("", &node("", "127.0.0.1:5000"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let (_dir, manager) = manager();
        let err = manager
            .add_network_node("node-b", &node("node-a", "127.0.0.1:5000"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[test]
    fn test_eviction() {
        let (_dir, manager) = manager();
        manager
            .add_network_node("node-a", &node("node-a", "127.0.0.1:5000"))
            .unwrap();

        manager.remove_network_node("node-a").unwrap();
        assert!(!manager.network_node_exists("node-a"));

        // Evicting an unknown node reports not-found.
        let err = manager.remove_network_node("node-a").unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[test]
    fn test_registry_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("directory.db");

        {
            let db = Arc::new(DirectoryDb::open(&path).unwrap());
            let manager = MembershipManager::new(db);
            manager
                .add_network_node("node-a", &node("node-a", "127.0.0.1:5000"))
                .unwrap();
        }

        // A fresh manager over the same store sees the node again.
        let db = Arc::new(DirectoryDb::open(&path).unwrap());
        let manager = MembershipManager::new(db);
        assert!(manager.network_node_exists("node-a"));
        assert_eq!(manager.network_nodes().len(), 1);
    }
}

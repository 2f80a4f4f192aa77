//! Integration tests for common Lapse workflows.
//!
//! These tests drive the engine the way a request-handling layer would.

use async_trait::async_trait;
use lapse::is_valid_session_id;
use lapse::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cart {
    items: Vec<String>,
    total_cents: u64,
}

fn props() -> EngineProperties {
    EngineProperties::new()
        .with_age_limit(HOUR)
        .with_purge_interval(Duration::from_secs(60))
}

fn backdate_file(store: &FileStore, id: &str, by: Duration) {
    std::fs::File::options()
        .write(true)
        .open(store.path_for(id))
        .unwrap()
        .set_modified(SystemTime::now() - by)
        .unwrap();
}

/// Mirrors what a session-binding middleware does for one request.
async fn handle_request(engine: &StoreEngine, inbound: Option<String>) -> String {
    let id = match inbound {
        Some(id) if engine.session_exists(&id).await.unwrap() => id,
        _ => engine.new_id(),
    };

    let mut session = engine.get_session(&id).await.unwrap();
    let count: u64 = session.get_as("count").unwrap().unwrap_or(0);
    session.set("count", count + 1).unwrap();
    engine.save_session(&id, &session).await.unwrap();
    id
}

// =============================================================================
// Memory Store Workflows
// =============================================================================

#[tokio::test]
async fn test_request_flow_with_memory_store() {
    let engine = StoreEngine::with_properties(Arc::new(MemoryStore::new()), props()).unwrap();
    engine.start(CancellationToken::new()).await.unwrap();

    let id = handle_request(&engine, None).await;
    let again = handle_request(&engine, Some(id.clone())).await;
    assert_eq!(id, again);

    let session = engine.get_session(&id).await.unwrap();
    assert_eq!(session.get_as::<u64>("count").unwrap(), Some(2));

    // An unknown inbound id gets a fresh session.
    let other = handle_request(&engine, Some("forged".to_string())).await;
    assert_ne!(other, "forged");
    assert!(is_valid_session_id(&other, engine.properties().id_length));

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_typed_session_data() {
    let engine = StoreEngine::new(Arc::new(MemoryStore::new()));
    let cart = Cart {
        items: vec!["book".to_string(), "pen".to_string()],
        total_cents: 1299,
    };

    let mut session = engine.get_session("shopper").await.unwrap();
    session.set("cart", &cart).unwrap();
    engine.save_session("shopper", &session).await.unwrap();

    let session = engine.get_session("shopper").await.unwrap();
    assert_eq!(session.get_as::<Cart>("cart").unwrap(), Some(cart));
}

#[tokio::test]
async fn test_store_contract_scenario() {
    let store = MemoryStore::new();

    assert!(!store.exists("foo").await.unwrap());
    store.set("foo", b"bar".to_vec()).await.unwrap();
    assert!(store.exists("foo").await.unwrap());
    assert_eq!(store.get("foo").await.unwrap(), b"bar".to_vec());
}

#[tokio::test]
async fn test_logout_flow() {
    let engine = StoreEngine::new(Arc::new(MemoryStore::new()));
    let id = engine.new_id();

    let mut session = engine.get_session(&id).await.unwrap();
    session.set("user", "alice").unwrap();
    engine.save_session(&id, &session).await.unwrap();

    session.destroy();
    assert!(session.set("user", "mallory").is_err());
    engine.delete_session(&id).await.unwrap();

    assert!(!engine.session_exists(&id).await.unwrap());
}

// =============================================================================
// File Store Workflows
// =============================================================================

#[tokio::test]
async fn test_request_flow_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::with_dir(dir.path().join("sess")));
    let engine = StoreEngine::with_properties(store.clone(), props()).unwrap();
    engine.start(CancellationToken::new()).await.unwrap();

    let id = handle_request(&engine, None).await;
    assert!(store.path_for(&id).exists());

    handle_request(&engine, Some(id.clone())).await;
    let raw = store.get_string(&id).await.unwrap();
    assert_eq!(raw, r#"{"count":2}"#);

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_file_store_purge_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::with_dir(dir.path()));
    let engine = StoreEngine::with_properties(store.clone(), props()).unwrap();
    engine.start(CancellationToken::new()).await.unwrap();

    engine.get_session("old").await.unwrap();
    engine.get_session("kept").await.unwrap();
    engine.get_session("fresh").await.unwrap();
    backdate_file(&store, "old", 2 * HOUR);
    backdate_file(&store, "kept", 2 * HOUR);

    // Reading slides the expiration window.
    engine.get_session("kept").await.unwrap();

    assert_eq!(engine.purge().await.unwrap(), 1);
    assert!(!engine.session_exists("old").await.unwrap());
    assert!(engine.session_exists("kept").await.unwrap());
    assert!(engine.session_exists("fresh").await.unwrap());

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_long_ids_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::with_dir(dir.path()));
    let engine =
        StoreEngine::with_properties(store.clone(), props().with_id_length(256)).unwrap();
    engine.start(CancellationToken::new()).await.unwrap();

    let id = handle_request(&engine, None).await;
    assert_eq!(id.len(), 256);
    handle_request(&engine, Some(id.clone())).await;

    let session = engine.get_session(&id).await.unwrap();
    assert_eq!(session.get_as::<u64>("count").unwrap(), Some(2));

    let namespaced = engine.properties().session_key(&id);
    store.set_string(&namespaced, "{}").await.unwrap();
    assert_eq!(store.get_string(&namespaced).await.unwrap(), "{}");

    engine.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(
        StoreEngine::with_properties(Arc::new(FileStore::with_dir(dir.path())), props()).unwrap(),
    );
    engine.start(CancellationToken::new()).await.unwrap();

    let ids: Vec<String> = (0..5).map(|_| engine.new_id()).collect();
    for id in &ids {
        engine.get_session(id).await.unwrap();
    }

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let engine = engine.clone();
            tokio::spawn(async move {
                for _ in 0..100 {
                    handle_request(&engine, Some(id.clone())).await;
                    engine.touch_session(&id).await.unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    for id in &ids {
        assert!(engine.session_exists(id).await.unwrap());
        let session = engine.get_session(id).await.unwrap();
        assert_eq!(session.get_as::<u64>("count").unwrap(), Some(100));
    }

    engine.stop().await.unwrap();
}

// =============================================================================
// Native TTL Backends
// =============================================================================

/// Stands in for an external store that expires keys on its own.
#[derive(Default)]
struct NativeTtlStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl Store for NativeTtlStore {
    async fn start(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn stop(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn exists(&self, id: &str) -> SessionResult<bool> {
        Ok(self.data.lock().await.contains_key(id))
    }

    async fn get(&self, id: &str) -> SessionResult<Vec<u8>> {
        self.data
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn set(&self, id: &str, value: Vec<u8>) -> SessionResult<()> {
        self.data.lock().await.insert(id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &str) -> SessionResult<()> {
        self.data.lock().await.remove(id);
        Ok(())
    }

    async fn touch(&self, id: &str) -> SessionResult<()> {
        if self.data.lock().await.contains_key(id) {
            Ok(())
        } else {
            Err(SessionError::NotFound(id.to_string()))
        }
    }

    async fn purge(&self, _max_age: Duration) -> SessionResult<usize> {
        Ok(0)
    }

    fn requires_purge(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn test_native_ttl_backend() {
    let engine = StoreEngine::new(Arc::new(NativeTtlStore::default()));
    engine.start(CancellationToken::new()).await.unwrap();

    assert!(!engine.purge_task_running().await);

    let id = handle_request(&engine, None).await;
    let session = engine.get_session(&id).await.unwrap();
    assert_eq!(session.get_as::<u64>("count").unwrap(), Some(1));

    engine.stop().await.unwrap();
}

#[tokio::test]
async fn test_engine_from_toml_config() {
    let props = EngineProperties::from_toml_str(
        r#"
        age_limit_secs = 7
        purge_interval_secs = 15
        name = "FIRENADOSESSID"
        "#,
    )
    .unwrap();

    let engine = StoreEngine::with_properties(Arc::new(MemoryStore::new()), props).unwrap();

    assert_eq!(engine.properties().name, "FIRENADOSESSID");
    assert_eq!(engine.properties().age_limit, Duration::from_secs(7));
    assert_eq!(engine.properties().session_key("abc"), "lapse:session:abc");
}

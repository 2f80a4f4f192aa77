//! Key/value store contract and its built-in backends.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use std::time::Duration;

pub mod file;
pub mod memory;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

/// Generic key/value store keyed by string identifiers.
///
/// Values are opaque bytes. Every backend tracks an expiry clock per key:
/// [`set`](Store::set) and [`touch`](Store::touch) reset it,
/// [`get`](Store::get) does not. How the clock is kept is backend specific
/// (a timestamp for [`MemoryStore`], the file modification time for
/// [`FileStore`], a native TTL for external services).
///
/// All operations must be safe to call concurrently from many tasks.
///
/// # Examples
///
/// ```
/// use lapse_session::{MemoryStore, Store};
///
/// # async fn example() -> lapse_session::SessionResult<()> {
/// let store = MemoryStore::new();
/// store.set("foo", b"bar".to_vec()).await?;
///
/// assert!(store.exists("foo").await?);
/// assert_eq!(store.get("foo").await?, b"bar".to_vec());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Store: Send + Sync {
    /// Prepare the backend medium.
    ///
    /// Calling it again must not corrupt existing data.
    async fn start(&self) -> SessionResult<()>;

    /// Release backend resources.
    async fn stop(&self) -> SessionResult<()>;

    /// Check whether a key is present.
    async fn exists(&self, id: &str) -> SessionResult<bool>;

    /// Read the raw value for a key.
    ///
    /// Fails with [`SessionError::NotFound`] when the key is absent. Does not
    /// refresh the expiry clock.
    async fn get(&self, id: &str) -> SessionResult<Vec<u8>>;

    /// Create or overwrite a key. Must refresh the expiry clock.
    async fn set(&self, id: &str, value: Vec<u8>) -> SessionResult<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, id: &str) -> SessionResult<()>;

    /// Refresh the expiry clock without touching the value.
    ///
    /// Fails with [`SessionError::NotFound`] when the key is absent, without
    /// creating it.
    async fn touch(&self, id: &str) -> SessionResult<()>;

    /// Remove every entry idle for longer than `max_age`.
    ///
    /// Returns the number of removed entries.
    async fn purge(&self, max_age: Duration) -> SessionResult<usize>;

    /// Whether the engine must call [`purge`](Store::purge) periodically.
    ///
    /// `true` for backends that emulate expiry themselves, `false` for
    /// backends with native TTL support.
    fn requires_purge(&self) -> bool;

    /// Read a value as UTF-8 text.
    async fn get_string(&self, id: &str) -> SessionResult<String> {
        let bytes = self.get(id).await?;
        String::from_utf8(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }

    /// Store a text value.
    async fn set_string(&self, id: &str, value: &str) -> SessionResult<()> {
        self.set(id, value.as_bytes().to_vec()).await
    }
}

//! TTL session storage for Lapse.
//!
//! A [`Store`] is a byte-oriented key/value contract with a per-key expiry
//! clock. [`MemoryStore`] and [`FileStore`] emulate expiry themselves
//! (timestamp bookkeeping and file modification times) and therefore need a
//! periodic purge; a backend with native TTL support reports
//! `requires_purge() == false` and is left alone.
//!
//! [`StoreEngine`] layers the session lifecycle over any store: JSON
//! encoding, ID generation, sliding expiration on read, and the background
//! purge task.
//!
//! # Features
//!
//! - Sliding expiration: every [`StoreEngine::get_session`] touches the entry
//! - Background purge with cooperative cancellation
//! - Memory and filesystem backends, safe under concurrent access
//! - Configuration from code, TOML files or environment variables
//!
//! # Examples
//!
//! ## Memory Store
//!
//! ```
//! use lapse_session::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let props = EngineProperties::new()
//!         .with_age_limit(Duration::from_secs(30 * 60))
//!         .with_purge_interval(Duration::from_secs(120));
//!
//!     let engine = StoreEngine::with_properties(Arc::new(MemoryStore::new()), props)?;
//!     engine.start(CancellationToken::new()).await?;
//!
//!     // Load (or create) a session and store data in it
//!     let id = engine.new_id();
//!     let mut session = engine.get_session(&id).await?;
//!     session.set("user_id", 123)?;
//!     engine.save_session(&id, &session).await?;
//!
//!     // Retrieve it later
//!     let session = engine.get_session(&id).await?;
//!     let user_id: Option<i32> = session.get_as("user_id")?;
//!     assert_eq!(user_id, Some(123));
//!
//!     engine.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## File Store
//!
//! ```no_run
//! use lapse_session::*;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let store = FileStore::new(FileStoreConfig::new("/var/lib/myapp/sessions"));
//!     let engine = StoreEngine::new(Arc::new(store));
//!     engine.start(CancellationToken::new()).await?;
//!
//!     let session = engine.get_session("abc").await?;
//!     engine.save_session("abc", &session).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod id;
pub mod session;
pub mod store;

pub use config::EngineProperties;
pub use encoder::{Encoder, JsonEncoder, PrettyJsonEncoder};
pub use engine::{EngineState, StoreEngine};
pub use error::{SessionError, SessionResult};
pub use id::{generate_session_id, is_valid_session_id};
pub use session::{Session, SessionData};
pub use store::{FileStore, FileStoreConfig, MemoryStore, Store};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineProperties;
    pub use crate::encoder::{Encoder, JsonEncoder};
    pub use crate::engine::{EngineState, StoreEngine};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::session::{Session, SessionData};
    pub use crate::store::{FileStore, FileStoreConfig, MemoryStore, Store};
}

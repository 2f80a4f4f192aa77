//! Session lifecycle engine layered over a [`Store`].

use crate::config::EngineProperties;
use crate::encoder::{Encoder, JsonEncoder};
use crate::error::{SessionError, SessionResult};
use crate::id::generate_session_id;
use crate::session::{Session, SessionData};
use crate::store::Store;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`StoreEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, `start` not called yet
    Unstarted,
    /// Running; the purge task is live if the store needs one
    Started,
    /// Stopped; the engine cannot be started again
    Stopped,
}

struct Lifecycle {
    state: EngineState,
    purge_task: Option<JoinHandle<()>>,
}

/// Turns a raw [`Store`] into a session API.
///
/// The engine encodes session data, generates IDs, implements sliding
/// expiration (every read touches the entry) and, for stores that emulate
/// expiry themselves, runs a background purge every `purge_interval`.
///
/// # Examples
///
/// ```
/// use lapse_session::{MemoryStore, StoreEngine};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> lapse_session::SessionResult<()> {
/// let engine = StoreEngine::new(Arc::new(MemoryStore::new()));
/// engine.start(CancellationToken::new()).await?;
///
/// let id = engine.new_id();
/// let mut session = engine.get_session(&id).await?;
/// session.set("count", 1)?;
/// engine.save_session(&id, &session).await?;
///
/// engine.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct StoreEngine {
    properties: EngineProperties,
    store: Arc<dyn Store>,
    encoder: Arc<dyn Encoder>,
    enabled: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
    stop_signal: CancellationToken,
}

impl StoreEngine {
    /// Create an engine with default properties and the JSON encoder.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::build(store, EngineProperties::default())
    }

    /// Create an engine with custom properties.
    ///
    /// Fails with [`SessionError::Config`] if the properties do not validate.
    pub fn with_properties(
        store: Arc<dyn Store>,
        properties: EngineProperties,
    ) -> SessionResult<Self> {
        properties.validate()?;
        Ok(Self::build(store, properties))
    }

    fn build(store: Arc<dyn Store>, properties: EngineProperties) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(properties.enabled)),
            properties,
            store,
            encoder: Arc::new(JsonEncoder),
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Unstarted,
                purge_task: None,
            }),
            stop_signal: CancellationToken::new(),
        }
    }

    /// Replace the encoder.
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Engine configuration.
    pub fn properties(&self) -> &EngineProperties {
        &self.properties
    }

    /// The wrapped store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The session encoder.
    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    /// Whether session operations are currently allowed.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turn session operations on or off at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> EngineState {
        self.lifecycle.lock().await.state
    }

    /// Whether the background purge task is alive.
    pub async fn purge_task_running(&self) -> bool {
        self.lifecycle
            .lock()
            .await
            .purge_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Start the engine.
    ///
    /// Legal once per engine; any later call fails with
    /// [`SessionError::AlreadyStarted`]. When the store requires manual
    /// expiry a background task purges it every `purge_interval` until the
    /// engine stops or `shutdown` is cancelled. The store is started last;
    /// if that fails the purge task is cancelled and the error returned.
    pub async fn start(&self, shutdown: CancellationToken) -> SessionResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != EngineState::Unstarted {
            return Err(SessionError::AlreadyStarted);
        }
        lifecycle.state = EngineState::Started;

        if self.store.requires_purge() {
            lifecycle.purge_task = Some(self.spawn_purge_task(shutdown));
        }

        if let Err(e) = self.store.start().await {
            error!(error = %e, "Failed to start session store");
            lifecycle.state = EngineState::Stopped;
            self.stop_signal.cancel();
            if let Some(task) = lifecycle.purge_task.take() {
                let _ = task.await;
            }
            return Err(e);
        }

        info!(
            name = %self.properties.name,
            encoder = self.encoder.name(),
            age_limit = ?self.properties.age_limit,
            periodic_purge = lifecycle.purge_task.is_some(),
            "Session engine started"
        );
        Ok(())
    }

    /// Stop the engine.
    ///
    /// Signals the purge task, waits for it to exit and stops the store.
    /// Calling it again only repeats the store's `stop`.
    pub async fn stop(&self) -> SessionResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            EngineState::Unstarted => return Err(SessionError::NotStarted),
            EngineState::Started => {
                lifecycle.state = EngineState::Stopped;
                self.stop_signal.cancel();
                if let Some(task) = lifecycle.purge_task.take()
                    && let Err(e) = task.await
                {
                    warn!(error = %e, "Purge task ended abnormally");
                }
                info!(name = %self.properties.name, "Session engine stopped");
            }
            EngineState::Stopped => {}
        }
        drop(lifecycle);

        self.store.stop().await
    }

    fn spawn_purge_task(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = self.store.clone();
        let enabled = self.enabled.clone();
        let stop = self.stop_signal.clone();
        let age_limit = self.properties.age_limit;
        let period = self.properties.purge_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match purge_store(store.as_ref(), &enabled, age_limit).await {
                            Ok(0) => {}
                            Ok(removed) => info!(removed, "Purged expired sessions"),
                            Err(SessionError::Disabled) => {
                                debug!("Skipping purge, engine disabled")
                            }
                            Err(e) => error!(error = %e, "Periodic purge failed"),
                        }
                    }
                }
            }

            debug!("Periodic purge stopped");
        })
    }

    fn check_enabled(&self) -> SessionResult<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(SessionError::Disabled)
        }
    }

    fn check_id(&self, id: &str) -> SessionResult<()> {
        self.check_enabled()?;
        if id.is_empty() {
            return Err(SessionError::InvalidArgument(
                "session id is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a new session ID of `id_length` characters.
    pub fn new_id(&self) -> String {
        generate_session_id(self.properties.id_length)
    }

    /// Remove sessions idle for longer than `age_limit`.
    ///
    /// Returns the number of removed sessions.
    pub async fn purge(&self) -> SessionResult<usize> {
        purge_store(self.store.as_ref(), &self.enabled, self.properties.age_limit).await
    }

    /// Load a session, creating an empty one if the ID is unknown.
    ///
    /// Every read touches the entry, so a session stays alive as long as it
    /// keeps being read.
    pub async fn get_session(&self, id: &str) -> SessionResult<Session> {
        self.check_id(id)?;

        if !self.store.exists(id).await? {
            let empty = self.encoder.encode(&SessionData::new())?;
            self.store.set(id, empty).await?;
            debug!(session = %id, "Created session");
        }

        let bytes = self.store.get(id).await?;
        self.store.touch(id).await?;
        let data = self.encoder.decode(&bytes)?;

        Ok(Session::with_data(id, data))
    }

    /// Persist a session's data. The store refreshes the expiry on write.
    pub async fn save_session(&self, id: &str, session: &Session) -> SessionResult<()> {
        self.check_id(id)?;

        let bytes = self.encoder.encode(&session.persisted_data())?;
        self.store.set(id, bytes).await?;
        debug!(session = %id, changed = session.is_changed(), "Saved session");
        Ok(())
    }

    /// Check whether a session exists.
    pub async fn session_exists(&self, id: &str) -> SessionResult<bool> {
        self.check_enabled()?;
        self.store.exists(id).await
    }

    /// Remove a session from the store.
    pub async fn delete_session(&self, id: &str) -> SessionResult<()> {
        self.check_id(id)?;
        self.store.delete(id).await?;
        debug!(session = %id, "Deleted session");
        Ok(())
    }

    /// Refresh a session's expiry without reading it.
    pub async fn touch_session(&self, id: &str) -> SessionResult<()> {
        self.check_id(id)?;
        self.store.touch(id).await
    }
}

impl Drop for StoreEngine {
    fn drop(&mut self) {
        self.stop_signal.cancel();
    }
}

impl std::fmt::Debug for StoreEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEngine")
            .field("properties", &self.properties)
            .field("encoder", &self.encoder.name())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

async fn purge_store(
    store: &dyn Store,
    enabled: &AtomicBool,
    age_limit: Duration,
) -> SessionResult<usize> {
    if !enabled.load(Ordering::SeqCst) {
        return Err(SessionError::Disabled);
    }
    store.purge(age_limit).await
}

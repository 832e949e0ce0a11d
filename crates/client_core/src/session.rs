use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use shared::domain::Role;
use storage::Storage;

/// The live authentication state: an opaque bearer token and the role it was
/// issued for. Exactly one session is live per client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: Role,
}

/// Backing store for the session so it survives process restarts. Injectable
/// so tests can run against an in-memory store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl SessionStore for Storage {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.load_session().await?.map(|persisted| Session {
            token: persisted.token,
            role: persisted.role,
        }))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.save_session(&session.token, session.role).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_session().await
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.lock().await = None;
        Ok(())
    }
}

/// Explicit session context passed to the guard and to every remote-call
/// site. The current session is cached in memory so admission checks stay
/// synchronous; the injected store keeps it durable.
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Rehydrates the in-memory session from the store, e.g. at process
    /// start.
    pub async fn restore(&self) -> Result<()> {
        let session = self.store.load().await?;
        *self.current.write().expect("session lock poisoned") = session;
        Ok(())
    }

    /// Persists and activates a freshly authenticated session, replacing any
    /// previous one.
    pub async fn establish(&self, session: Session) -> Result<()> {
        self.store.save(&session).await?;
        info!(role = %session.role, "session established");
        *self.current.write().expect("session lock poisoned") = Some(session);
        Ok(())
    }

    /// Clears token and role together. Calling this while already logged out
    /// is a no-op.
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        let previous = self
            .current
            .write()
            .expect("session lock poisoned")
            .take();
        if previous.is_some() {
            info!("session cleared");
        }
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().expect("session lock poisoned").clone()
    }
}

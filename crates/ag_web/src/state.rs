use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use ag_core::{CredentialStore, Error, PlanType, Result};
use ag_pipeline::{GenerationSession, Pipeline};
use ag_publish::WordPressApi;
use crate::relay::RelayConfig;

/// Sessions untouched for this long are dropped on the next `open_session`.
pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

struct SessionEntry {
    session: Arc<GenerationSession>,
    last_used: Instant,
}

pub struct AppState {
    pub pipeline: Pipeline,
    pub credentials: Option<Arc<dyn CredentialStore>>,
    pub relay: RelayConfig,
    pub wordpress: WordPressApi,
    session_ttl: Duration,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            credentials: None,
            relay: RelayConfig::default(),
            wordpress: WordPressApi::default(),
            session_ttl: DEFAULT_SESSION_IDLE_TTL,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub async fn open_session(&self, plan: PlanType, user_id: Option<String>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(self.pipeline.session(plan, user_id));
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used.elapsed() < self.session_ttl);
        if sessions.len() < before {
            tracing::info!(evicted = before - sessions.len(), "idle sessions dropped");
        }

        sessions.insert(id.clone(), SessionEntry { session, last_used: Instant::now() });
        tracing::info!(session = %id, plan = %plan, "session opened");
        id
    }

    pub async fn session(&self, id: &str) -> Result<Arc<GenerationSession>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id).ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        entry.last_used = Instant::now();
        Ok(Arc::clone(&entry.session))
    }

    /// Forget a session. Its image tasks stop once no request holds it.
    pub async fn close_session(&self, id: &str) -> Result<()> {
        match self.sessions.write().await.remove(id) {
            Some(_) => {
                tracing::info!(session = %id, "session closed");
                Ok(())
            }
            None => Err(Error::NotFound(format!("session {}", id))),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

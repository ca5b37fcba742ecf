//! Session orchestrator: the single entry point collaborators talk to.
//!
//! Owns the shared ledger, the suggestion engine, the event bus, and the
//! registry of open sessions. Every dependency is injected here and
//! passed down into sessions explicitly. Reconnection policy lives with
//! the caller: a closed session is gone, open a new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::channel::ShellConnector;
use crate::config::Settings;
use crate::domain::{AuthMethod, SessionEvent, SessionId, SessionProfile};
use crate::error::SessionError;
use crate::events::EventBus;
use crate::intel::Suggestions;
use crate::ledger::{LedgerDb, LedgerWriter};
use crate::session::{CredentialPrompt, Session, SessionContext};

type SessionMap = Arc<Mutex<HashMap<SessionId, Session>>>;

/// Composes sessions, the ledger, and the suggestion engine.
/// Must be constructed inside a tokio runtime (it spawns the ledger
/// writer and registry maintenance tasks).
pub struct Orchestrator {
    ctx: SessionContext,
    db: LedgerDb,
    suggestions: Suggestions,
    sessions: SessionMap,
    events: EventBus,
    settings: Settings,
}

impl Orchestrator {
    /// Open the ledger at the configured path and assemble the core
    pub fn new(
        settings: Settings,
        connector: Arc<dyn ShellConnector>,
        credentials: Arc<dyn CredentialPrompt>,
    ) -> Result<Self> {
        let db = LedgerDb::open(&settings.ledger_db_path())?;
        Ok(Self::with_ledger(settings, connector, credentials, db))
    }

    /// Assemble the core over an existing ledger (tests, in-memory use)
    pub fn with_ledger(
        settings: Settings,
        connector: Arc<dyn ShellConnector>,
        credentials: Arc<dyn CredentialPrompt>,
        db: LedgerDb,
    ) -> Self {
        let events = EventBus::new();
        let ledger = LedgerWriter::spawn(db.clone());
        let suggestions = Suggestions::new(db.clone());
        let sessions: SessionMap = Arc::new(Mutex::new(HashMap::new()));

        spawn_registry_pruner(&events, Arc::clone(&sessions));

        let ctx = SessionContext {
            settings: settings.clone(),
            connector,
            credentials,
            ledger,
            events: events.clone(),
        };

        Self {
            ctx,
            db,
            suggestions,
            sessions,
            events,
            settings,
        }
    }

    /// Connect a new session and register it
    pub async fn open_session(
        &self,
        profile: SessionProfile,
        auth: AuthMethod,
    ) -> Result<SessionId, SessionError> {
        let session = Session::open(&self.ctx, profile, auth).await?;
        let id = session.id();
        self.sessions
            .lock()
            .expect("Session registry lock poisoned")
            .insert(id, session);
        Ok(id)
    }

    /// Handle for an open session, if it is still registered
    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.sessions
            .lock()
            .expect("Session registry lock poisoned")
            .get(id)
            .cloned()
    }

    /// IDs of all registered sessions
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions
            .lock()
            .expect("Session registry lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Close and deregister one session. Returns false when unknown.
    pub async fn close_session(&self, id: &SessionId) -> bool {
        let session = {
            self.sessions
                .lock()
                .expect("Session registry lock poisoned")
                .remove(id)
        };
        match session {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every open session
    pub async fn close_all(&self) {
        let drained: Vec<Session> = {
            let mut map = self
                .sessions
                .lock()
                .expect("Session registry lock poisoned");
            map.drain().map(|(_, s)| s).collect()
        };
        for session in drained {
            session.close().await;
        }
    }

    /// Read-side suggestion engine over the shared ledger
    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    /// Subscribe to session lifecycle and command events
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Purge ledger rows unused past the configured retention window
    pub fn cleanup_ledger(&self) -> Result<usize> {
        self.db.cleanup(self.settings.retention_days)
    }

    /// Wait until queued ledger writes are durable (shutdown aid)
    pub async fn flush_ledger(&self) {
        self.ctx.ledger.flush().await;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

/// Drop closed sessions out of the registry as their engines announce
/// termination; a dead handle should not linger behind `session()`.
fn spawn_registry_pruner(events: &EventBus, sessions: SessionMap) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let SessionEvent::Closed { id, reason } = event {
                debug!("Pruning session {id} from registry ({reason:?})");
                sessions
                    .lock()
                    .expect("Session registry lock poisoned")
                    .remove(&id);
            }
        }
    });
}

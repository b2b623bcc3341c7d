use dashmap::DashMap;
use site_chat::ai::ChatTransport;
use site_chat::fetcher::PageSource;
use site_chat::session::ChatSession;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

/// One browser's session. Operations on it run one at a time.
pub type SharedSession = Arc<Mutex<ChatSession>>;

/// Session handle attached to each request by the session middleware.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub session: SharedSession,
}

pub struct SessionEntry {
    pub session: SharedSession,
    pub last_used: Instant,
}

impl SessionEntry {
    fn expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_used) >= idle_timeout
    }
}

// Sessions are keyed by the id stored in the session cookie. Nothing is
// shared between them except the outbound clients.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<DashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
    transport: Arc<dyn ChatTransport>,
    pages: Arc<dyn PageSource>,
}

impl AppState {
    pub fn new(transport: Arc<dyn ChatTransport>, pages: Arc<dyn PageSource>) -> Self {
        AppState {
            sessions: Arc::new(DashMap::new()),
            idle_timeout: DEFAULT_SESSION_IDLE,
            transport,
            pages,
        }
    }

    /// Sessions unused for this long are dropped.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Look up a live session and mark it used. An expired one is removed.
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;
        if self
            .sessions
            .remove_if(id, |_, entry| entry.expired(now, idle_timeout))
            .is_some()
        {
            debug!(session = %id, "session expired");
            return None;
        }

        let mut entry = self.sessions.get_mut(id)?;
        entry.last_used = now;
        Some(SessionHandle {
            id: *id,
            session: Arc::clone(&entry.session),
        })
    }

    /// Start a session, first dropping every idle one.
    pub fn create(&self) -> SessionHandle {
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;
        self.sessions.retain(|_, entry| !entry.expired(now, idle_timeout));

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ChatSession::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.pages),
        )));
        self.sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_used: now,
            },
        );
        SessionHandle { id, session }
    }

    pub fn remove(&self, id: &Uuid) {
        self.sessions.remove(id);
    }
}

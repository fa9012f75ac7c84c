use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use pdf_chat_core::{AgentFactory, DocumentPipeline, Session};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "pdf_chat_session";

/// Shared server state. Each browser session owns its own [`Session`]; the
/// mutex serialises interactions within one session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: DocumentPipeline,
    factory: AgentFactory,
    sessions: DashMap<Uuid, SessionSlot>,
}

struct SessionSlot {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

impl SessionSlot {
    fn touch(&mut self) -> Arc<Mutex<Session>> {
        self.last_seen = Instant::now();
        Arc::clone(&self.session)
    }
}

impl AppState {
    pub fn new(pipeline: DocumentPipeline, factory: AgentFactory) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                factory,
                sessions: DashMap::new(),
            }),
        }
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.inner.pipeline
    }

    pub fn factory(&self) -> &AgentFactory {
        &self.inner.factory
    }

    /// The session for `id`, created on first use.
    pub fn session(&self, id: Uuid) -> Arc<Mutex<Session>> {
        self.inner
            .sessions
            .entry(id)
            .or_insert_with(|| SessionSlot {
                session: Arc::default(),
                last_seen: Instant::now(),
            })
            .touch()
    }

    /// The session for `id` if one exists. Never creates one.
    pub fn existing_session(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.inner
            .sessions
            .get_mut(&id)
            .map(|mut slot| slot.touch())
    }

    /// Drops sessions not seen for at least `ttl`; returns how many went.
    /// A session that is mid-request is kept.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.inner.sessions.len();
        self.inner.sessions.retain(|_, slot| {
            slot.last_seen.elapsed() < ttl || slot.session.try_lock().is_err()
        });
        before.saturating_sub(self.inner.sessions.len())
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

/// The session id carried by the request cookie, or a new one.
pub fn session_id(headers: &HeaderMap) -> Uuid {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderValue};
use server_api::Session;
use shared::domain::SessionId;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "dotacao_session";

/// Server-side sessions keyed by the id carried in [`SESSION_COOKIE`].
///
/// Only logged-in sessions are stored. Anonymous visitors hold an id that maps
/// to nothing, so requests without a login never grow the map.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

/// The session a request belongs to. `fresh` ids still need a `Set-Cookie`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: SessionId,
    pub fresh: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuses the cookie id when there is one, otherwise mints an id without storing anything.
    pub fn identify(&self, headers: &HeaderMap) -> SessionHandle {
        match session_id_from_headers(headers) {
            Some(id) => SessionHandle { id, fresh: false },
            None => SessionHandle::mint(),
        }
    }

    pub async fn get(&self, id: SessionId) -> Session {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores `session` under a new id and forgets `previous`, so a login never
    /// keeps an id the client chose before authenticating.
    pub async fn promote(&self, previous: SessionId, session: Session) -> SessionHandle {
        let handle = SessionHandle::mint();
        let mut sessions = self.sessions.write().await;
        sessions.remove(&previous);
        sessions.insert(handle.id, session);
        handle
    }

    pub async fn remove(&self, id: SessionId) {
        self.sessions.write().await.remove(&id);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl SessionHandle {
    fn mint() -> Self {
        Self {
            id: SessionId::new_random(),
            fresh: true,
        }
    }
}

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

pub fn session_cookie(id: SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

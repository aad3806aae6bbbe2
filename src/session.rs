//! Login Sessions
//!
//! Maps opaque bearer tokens to the InfluxDB credentials they were issued
//! for and to one [`QueryBuilder`] per session. Sessions live in process
//! memory only and expire after a fixed lifetime; expired entries are
//! dropped when they are next touched or when a new session is opened.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::flux::QueryBuilder;
use crate::influx::Credentials;

/// State held for one logged-in client
#[derive(Debug, Clone)]
pub struct Session {
    pub credentials: Credentials,
    pub builder: QueryBuilder,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Newly issued session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// In-memory session registry
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    /// Create a store issuing sessions valid for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(1)),
        }
    }

    /// Open a session for already validated credentials
    ///
    /// Expired sessions are dropped while the write lock is held.
    pub async fn create(&self, credentials: Credentials) -> IssuedToken {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;

        let session = Session {
            credentials,
            builder: QueryBuilder::new(),
            expires_at,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, existing| !existing.is_expired(Utc::now()));
        if sessions.len() < before {
            tracing::debug!(purged = before - sessions.len(), "expired sessions purged");
        }

        sessions.insert(token.clone(), session);
        tracing::info!(sessions = sessions.len(), "session opened");

        IssuedToken { token, expires_at }
    }

    /// Credentials of a live session
    pub async fn credentials(&self, token: &str) -> Result<Credentials, SessionError> {
        self.with_session(token, |session| session.credentials.clone())
            .await
    }

    /// Run `f` against the session's builder under the write lock
    pub async fn with_builder<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut QueryBuilder) -> R,
    ) -> Result<R, SessionError> {
        self.with_session(token, |session| f(&mut session.builder)).await
    }

    /// Close a session; returns whether it existed
    pub async fn remove(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            tracing::info!("session closed");
        }
        removed
    }

    /// Drop all expired sessions, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    /// Number of stored sessions, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn with_session<R>(
        &self,
        token: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, SessionError> {
        let mut sessions = self.sessions.write().await;

        let expired = sessions
            .get(token)
            .map(|session| session.is_expired(Utc::now()))
            .ok_or(SessionError::Unknown)?;

        if expired {
            sessions.remove(token);
            tracing::debug!("session expired");
            return Err(SessionError::Expired);
        }

        let session = sessions.get_mut(token).ok_or(SessionError::Unknown)?;
        Ok(f(session))
    }
}

/// Session lookup failures
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown session token")]
    Unknown,

    #[error("Session expired")]
    Expired,
}

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AuthenticationError, Credentials};

/// An authentication artifact cached for one user.
pub trait Session: Clone + Send + Sync {
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }
}

/// Identifies one cached session of a user. Every session stored in a slot
/// gets a new generation, so a caller can tell whether the session it used
/// is still the cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGeneration(u64);

struct SlotState<S> {
    session: Option<S>,
    generation: u64,
}

impl<S> SlotState<S> {
    fn store(&mut self, session: S) -> SessionGeneration {
        self.generation += 1;
        self.session = Some(session);
        SessionGeneration(self.generation)
    }
}

type Slot<S> = Arc<Mutex<SlotState<S>>>;

/// Session cache of one authenticator, keyed by user identifier.
///
/// Each identifier owns its own slot lock. While a login is in flight the
/// lock is held, so concurrent requests for the same user wait for that
/// login instead of starting their own, and a clear cannot interleave with
/// it. Different users never block each other.
pub struct SessionManager<S: Session> {
    slots: Mutex<HashMap<String, Slot<S>>>,
}

impl<S: Session> SessionManager<S> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    async fn slot(&self, identifier: &str) -> Slot<S> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(identifier.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SlotState {
                    session: None,
                    generation: 0,
                }))
            })
            .clone()
    }

    /// Returns the cached session of the user, or runs `init` to obtain and
    /// cache a new one. Expired sessions count as absent.
    pub async fn find_or_initialize<F, Fut>(
        &self,
        credentials: &Credentials,
        init: F,
    ) -> Result<(S, SessionGeneration), AuthenticationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, AuthenticationError>>,
    {
        let slot = self.slot(&credentials.identifier).await;
        let mut state = slot.lock().await;

        if let Some(ref cached) = state.session {
            if !cached.is_expired() {
                return Ok((cached.clone(), SessionGeneration(state.generation)));
            }
            log::debug!(
                "Session of user '{}' has expired, obtaining a new one",
                credentials.identifier
            );
        }

        let fresh = init().await?;
        let generation = state.store(fresh.clone());
        Ok((fresh, generation))
    }

    pub async fn clear(&self, credentials: &Credentials) {
        let slot = self.slot(&credentials.identifier).await;
        slot.lock().await.session.take();
    }

    /// Drops the cached session only if it is still the given generation.
    /// A session another request has already renewed is kept. Returns
    /// whether the session was dropped.
    pub async fn invalidate(&self, credentials: &Credentials, generation: SessionGeneration) -> bool {
        let slot = self.slot(&credentials.identifier).await;
        let mut state = slot.lock().await;
        if state.session.is_some() && SessionGeneration(state.generation) == generation {
            state.session = None;
            return true;
        }
        false
    }

    pub async fn get(&self, credentials: &Credentials) -> Option<S> {
        let slot = self.slot(&credentials.identifier).await;
        let state = slot.lock().await;
        state.session.clone()
    }

    /// Puts a session into the cache without logging in.
    pub async fn insert(&self, credentials: &Credentials, session: S) -> SessionGeneration {
        let slot = self.slot(&credentials.identifier).await;
        let mut state = slot.lock().await;
        state.store(session)
    }
}

impl<S: Session> Default for SessionManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

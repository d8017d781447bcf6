//! TokenVault: opaque session tokens, one live session per actor.

use std::sync::Arc;

use transitgate_auth::{Actor, Session, SessionToken};
use transitgate_core::{ActorId, Clock, DomainError, DomainResult};

use crate::store::Store;

#[derive(Clone)]
pub struct TokenVault<S> {
    store: S,
    clock: Arc<dyn Clock>,
    cookie_name: String,
}

impl<S: Store> TokenVault<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            cookie_name: cookie_name.into(),
        }
    }

    /// Issue a fresh token for `actor_id`, replacing any existing session.
    ///
    /// Only the token's hash is stored; the raw token is returned once.
    pub fn issue(&self, actor_id: ActorId) -> DomainResult<SessionToken> {
        let token = SessionToken::generate();
        let session = Session::new(token.hash(), actor_id, self.clock.now());

        let revoked = self.store.transact(|state| {
            state.actor(actor_id)?;
            let revoked = state.revoke_sessions(actor_id);
            state.sessions.insert(session.token_hash.clone(), session);
            Ok(revoked)
        })?;

        tracing::info!(%actor_id, revoked, "session issued");
        Ok(token)
    }

    /// Resolve a presented token to its actor and session.
    ///
    /// `last_used_at` is refreshed best-effort in place: a failed refresh
    /// does not fail the resolution.
    pub fn resolve(&self, token: &SessionToken) -> DomainResult<(Actor, Session)> {
        let hash = token.hash();
        let (actor, mut session) = self.store.read(|state| {
            let session = state
                .sessions
                .get(&hash)
                .cloned()
                .ok_or_else(|| DomainError::unauthorized("invalid or expired session"))?;
            let actor = state
                .actors
                .get(&session.actor_id)
                .cloned()
                .ok_or_else(|| DomainError::unauthorized("session has no actor"))?;
            Ok((actor, session))
        })?;

        let now = self.clock.now();
        let refreshed = self.store.update(|state| {
            if let Some(s) = state.sessions.get_mut(&hash) {
                s.last_used_at = now;
            }
        });
        match refreshed {
            Ok(()) => session.last_used_at = now,
            Err(e) => tracing::warn!(error = %e, actor_id = %actor.id, "failed to refresh session"),
        }

        Ok((actor, session))
    }

    /// Delete every session of `actor_id`. Idempotent.
    pub fn revoke(&self, actor_id: ActorId) -> DomainResult<usize> {
        let revoked = self
            .store
            .update(|state| state.revoke_sessions(actor_id))?;
        if revoked > 0 {
            tracing::info!(%actor_id, revoked, "sessions revoked");
        }
        Ok(revoked)
    }

    /// Delete the session a token refers to, if any. Idempotent.
    pub fn revoke_token(&self, token: &SessionToken) -> DomainResult<bool> {
        let hash = token.hash();
        self.store
            .update(|state| state.sessions.remove(&hash).is_some())
    }

    // ── cookie transport ────────────────────────────────────────────────────

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// `Set-Cookie` value delivering `token` to the client.
    pub fn session_cookie(&self, token: &SessionToken) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name,
            token.expose()
        )
    }

    /// `Set-Cookie` value clearing the session cookie.
    pub fn cleared_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            self.cookie_name
        )
    }

    /// Extract the session token from a `Cookie` request header.
    pub fn token_from_cookie_header(&self, header: &str) -> Option<SessionToken> {
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.cookie_name && !value.is_empty())
            .map(|(_, value)| SessionToken::from_presented(value))
    }

    /// Resolve the actor behind a `Cookie` header (`Unauthorized` if absent).
    pub fn authenticate(&self, cookie_header: Option<&str>) -> DomainResult<(Actor, Session)> {
        let token = cookie_header
            .and_then(|h| self.token_from_cookie_header(h))
            .ok_or_else(|| DomainError::unauthorized("no session"))?;
        self.resolve(&token)
    }
}

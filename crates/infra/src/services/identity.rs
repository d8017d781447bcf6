//! Sign-up, login/logout and self-service account changes.

use std::sync::Arc;

use transitgate_auth::actor::{normalize_username, validate_password};
use transitgate_auth::{Actor, PasswordHash, Profile, SessionToken, generate_scan_id};
use transitgate_core::{ActorId, Clock, DomainError, DomainResult};

use super::vault::TokenVault;
use crate::store::{Store, StoreState};

const BAD_CREDENTIALS: &str = "invalid username or password";

#[derive(Clone)]
pub struct Identity<S> {
    store: S,
    clock: Arc<dyn Clock>,
    vault: TokenVault<S>,
}

impl<S: Store + Clone> Identity<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, vault: TokenVault<S>) -> Self {
        Self {
            store,
            clock,
            vault,
        }
    }

    /// Register a rider on the default role with a fresh scan identifier.
    pub fn signup(
        &self,
        username: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> DomainResult<Actor> {
        // Hashing is slow; do it before taking the write lock.
        let mut actor = Actor::register(username, password, None, self.clock.now())?;
        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&actor.username)
            .to_string();

        let actor = self.store.transact(move |state| {
            if state.actor_by_username(&actor.username).is_some() {
                return Err(DomainError::conflict(format!(
                    "username '{}' is taken",
                    actor.username
                )));
            }
            let default_role = state.default_role().cloned();
            actor.attach_role(default_role.as_ref());
            actor.profile = Some(Profile {
                display_name,
                qr_id: unique_scan_id(state),
            });
            state.actors.insert(actor.id, actor.clone());
            Ok(actor)
        })?;

        tracing::info!(actor_id = %actor.id, rider_class = %actor.rider_class, "actor signed up");
        Ok(actor)
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable.
    pub fn login(&self, username: &str, password: &str) -> DomainResult<SessionToken> {
        let username =
            normalize_username(username).map_err(|_| DomainError::unauthorized(BAD_CREDENTIALS))?;
        let actor = self
            .store
            .read(|state| Ok(state.actor_by_username(&username).cloned()))?
            .filter(|a| a.password.verify(password))
            .ok_or_else(|| {
                tracing::debug!("login rejected");
                DomainError::unauthorized(BAD_CREDENTIALS)
            })?;

        self.vault.issue(actor.id)
    }

    pub fn logout(&self, token: &SessionToken) -> DomainResult<()> {
        self.vault.revoke_token(token)?;
        Ok(())
    }

    /// Replace the password and revoke every session in one transaction.
    pub fn change_password(
        &self,
        actor_id: ActorId,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        validate_password(new_password)?;

        let current_hash = self.store.read(|state| Ok(state.actor(actor_id)?.password.clone()))?;
        if !current_hash.verify(current_password) {
            return Err(DomainError::validation("current password is incorrect"));
        }
        let new_hash = PasswordHash::derive(new_password)?;

        let revoked = self.store.transact(|state| {
            let actor = state.actor_mut(actor_id)?;
            if actor.password != current_hash {
                return Err(DomainError::conflict("password was changed concurrently"));
            }
            actor.password = new_hash;
            Ok(state.revoke_sessions(actor_id))
        })?;

        tracing::info!(%actor_id, revoked, "password changed");
        Ok(())
    }

    /// Set the display name, creating the profile (and scan id) if missing.
    pub fn update_profile(&self, actor_id: ActorId, display_name: &str) -> DomainResult<Profile> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name must not be empty"));
        }

        self.store.transact(|state| {
            let qr_id = match state.actor(actor_id)?.profile.as_ref() {
                Some(p) => p.qr_id.clone(),
                None => unique_scan_id(state),
            };
            let profile = Profile {
                display_name: display_name.to_string(),
                qr_id,
            };
            state.actor_mut(actor_id)?.profile = Some(profile.clone());
            Ok(profile)
        })
    }

    pub fn actor(&self, actor_id: ActorId) -> DomainResult<Actor> {
        self.store.read(|state| state.actor(actor_id).cloned())
    }
}

fn unique_scan_id(state: &StoreState) -> String {
    loop {
        let candidate = generate_scan_id();
        if !state.scan_id_taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use transitgate_core::SystemClock;

    fn identity() -> Identity<Arc<InMemoryStore>> {
        let store = Arc::new(InMemoryStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let vault = TokenVault::new(store.clone(), clock.clone(), "sid");
        Identity::new(store, clock, vault)
    }

    #[test]
    fn signup_normalizes_and_rejects_duplicates() {
        let identity = identity();
        let actor = identity.signup("  Alice ", "correct horse", None).unwrap();
        assert_eq!(actor.username, "alice");
        assert_eq!(actor.profile.as_ref().unwrap().display_name, "alice");

        let err = identity.signup("ALICE", "another pass", None).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn login_does_not_reveal_which_part_was_wrong() {
        let identity = identity();
        identity.signup("bob", "correct horse", None).unwrap();

        let unknown = identity.login("nobody", "correct horse").unwrap_err();
        let wrong = identity.login("bob", "wrong horse").unwrap_err();
        assert_eq!(unknown, wrong);
        assert!(identity.login("BOB", "correct horse").is_ok());
    }

    #[test]
    fn update_profile_keeps_scan_id() {
        let identity = identity();
        let actor = identity.signup("carol", "correct horse", Some("Carol")).unwrap();
        let before = actor.scan_id().unwrap().to_string();

        let profile = identity.update_profile(actor.id, "  Carol B ").unwrap();
        assert_eq!(profile.display_name, "Carol B");
        assert_eq!(profile.qr_id, before);
    }
}

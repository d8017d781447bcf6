//! Idempotent seeding of built-in roles and the permission catalog.
//!
//! Everything is insert-if-absent, keyed by permission code and role name,
//! so running it on every start is safe and never clobbers administrative
//! edits. The only exception: ADMIN is topped up with any catalog codes it
//! lacks, since it must always hold full access.

use std::sync::Arc;

use serde::Serialize;

use transitgate_auth::{Actor, Role, SystemRole, default_permissions, default_roles};
use transitgate_core::{Clock, DomainError, DomainResult};

use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub grants_created: usize,
}

impl BootstrapReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub fn bootstrap<S: Store>(store: &S) -> DomainResult<BootstrapReport> {
    let report = store.transact(|state| {
        let mut report = BootstrapReport::default();

        for seed in default_permissions() {
            if !state.permissions.contains_key(seed.code) {
                state
                    .permissions
                    .insert(seed.code.to_string(), seed.to_permission());
                report.permissions_created += 1;
            }
        }

        for seed in default_roles() {
            let existing = state.role_by_name(seed.role.as_str()).map(|r| r.id);
            let (role_id, created) = match existing {
                Some(id) => (id, false),
                None => {
                    let is_default = seed.is_default && state.default_role().is_none();
                    let role = Role::new(seed.role.as_str(), is_default);
                    let id = role.id;
                    state.roles.insert(id, role);
                    report.roles_created += 1;
                    (id, true)
                }
            };

            if created || seed.role == SystemRole::Admin {
                for code in &seed.permission_codes {
                    if state.role_permissions.insert((role_id, code.to_string())) {
                        report.grants_created += 1;
                    }
                }
            }
        }

        Ok(report)
    })?;

    if report.is_noop() {
        tracing::debug!("bootstrap: nothing to seed");
    } else {
        tracing::info!(
            permissions = report.permissions_created,
            roles = report.roles_created,
            grants = report.grants_created,
            "bootstrap seeded catalog"
        );
    }
    Ok(report)
}

/// Create an administrator account unless one with that username exists.
///
/// Returns the (new or existing) actor; an existing non-admin account with
/// the same username is a `Conflict`.
pub fn ensure_admin_account<S: Store>(
    store: &S,
    clock: &Arc<dyn Clock>,
    username: &str,
    password: &str,
) -> DomainResult<Actor> {
    let candidate = Actor::register(username, password, None, clock.now())?;

    store.transact(move |state| {
        let admin_role = state
            .role_by_name(SystemRole::Admin.as_str())
            .cloned()
            .ok_or_else(|| DomainError::invalid_operation("run bootstrap before creating an admin"))?;

        if let Some(existing) = state.actor_by_username(&candidate.username) {
            return if existing.role_id == Some(admin_role.id) {
                Ok(existing.clone())
            } else {
                Err(DomainError::conflict(format!(
                    "'{}' exists and is not an administrator",
                    existing.username
                )))
            };
        }

        let mut admin = candidate;
        admin.attach_role(Some(&admin_role));
        state.actors.insert(admin.id, admin.clone());
        tracing::info!(actor_id = %admin.id, "administrator account created");
        Ok(admin)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use transitgate_core::SystemClock;

    #[test]
    fn second_run_is_a_no_op() {
        let store = InMemoryStore::new();
        let first = bootstrap(&store).unwrap();
        assert_eq!(first.roles_created, 6);
        assert_eq!(first.permissions_created, default_permissions().len());

        let second = bootstrap(&store).unwrap();
        assert!(second.is_noop());
    }

    #[test]
    fn user_is_the_single_default_role() {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        let defaults: Vec<String> = store
            .read(|s| Ok(s.roles.values().filter(|r| r.is_default).map(|r| r.name.clone()).collect()))
            .unwrap();
        assert_eq!(defaults, vec!["USER".to_string()]);
    }

    #[test]
    fn edited_grants_survive_rerun() {
        let store = InMemoryStore::new();
        bootstrap(&store).unwrap();
        store
            .transact(|s| {
                let student = s.role_by_name("student").map(|r| r.id).unwrap();
                s.role_permissions.retain(|(r, _)| *r != student);
                Ok(())
            })
            .unwrap();

        bootstrap(&store).unwrap();
        let count = store
            .read(|s| {
                let student = s.role_by_name("STUDENT").map(|r| r.id).unwrap();
                Ok(s.role_codes(student).len())
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn admin_account_is_idempotent() {
        let store = InMemoryStore::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        bootstrap(&store).unwrap();

        let first = ensure_admin_account(&store, &clock, "root", "s3cret-pass").unwrap();
        let second = ensure_admin_account(&store, &clock, "root", "s3cret-pass").unwrap();
        assert_eq!(first.id, second.id);
    }
}

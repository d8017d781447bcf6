//! PermissionResolver: role grants, custom overrides and role administration.

use std::collections::BTreeSet;

use serde::Serialize;

use transitgate_auth::roles::normalize_role_name;
use transitgate_auth::{
    AccessExplanation, Actor, Capabilities, EffectiveRoutes, Permission, Role,
    ensure_admin_not_shrunk,
};
use transitgate_core::{ActorId, DomainError, DomainResult, RoleId};

use crate::store::{Store, StoreState};

/// Outcome of deleting a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDeletion {
    pub deleted: Role,
    pub fallback: Option<RoleId>,
    pub reassigned: usize,
}

#[derive(Clone)]
pub struct PermissionResolver<S> {
    store: S,
    fallback_role: String,
}

impl<S: Store> PermissionResolver<S> {
    pub fn new(store: S, fallback_role: impl Into<String>) -> Self {
        Self {
            store,
            fallback_role: normalize_role_name(&fallback_role.into()),
        }
    }

    // ── resolution ──────────────────────────────────────────────────────────

    pub fn capabilities(&self, actor_id: ActorId) -> DomainResult<Capabilities> {
        self.store.read(|state| {
            let actor = state.actor(actor_id)?;
            Ok(state.capabilities(actor))
        })
    }

    /// Guard for the administrative surface (ADMIN only).
    pub fn require_admin(&self, actor_id: ActorId) -> DomainResult<Capabilities> {
        let caps = self.capabilities(actor_id)?;
        caps.require_admin()?;
        Ok(caps)
    }

    /// Guard for operational administration (MANAGER or ADMIN).
    pub fn require_manager_or_admin(&self, actor_id: ActorId) -> DomainResult<Capabilities> {
        let caps = self.capabilities(actor_id)?;
        caps.require_manager()?;
        Ok(caps)
    }

    pub fn effective_routes(&self, actor_id: ActorId) -> DomainResult<BTreeSet<String>> {
        self.store
            .read(|state| Ok(resolve_in(state, state.actor(actor_id)?).routes()))
    }

    /// Exact-match membership test on the normalized path.
    pub fn has_access(&self, actor_id: ActorId, path: &str) -> DomainResult<bool> {
        self.store
            .read(|state| Ok(resolve_in(state, state.actor(actor_id)?).has_access(path)))
    }

    pub fn explain_access(&self, actor_id: ActorId, path: &str) -> DomainResult<AccessExplanation> {
        self.store
            .read(|state| Ok(resolve_in(state, state.actor(actor_id)?).explain(path)))
    }

    // ── grants ──────────────────────────────────────────────────────────────

    /// Atomically replace a role's permission set.
    ///
    /// Every code must exist in the catalog. The ADMIN role can gain codes
    /// but never lose one.
    pub fn assign_role<C: AsRef<str>>(&self, role_id: RoleId, codes: &[C]) -> DomainResult<Role> {
        let codes: BTreeSet<String> = codes.iter().map(|c| c.as_ref().trim().to_string()).collect();

        let role = self.store.transact(|state| {
            let role = state.role(role_id)?.clone();
            if let Some(unknown) = codes.iter().find(|c| !state.permissions.contains_key(*c)) {
                return Err(DomainError::validation(format!(
                    "unknown permission code '{unknown}'"
                )));
            }
            ensure_admin_not_shrunk(&role, &state.role_codes(role_id), &codes)?;

            state.role_permissions.retain(|(r, _)| *r != role_id);
            state
                .role_permissions
                .extend(codes.iter().map(|c| (role_id, c.clone())));
            Ok(role)
        })?;

        tracing::info!(role = %role.name, permissions = codes.len(), "role permissions replaced");
        Ok(role)
    }

    /// Atomically replace an actor's custom grants.
    ///
    /// Unknown or inactive codes are dropped; the kept set is returned.
    pub fn set_custom_permissions<C: AsRef<str>>(
        &self,
        actor_id: ActorId,
        codes: &[C],
    ) -> DomainResult<BTreeSet<String>> {
        let kept = self.store.transact(|state| {
            state.actor(actor_id)?;
            let kept: BTreeSet<String> = codes
                .iter()
                .map(|c| c.as_ref().trim())
                .filter(|c| state.permissions.get(*c).is_some_and(|p| p.active))
                .map(str::to_string)
                .collect();

            state.custom_permissions.retain(|(a, _)| *a != actor_id);
            state
                .custom_permissions
                .extend(kept.iter().map(|c| (actor_id, c.clone())));
            Ok(kept)
        })?;

        tracing::info!(%actor_id, permissions = kept.len(), "custom permissions replaced");
        Ok(kept)
    }

    pub fn custom_permissions(&self, actor_id: ActorId) -> DomainResult<Vec<Permission>> {
        self.store.read(|state| {
            state.actor(actor_id)?;
            Ok(state.custom_grants(actor_id))
        })
    }

    /// Activate or retire a catalog entry. Retired entries stay granted but
    /// stop resolving.
    pub fn set_permission_active(&self, code: &str, active: bool) -> DomainResult<Permission> {
        self.store.transact(|state| {
            let permission = state
                .permissions
                .get_mut(code)
                .ok_or_else(|| DomainError::not_found(format!("permission '{code}'")))?;
            permission.active = active;
            Ok(permission.clone())
        })
    }

    pub fn list_permissions(&self) -> DomainResult<Vec<Permission>> {
        self.store
            .read(|state| Ok(state.permissions.values().cloned().collect()))
    }

    // ── roles ───────────────────────────────────────────────────────────────

    /// Move an actor to another role; the rider class follows the role.
    pub fn set_actor_role(&self, actor_id: ActorId, role_id: RoleId) -> DomainResult<Actor> {
        let actor = self.store.transact(|state| {
            let role = state.role(role_id)?.clone();
            let actor = state.actor_mut(actor_id)?;
            actor.attach_role(Some(&role));
            Ok(actor.clone())
        })?;
        tracing::info!(%actor_id, rider_class = %actor.rider_class, "actor role changed");
        Ok(actor)
    }

    pub fn list_roles(&self) -> DomainResult<Vec<Role>> {
        self.store.read(|state| Ok(state.roles.values().cloned().collect()))
    }

    pub fn role_permissions(&self, role_id: RoleId) -> DomainResult<Vec<Permission>> {
        self.store.read(|state| {
            state.role(role_id)?;
            Ok(state.role_grants(Some(role_id)))
        })
    }

    /// Create a role. Making it the default clears the previous default.
    pub fn create_role(&self, name: &str, is_default: bool) -> DomainResult<Role> {
        let role = Role::new(name, is_default);
        if role.name.is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }

        let role = self.store.transact(move |state| {
            ensure_name_free(state, &role.name, None)?;
            if role.is_default {
                clear_default(state);
            }
            state.roles.insert(role.id, role.clone());
            Ok(role)
        })?;

        tracing::info!(role = %role.name, is_default = role.is_default, "role created");
        Ok(role)
    }

    /// Rename a role, re-deriving its members' rider class.
    pub fn rename_role(&self, role_id: RoleId, name: &str) -> DomainResult<Role> {
        let name = normalize_role_name(name);
        if name.is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }

        self.store.transact(|state| {
            let role = state.role(role_id)?;
            if role.is_admin() {
                return Err(DomainError::invalid_operation("the ADMIN role cannot be renamed"));
            }
            ensure_name_free(state, &name, Some(role_id))?;

            let mut role = role.clone();
            role.name = name;
            state.roles.insert(role_id, role.clone());
            for actor in state.actors.values_mut().filter(|a| a.role_id == Some(role_id)) {
                actor.attach_role(Some(&role));
            }
            Ok(role)
        })
    }

    pub fn set_default_role(&self, role_id: RoleId) -> DomainResult<Role> {
        self.store.transact(|state| {
            state.role(role_id)?;
            clear_default(state);
            let role = state
                .roles
                .get_mut(&role_id)
                .ok_or_else(|| DomainError::not_found(format!("role {role_id}")))?;
            role.is_default = true;
            Ok(role.clone())
        })
    }

    /// Delete a non-default role, moving its members to the fallback role.
    ///
    /// The fallback is the configured fallback role name if present,
    /// otherwise the remaining role with the lowest id.
    pub fn delete_role(&self, role_id: RoleId) -> DomainResult<RoleDeletion> {
        let deletion = self.store.transact(|state| {
            let deleted = state.role(role_id)?.clone();
            if deleted.is_default {
                return Err(DomainError::invalid_operation("the default role cannot be deleted"));
            }
            if deleted.is_admin() {
                return Err(DomainError::invalid_operation("the ADMIN role cannot be deleted"));
            }

            let fallback = state
                .role_by_name(&self.fallback_role)
                .filter(|r| r.id != role_id)
                .or_else(|| state.roles.values().find(|r| r.id != role_id))
                .cloned();

            let mut reassigned = 0;
            for actor in state.actors.values_mut().filter(|a| a.role_id == Some(role_id)) {
                actor.attach_role(fallback.as_ref());
                reassigned += 1;
            }
            state.role_permissions.retain(|(r, _)| *r != role_id);
            state.roles.remove(&role_id);

            Ok(RoleDeletion {
                deleted,
                fallback: fallback.map(|r| r.id),
                reassigned,
            })
        })?;

        tracing::info!(
            role = %deletion.deleted.name,
            reassigned = deletion.reassigned,
            "role deleted"
        );
        Ok(deletion)
    }
}

/// Effective routes of `actor` against the current tables.
pub(crate) fn resolve_in(state: &StoreState, actor: &Actor) -> EffectiveRoutes {
    EffectiveRoutes::resolve(
        &state.capabilities(actor),
        &state.role_grants(actor.role_id),
        &state.custom_grants(actor.id),
    )
}

fn ensure_name_free(state: &StoreState, name: &str, except: Option<RoleId>) -> DomainResult<()> {
    match state.role_by_name(name) {
        Some(existing) if Some(existing.id) != except => {
            Err(DomainError::conflict(format!("role '{name}' already exists")))
        }
        _ => Ok(()),
    }
}

fn clear_default(state: &mut StoreState) {
    for role in state.roles.values_mut() {
        role.is_default = false;
    }
}

//! Route-level access resolution.
//!
//! An actor's effective routes are the union of its role grants and its
//! custom grants, each filtered to active catalog entries whose scope
//! matches the actor's surface. Matching is exact on the normalized route:
//! `/admin/users` does not grant `/admin/users/5`.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use transitgate_core::DomainError;

use crate::{Capabilities, Permission, Role, Surface, normalize_route};

/// Where a route grant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    Role,
    Custom,
    Both,
}

impl GrantSource {
    fn merge(self, other: GrantSource) -> GrantSource {
        if self == other { self } else { GrantSource::Both }
    }
}

/// Deduplicated set of normalized routes an actor may reach.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveRoutes {
    surface: Option<Surface>,
    routes: BTreeMap<String, GrantSource>,
}

impl EffectiveRoutes {
    pub fn resolve(
        capabilities: &Capabilities,
        role_grants: &[Permission],
        custom_grants: &[Permission],
    ) -> Self {
        let surface = capabilities.surface();
        let mut routes: BTreeMap<String, GrantSource> = BTreeMap::new();

        let sourced = role_grants
            .iter()
            .map(|p| (p, GrantSource::Role))
            .chain(custom_grants.iter().map(|p| (p, GrantSource::Custom)));

        for (permission, source) in sourced {
            if !permission.active || !surface.permits(permission.scope) {
                continue;
            }
            routes
                .entry(permission.normalized_route())
                .and_modify(|s| *s = s.merge(source))
                .or_insert(source);
        }

        Self {
            surface: Some(surface),
            routes,
        }
    }

    pub fn has_access(&self, requested_path: &str) -> bool {
        self.routes.contains_key(&normalize_route(requested_path))
    }

    pub fn routes(&self) -> BTreeSet<String> {
        self.routes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Explain an access decision for audit/debugging.
    pub fn explain(&self, requested_path: &str) -> AccessExplanation {
        let normalized = normalize_route(requested_path);
        let source = self.routes.get(&normalized).copied();
        let reason = match source {
            Some(GrantSource::Role) => format!("'{normalized}' is granted by the actor's role"),
            Some(GrantSource::Custom) => {
                format!("'{normalized}' is granted by a custom permission")
            }
            Some(GrantSource::Both) => {
                format!("'{normalized}' is granted by both the role and a custom permission")
            }
            None => format!(
                "no active permission for '{normalized}' on the {} surface",
                match self.surface {
                    Some(Surface::Admin) => "admin",
                    _ => "rider",
                }
            ),
        };

        AccessExplanation {
            requested_path: requested_path.to_string(),
            normalized_path: normalized,
            granted: source.is_some(),
            source,
            reason,
            effective_routes: self.routes.keys().cloned().collect(),
        }
    }
}

/// Detailed explanation of an access decision.
#[derive(Debug, Clone, Serialize)]
pub struct AccessExplanation {
    pub requested_path: String,
    pub normalized_path: String,
    pub granted: bool,
    pub source: Option<GrantSource>,
    pub reason: String,
    pub effective_routes: Vec<String>,
}

/// The ADMIN role must always keep full access: a replace may add codes but
/// never drop one it currently holds.
pub fn ensure_admin_not_shrunk(
    role: &Role,
    current_codes: &BTreeSet<String>,
    new_codes: &BTreeSet<String>,
) -> Result<(), DomainError> {
    if !role.is_admin() {
        return Ok(());
    }
    let dropped: Vec<&str> = current_codes
        .difference(new_codes)
        .map(String::as_str)
        .collect();
    if dropped.is_empty() {
        Ok(())
    } else {
        Err(DomainError::invalid_operation(format!(
            "the ADMIN role cannot lose permissions (would drop: {})",
            dropped.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Actor, PermissionScope, RiderClass};
    use chrono::Utc;

    fn perm(code: &str, route: &str, scope: PermissionScope) -> Permission {
        Permission::new(code, code, "test", route, scope)
    }

    fn rider_caps() -> Capabilities {
        Capabilities {
            is_admin: false,
            is_manager: false,
            is_conductor: false,
            rider_class: RiderClass::Regular,
        }
    }

    fn admin_caps() -> Capabilities {
        let role = Role::new("ADMIN", false);
        let actor = Actor::register("root", "long-enough", Some(&role), Utc::now()).unwrap();
        Capabilities::resolve(&actor, Some(&role))
    }

    #[test]
    fn union_of_role_and_custom_grants() {
        let role = vec![perm("tickets.buy", "/tickets/buy", PermissionScope::Global)];
        let custom = vec![perm("history.view", "/History/", PermissionScope::Global)];

        let effective = EffectiveRoutes::resolve(&rider_caps(), &role, &custom);

        assert_eq!(
            effective.routes(),
            BTreeSet::from(["/history".to_string(), "/tickets/buy".to_string()])
        );
    }

    #[test]
    fn inactive_and_out_of_scope_permissions_are_excluded() {
        let mut inactive = perm("tickets.buy", "/tickets/buy", PermissionScope::Global);
        inactive.active = false;
        let admin_only = perm("admin.users", "/admin/users", PermissionScope::AdminOnly);
        let rider_only = perm("passes.mine", "/passes", PermissionScope::RiderOnly);

        let grants = vec![inactive, admin_only, rider_only];
        let rider = EffectiveRoutes::resolve(&rider_caps(), &grants, &[]);
        let admin = EffectiveRoutes::resolve(&admin_caps(), &grants, &[]);

        assert_eq!(rider.routes(), BTreeSet::from(["/passes".to_string()]));
        assert_eq!(admin.routes(), BTreeSet::from(["/admin/users".to_string()]));
    }

    #[test]
    fn access_check_normalizes_the_request() {
        let grants = vec![perm("admin.users", "/admin/users", PermissionScope::AdminOnly)];
        let effective = EffectiveRoutes::resolve(&admin_caps(), &grants, &[]);

        assert_eq!(
            effective.has_access("/Admin/Users/"),
            effective.has_access("/admin/users")
        );
        assert!(effective.has_access("/admin/users?page=3"));
        assert!(!effective.has_access("/admin/users/5"));
    }

    #[test]
    fn explain_reports_grant_source() {
        let shared = perm("tickets.buy", "/tickets/buy", PermissionScope::Global);
        let effective = EffectiveRoutes::resolve(&rider_caps(), &[shared.clone()], &[shared]);

        let granted = effective.explain("/tickets/buy/");
        assert!(granted.granted);
        assert_eq!(granted.source, Some(GrantSource::Both));

        let denied = effective.explain("/admin");
        assert!(!denied.granted);
        assert!(denied.reason.contains("rider surface"));
    }

    #[test]
    fn admin_role_cannot_shrink() {
        let admin = Role::new("ADMIN", false);
        let current = BTreeSet::from(["a".to_string(), "b".to_string()]);
        let grown = BTreeSet::from(["a".to_string(), "b".to_string(), "c".to_string()]);
        let shrunk = BTreeSet::from(["a".to_string()]);

        assert!(ensure_admin_not_shrunk(&admin, &current, &grown).is_ok());
        assert!(matches!(
            ensure_admin_not_shrunk(&admin, &current, &shrunk),
            Err(DomainError::InvalidOperation(msg)) if msg.contains('b')
        ));

        let other = Role::new("USER", true);
        assert!(ensure_admin_not_shrunk(&other, &current, &shrunk).is_ok());
    }
}

//! Built-in roles and permission catalog used to bootstrap a store.

use crate::{Permission, PermissionScope, SystemRole};

/// A catalog permission to insert if absent.
#[derive(Debug, Clone, Copy)]
pub struct PermissionSeed {
    pub code: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub route: &'static str,
    pub scope: PermissionScope,
}

impl PermissionSeed {
    pub fn to_permission(&self) -> Permission {
        Permission::new(self.code, self.title, self.category, self.route, self.scope)
    }
}

/// A role to insert if absent, with the codes it starts with.
#[derive(Debug, Clone)]
pub struct RoleSeed {
    pub role: SystemRole,
    pub is_default: bool,
    pub permission_codes: Vec<&'static str>,
}

const fn seed(
    code: &'static str,
    title: &'static str,
    category: &'static str,
    route: &'static str,
    scope: PermissionScope,
) -> PermissionSeed {
    PermissionSeed {
        code,
        title,
        category,
        route,
        scope,
    }
}

const CATALOG: &[PermissionSeed] = &[
    seed("dashboard.view", "View dashboard", "dashboard", "/dashboard", PermissionScope::AdminOnly),
    seed("roles.manage", "Manage roles", "admin", "/admin/roles", PermissionScope::AdminOnly),
    seed("permissions.manage", "Manage custom permissions", "admin", "/admin/permissions", PermissionScope::AdminOnly),
    seed("users.manage", "Manage users", "admin", "/admin/users", PermissionScope::AdminOnly),
    seed("pricing.manage", "Manage pricing rules", "fares", "/admin/pricing", PermissionScope::AdminOnly),
    seed("payments.review", "Review pass payments", "fares", "/admin/payments", PermissionScope::AdminOnly),
    seed("routes.manage", "Manage routes and buses", "transit", "/admin/routes", PermissionScope::AdminOnly),
    seed("scan.verify", "Verify riders by QR scan", "validation", "/scan", PermissionScope::AdminOnly),
    seed("tickets.verify", "Look up a ticket", "validation", "/tickets/verify", PermissionScope::Global),
    seed("profile.edit", "Edit own profile", "account", "/profile", PermissionScope::Global),
    seed("notifications.view", "View notifications", "account", "/notifications", PermissionScope::Global),
    seed("tickets.buy", "Buy tickets", "fares", "/tickets/buy", PermissionScope::RiderOnly),
    seed("passes.apply", "Apply for a pass", "fares", "/passes/apply", PermissionScope::RiderOnly),
    seed("passes.view", "View own passes", "fares", "/passes", PermissionScope::RiderOnly),
    seed("history.view", "View travel history", "fares", "/history", PermissionScope::RiderOnly),
];

/// Every catalog permission.
pub fn default_permissions() -> &'static [PermissionSeed] {
    CATALOG
}

/// Built-in roles. `USER` is the default role for new sign-ups.
pub fn default_roles() -> Vec<RoleSeed> {
    let rider = vec![
        "tickets.verify",
        "profile.edit",
        "notifications.view",
        "tickets.buy",
        "passes.apply",
        "passes.view",
        "history.view",
    ];

    vec![
        RoleSeed {
            role: SystemRole::Admin,
            is_default: false,
            permission_codes: CATALOG.iter().map(|p| p.code).collect(),
        },
        RoleSeed {
            role: SystemRole::Manager,
            is_default: false,
            permission_codes: vec![
                "dashboard.view",
                "pricing.manage",
                "payments.review",
                "routes.manage",
                "tickets.verify",
                "profile.edit",
                "notifications.view",
            ],
        },
        RoleSeed {
            role: SystemRole::Conductor,
            is_default: false,
            permission_codes: vec![
                "scan.verify",
                "tickets.verify",
                "profile.edit",
                "notifications.view",
            ],
        },
        RoleSeed {
            role: SystemRole::Student,
            is_default: false,
            permission_codes: rider.clone(),
        },
        RoleSeed {
            role: SystemRole::Staff,
            is_default: false,
            permission_codes: rider.clone(),
        },
        RoleSeed {
            role: SystemRole::User,
            is_default: true,
            permission_codes: rider,
        },
    ]
}

use serde::{Deserialize, Serialize};

/// Which login surface a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Applies on every surface.
    Global,
    /// Only for non-privileged (rider) actors.
    RiderOnly,
    /// Only for privileged (admin/manager/conductor) actors.
    AdminOnly,
}

impl PermissionScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "global" | "all" => Some(Self::Global),
            "rider-only" | "rider" | "user" => Some(Self::RiderOnly),
            "admin-only" | "admin" => Some(Self::AdminOnly),
            _ => None,
        }
    }
}

/// Permission catalog entry.
///
/// `code` is unique. Inactive entries are excluded from resolution but kept
/// for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub code: String,
    pub title: String,
    pub category: String,
    pub route: String,
    pub active: bool,
    pub scope: PermissionScope,
}

impl Permission {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<String>,
        route: impl Into<String>,
        scope: PermissionScope,
    ) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            category: category.into(),
            route: route.into(),
            active: true,
            scope,
        }
    }

    /// The permission's route in canonical form.
    pub fn normalized_route(&self) -> String {
        normalize_route(&self.route)
    }
}

/// Canonical form of a route string.
///
/// Strips the query string and trailing slashes, lower-cases, and maps the
/// empty path to `/`. Idempotent.
pub fn normalize_route(raw: &str) -> String {
    let path = raw.split(['?', '#']).next().unwrap_or_default().trim();
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return "/".to_string();
    }
    path.to_lowercase()
}

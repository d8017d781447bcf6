use serde::{Deserialize, Serialize};

use transitgate_core::{Entity, RoleId};

/// Role record.
///
/// Exactly one role is the default at any time; new actors without an
/// explicit role attach to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub is_default: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: RoleId::new(),
            name: normalize_role_name(&name.into()),
            is_default,
        }
    }

    /// The well-known role this record corresponds to, if any.
    pub fn system_role(&self) -> Option<SystemRole> {
        SystemRole::from_name(&self.name)
    }

    pub fn is_admin(&self) -> bool {
        self.system_role() == Some(SystemRole::Admin)
    }
}

impl Entity for Role {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Role names are compared case-insensitively and stored upper-cased.
pub fn normalize_role_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Roles the engine attaches behaviour to.
///
/// Everywhere else a role is just a bag of permissions; these names are
/// resolved once into [`crate::Capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRole {
    Admin,
    Manager,
    Conductor,
    Student,
    Staff,
    User,
}

impl SystemRole {
    pub const ALL: [SystemRole; 6] = [
        SystemRole::Admin,
        SystemRole::Manager,
        SystemRole::Conductor,
        SystemRole::Student,
        SystemRole::Staff,
        SystemRole::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Admin => "ADMIN",
            SystemRole::Manager => "MANAGER",
            SystemRole::Conductor => "CONDUCTOR",
            SystemRole::Student => "STUDENT",
            SystemRole::Staff => "STAFF",
            SystemRole::User => "USER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = normalize_role_name(name);
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl core::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_upper_cased() {
        let role = Role::new("  conductor ", false);
        assert_eq!(role.name, "CONDUCTOR");
        assert_eq!(role.system_role(), Some(SystemRole::Conductor));
    }

    #[test]
    fn custom_roles_have_no_system_meaning() {
        let role = Role::new("night-shift", false);
        assert_eq!(role.system_role(), None);
        assert!(!role.is_admin());
    }
}

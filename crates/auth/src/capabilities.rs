use serde::{Deserialize, Serialize};

use transitgate_core::DomainError;

use crate::{Actor, Permission, PermissionScope, RiderClass, Role, SystemRole};

/// Login surface an actor works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Admin,
    Rider,
}

impl Surface {
    pub fn permits(&self, scope: PermissionScope) -> bool {
        match scope {
            PermissionScope::Global => true,
            PermissionScope::AdminOnly => *self == Surface::Admin,
            PermissionScope::RiderOnly => *self == Surface::Rider,
        }
    }
}

/// Catalog code whose active custom grant confers the conductor capability.
pub const SCAN_VERIFY: &str = "scan.verify";

/// Behavioural capabilities of an actor, resolved from its role and widened
/// by capability-bearing custom grants.
///
/// Call sites check these flags rather than comparing role names. The ADMIN
/// role holds every capability. Admin and manager come from the role only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub is_admin: bool,
    pub is_manager: bool,
    pub is_conductor: bool,
    pub rider_class: RiderClass,
}

impl Capabilities {
    pub fn resolve(actor: &Actor, role: Option<&Role>) -> Self {
        let system = role.and_then(Role::system_role);
        let is_admin = system == Some(SystemRole::Admin);
        Self {
            is_admin,
            is_manager: is_admin || system == Some(SystemRole::Manager),
            is_conductor: is_admin || system == Some(SystemRole::Conductor),
            rider_class: actor.rider_class.clone(),
        }
    }

    /// An active `scan.verify` custom grant makes the actor a conductor.
    pub fn with_custom_grants(mut self, grants: &[Permission]) -> Self {
        if grants.iter().any(|p| p.active && p.code == SCAN_VERIFY) {
            self.is_conductor = true;
        }
        self
    }

    pub fn is_privileged(&self) -> bool {
        self.is_admin || self.is_manager || self.is_conductor
    }

    pub fn surface(&self) -> Surface {
        if self.is_privileged() {
            Surface::Admin
        } else {
            Surface::Rider
        }
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(DomainError::forbidden("administrator role required"))
        }
    }

    pub fn require_manager(&self) -> Result<(), DomainError> {
        if self.is_manager {
            Ok(())
        } else {
            Err(DomainError::forbidden("manager or administrator role required"))
        }
    }

    pub fn require_conductor(&self) -> Result<(), DomainError> {
        if self.is_conductor {
            Ok(())
        } else {
            Err(DomainError::forbidden("conductor capability required"))
        }
    }
}

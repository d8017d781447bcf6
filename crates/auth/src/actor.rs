//! Actor identity (rider, conductor, manager, administrator).

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use transitgate_core::{ActorId, DomainError, Entity, RoleId};

use crate::{PasswordHash, Role, SystemRole};

/// Fare category derived from an actor's role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiderClass {
    Student,
    Staff,
    Regular,
    /// Any other role name (conductors, managers, custom roles).
    Other(String),
}

impl RiderClass {
    /// Derive the rider class from the actor's role.
    ///
    /// No role, or the plain `USER` role, is a regular rider.
    pub fn from_role(role: Option<&Role>) -> Self {
        let Some(role) = role else {
            return RiderClass::Regular;
        };
        match role.system_role() {
            Some(SystemRole::Student) => RiderClass::Student,
            Some(SystemRole::Staff) => RiderClass::Staff,
            Some(SystemRole::User) => RiderClass::Regular,
            _ => RiderClass::Other(role.name.clone()),
        }
    }
}

impl core::fmt::Display for RiderClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RiderClass::Student => f.write_str("STUDENT"),
            RiderClass::Staff => f.write_str("STAFF"),
            RiderClass::Regular => f.write_str("REGULAR"),
            RiderClass::Other(name) => f.write_str(name),
        }
    }
}

/// Optional one-to-one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    /// Unique scan identifier encoded in the rider's QR code.
    pub qr_id: String,
}

/// Actor record.
///
/// Actors are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub password: PasswordHash,
    pub role_id: Option<RoleId>,
    pub rider_class: RiderClass,
    pub profile: Option<Profile>,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    /// Build a new actor, validating the username and password.
    pub fn register(
        username: &str,
        password: &str,
        role: Option<&Role>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let username = normalize_username(username)?;
        validate_password(password)?;

        Ok(Self {
            id: ActorId::new(),
            username,
            password: PasswordHash::derive(password)?,
            role_id: role.map(|r| r.id),
            rider_class: RiderClass::from_role(role),
            profile: None,
            created_at: now,
        })
    }

    /// Move the actor to another role, re-deriving the rider class.
    pub fn attach_role(&mut self, role: Option<&Role>) {
        self.role_id = role.map(|r| r.id);
        self.rider_class = RiderClass::from_role(role);
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.qr_id.as_str())
    }
}

impl Entity for Actor {
    type Id = ActorId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Usernames are trimmed and lower-cased; 3..=64 chars of `[a-z0-9._-]`.
pub fn normalize_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim().to_lowercase();
    if username.len() < 3 || username.len() > 64 {
        return Err(DomainError::validation("username must be 3 to 64 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < 8 {
        return Err(DomainError::validation("password must be at least 8 characters"));
    }
    Ok(())
}

/// Fresh random scan identifier (128 bits, hex).
pub fn generate_scan_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rider_class_follows_role() {
        let student = Role::new("STUDENT", false);
        let staff = Role::new("STAFF", false);
        let user = Role::new("USER", true);
        let conductor = Role::new("CONDUCTOR", false);

        assert_eq!(RiderClass::from_role(Some(&student)), RiderClass::Student);
        assert_eq!(RiderClass::from_role(Some(&staff)), RiderClass::Staff);
        assert_eq!(RiderClass::from_role(Some(&user)), RiderClass::Regular);
        assert_eq!(RiderClass::from_role(None), RiderClass::Regular);
        assert_eq!(
            RiderClass::from_role(Some(&conductor)),
            RiderClass::Other("CONDUCTOR".to_string())
        );
    }

    #[test]
    fn register_normalizes_username_and_hashes_password() {
        let role = Role::new("USER", true);
        let actor = Actor::register("  Alice.Smith ", "s3cret-pass", Some(&role), Utc::now()).unwrap();
        assert_eq!(actor.username, "alice.smith");
        assert_eq!(actor.role_id, Some(role.id));
        assert!(actor.password.verify("s3cret-pass"));
    }

    #[test]
    fn register_rejects_short_passwords_and_bad_usernames() {
        assert!(matches!(
            Actor::register("alice", "short", None, Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Actor::register("al ice", "long-enough", None, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn attach_role_rederives_rider_class() {
        let mut actor = Actor::register("bob", "long-enough", None, Utc::now()).unwrap();
        assert_eq!(actor.rider_class, RiderClass::Regular);
        actor.attach_role(Some(&Role::new("STUDENT", false)));
        assert_eq!(actor.rider_class, RiderClass::Student);
    }
}

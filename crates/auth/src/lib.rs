//! `transitgate-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it defines
//! the identity entities, token and password hashing, the permission catalog
//! and the access-resolution rules. Persistence and transactions live in
//! `transitgate-infra`.

pub mod access;
pub mod actor;
pub mod capabilities;
pub mod catalog;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod session;

pub use access::{AccessExplanation, EffectiveRoutes, GrantSource, ensure_admin_not_shrunk};
pub use actor::{Actor, Profile, RiderClass, generate_scan_id};
pub use capabilities::{Capabilities, SCAN_VERIFY, Surface};
pub use catalog::{PermissionSeed, RoleSeed, default_permissions, default_roles};
pub use password::PasswordHash;
pub use permissions::{Permission, PermissionScope, normalize_route};
pub use roles::{Role, SystemRole};
pub use session::{Session, SessionToken, TokenHash};

//! Users, access tokens and roles

pub mod password;
pub mod roles;
pub mod tokens;

pub use password::{hash_password, is_hashed, verify_password};
pub use roles::{ADMIN_ROLE, Role, RoleMapping, RoleRegistry, bootstrap_roles};
pub use tokens::{
    ACCESS_TOKEN_MODEL, AccessToken, DEFAULT_TTL_SECONDS, TokenService, token_from_authorization,
};

//! Access control for remote methods
//!
//! Every model carries a list of ACL rules. A call is checked against the
//! rules that match the caller, the method and its access type; the most
//! specific matching rule decides. No matching rule means the call is denied.

use crate::core::method::AccessType;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of the caller, resolved from the access token
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthContext {
    /// No token, or an unknown / expired one
    #[default]
    Anonymous,

    /// Caller holding a valid access token
    User {
        user_id: Uuid,
        token_id: Uuid,
        roles: Vec<String>,
    },
}

impl AuthContext {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn token_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { token_id, .. } => Some(*token_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::User { .. })
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            AuthContext::Anonymous => false,
        }
    }
}

/// Resolves an access token into an [`AuthContext`]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn resolve(&self, token: Option<&str>) -> Result<AuthContext>;
}

/// Who an ACL rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Principal {
    Everyone,
    Authenticated,
    Unauthenticated,
    Owner,
    Role(String),
}

impl Principal {
    pub fn as_str(&self) -> &str {
        match self {
            Principal::Everyone => "$everyone",
            Principal::Authenticated => "$authenticated",
            Principal::Unauthenticated => "$unauthenticated",
            Principal::Owner => "$owner",
            Principal::Role(name) => name,
        }
    }

    /// Rank used to break ties between matching rules
    pub fn specificity(&self) -> u32 {
        match self {
            Principal::Everyone => 0,
            Principal::Authenticated | Principal::Unauthenticated => 1,
            Principal::Owner => 2,
            Principal::Role(_) => 3,
        }
    }

    pub fn matches(&self, context: &AuthContext, is_owner: bool) -> bool {
        match self {
            Principal::Everyone => true,
            Principal::Authenticated => context.is_authenticated(),
            Principal::Unauthenticated => !context.is_authenticated(),
            Principal::Owner => is_owner && context.is_authenticated(),
            Principal::Role(name) => context.has_role(name),
        }
    }
}

impl From<String> for Principal {
    fn from(value: String) -> Self {
        match value.as_str() {
            "$everyone" => Principal::Everyone,
            "$authenticated" => Principal::Authenticated,
            "$unauthenticated" => Principal::Unauthenticated,
            "$owner" => Principal::Owner,
            _ => Principal::Role(value),
        }
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Allow,
    Deny,
}

fn wildcard() -> String {
    "*".to_string()
}

/// One access control entry of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    pub principal: Principal,
    pub permission: Permission,

    /// Method name, or `*`
    #[serde(default = "wildcard")]
    pub property: String,

    /// `READ`, `WRITE`, `EXECUTE`, or `*`
    #[serde(default = "wildcard", alias = "accessType")]
    pub access_type: String,
}

/// The call being authorized
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub method: &'a str,
    pub access_type: AccessType,
    pub context: &'a AuthContext,
    pub is_owner: bool,
}

impl AclRule {
    pub fn new(principal: Principal, permission: Permission) -> Self {
        Self {
            principal,
            permission,
            property: wildcard(),
            access_type: wildcard(),
        }
    }

    pub fn on_property(mut self, property: &str) -> Self {
        self.property = property.to_string();
        self
    }

    pub fn on_access(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type.as_str().to_string();
        self
    }

    pub fn matches(&self, request: &AccessRequest<'_>) -> bool {
        (self.property == "*" || self.property == request.method)
            && (self.access_type == "*" || self.access_type == request.access_type.as_str())
            && self.principal.matches(request.context, request.is_owner)
    }

    pub fn score(&self) -> u32 {
        let property = if self.property == "*" { 0 } else { 100 };
        let access = if self.access_type == "*" { 0 } else { 10 };
        property + access + self.principal.specificity()
    }
}

/// Decide a call against a model's rules
pub fn resolve_permission(rules: &[AclRule], request: &AccessRequest<'_>) -> Permission {
    let mut best: Option<(u32, Permission)> = None;

    for rule in rules.iter().filter(|rule| rule.matches(request)) {
        let score = rule.score();
        best = match best {
            Some((top, _)) if score > top => Some((score, rule.permission)),
            Some((top, Permission::Allow)) if score == top => Some((score, rule.permission)),
            None => Some((score, rule.permission)),
            keep => keep,
        };
    }

    best.map_or(Permission::Deny, |(_, permission)| permission)
}

//! Access tokens
//!
//! A token is a record of the `accessToken` model; its id is the bearer
//! value clients send back in the `Authorization` header.

use crate::core::auth::{AuthContext, AuthProvider};
use crate::core::query::Where;
use crate::identity::roles::RoleRegistry;
use crate::storage::ModelStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Two weeks
pub const DEFAULT_TTL_SECONDS: i64 = 1_209_600;

pub const ACCESS_TOKEN_MODEL: &str = "accessToken";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: Uuid,

    /// Seconds; negative means the token never expires
    pub ttl: i64,

    pub created: DateTime<Utc>,

    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

impl AccessToken {
    pub fn new(user_id: Uuid, ttl: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ttl,
            created: Utc::now(),
            user_id,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ttl >= 0 && now >= self.created + Duration::seconds(self.ttl)
    }
}

/// Strip the optional `Bearer ` scheme from an `Authorization` value
pub fn token_from_authorization(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => value,
    }
}

/// Issues, looks up and revokes access tokens
pub struct TokenService {
    store: Arc<dyn ModelStore>,
    roles: Arc<RoleRegistry>,
    ttl: i64,
}

impl TokenService {
    pub fn new(store: Arc<dyn ModelStore>, roles: Arc<RoleRegistry>, ttl: i64) -> Self {
        Self { store, roles, ttl }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<AccessToken> {
        let token = AccessToken::new(user_id, self.ttl);
        let data = match serde_json::to_value(&token)? {
            Value::Object(data) => data,
            other => return Err(anyhow!("access token serialized to {}", other)),
        };

        self.store.create(ACCESS_TOKEN_MODEL, data).await?;
        Ok(token)
    }

    /// Valid token for a bearer value; expired tokens are removed
    pub async fn find(&self, value: &str) -> Result<Option<AccessToken>> {
        let Ok(id) = Uuid::parse_str(value) else {
            return Ok(None);
        };
        let Some(document) = self.store.get(ACCESS_TOKEN_MODEL, &id).await? else {
            return Ok(None);
        };

        let token: AccessToken = serde_json::from_value(document)?;
        if token.is_expired_at(Utc::now()) {
            tracing::debug!(token = %token.id, "removing expired access token");
            self.store.delete(ACCESS_TOKEN_MODEL, &token.id).await?;
            return Ok(None);
        }

        Ok(Some(token))
    }

    pub async fn revoke(&self, id: &Uuid) -> Result<bool> {
        self.store.delete(ACCESS_TOKEN_MODEL, id).await
    }

    /// Remove every token of a user
    pub async fn revoke_all(&self, user_id: &Uuid) -> Result<usize> {
        let mut owner = Where::new();
        owner.insert("userId".to_string(), Value::String(user_id.to_string()));
        self.store.delete_where(ACCESS_TOKEN_MODEL, Some(&owner)).await
    }
}

#[async_trait]
impl AuthProvider for TokenService {
    async fn resolve(&self, token: Option<&str>) -> Result<AuthContext> {
        let Some(value) = token.map(token_from_authorization).filter(|v| !v.is_empty()) else {
            return Ok(AuthContext::Anonymous);
        };

        match self.find(value).await? {
            Some(token) => Ok(AuthContext::User {
                user_id: token.user_id,
                token_id: token.id,
                roles: self.roles.roles_of(&token.user_id)?,
            }),
            None => Ok(AuthContext::Anonymous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryModelStore;

    fn service(ttl: i64) -> (TokenService, Arc<RoleRegistry>) {
        let roles = Arc::new(RoleRegistry::new());
        let store: Arc<dyn ModelStore> = Arc::new(InMemoryModelStore::new());
        (TokenService::new(store, roles.clone(), ttl), roles)
    }

    #[test]
    fn test_bearer_scheme_is_optional() {
        assert_eq!(token_from_authorization("abc"), "abc");
        assert_eq!(token_from_authorization("Bearer abc"), "abc");
        assert_eq!(token_from_authorization("bearer  abc "), "abc");
    }

    #[test]
    fn test_expiry() {
        let mut token = AccessToken::new(Uuid::new_v4(), 60);
        assert!(!token.is_expired_at(Utc::now()));
        assert!(token.is_expired_at(Utc::now() + Duration::seconds(61)));

        token.ttl = -1;
        assert!(!token.is_expired_at(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_serialized_shape() {
        let token = AccessToken::new(Uuid::new_v4(), DEFAULT_TTL_SECONDS);
        let value = serde_json::to_value(&token).unwrap();

        assert_eq!(value["ttl"], 1_209_600);
        assert_eq!(value["userId"], token.user_id.to_string());
        assert!(value["created"].is_string());
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let (tokens, roles) = service(DEFAULT_TTL_SECONDS);
        let user_id = Uuid::new_v4();
        roles.create_role("admin").unwrap();
        roles.assign_role(&user_id, "admin").unwrap();

        let token = tokens.issue(user_id).await.unwrap();
        let header = format!("Bearer {}", token.id);
        let context = tokens.resolve(Some(&header)).await.unwrap();

        assert_eq!(context.user_id(), Some(user_id));
        assert_eq!(context.token_id(), Some(token.id));
        assert!(context.has_role("admin"));
    }

    #[tokio::test]
    async fn test_unknown_and_missing_tokens_are_anonymous() {
        let (tokens, _) = service(DEFAULT_TTL_SECONDS);

        assert_eq!(tokens.resolve(None).await.unwrap(), AuthContext::Anonymous);
        assert_eq!(
            tokens.resolve(Some("not-a-token")).await.unwrap(),
            AuthContext::Anonymous
        );
        assert_eq!(
            tokens.resolve(Some(&Uuid::new_v4().to_string())).await.unwrap(),
            AuthContext::Anonymous
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_removed() {
        let (tokens, _) = service(0);
        let token = tokens.issue(Uuid::new_v4()).await.unwrap();

        assert!(tokens.find(&token.id.to_string()).await.unwrap().is_none());
        assert!(!tokens.revoke(&token.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (tokens, _) = service(DEFAULT_TTL_SECONDS);
        let user_id = Uuid::new_v4();
        tokens.issue(user_id).await.unwrap();
        tokens.issue(user_id).await.unwrap();
        tokens.issue(Uuid::new_v4()).await.unwrap();

        assert_eq!(tokens.revoke_all(&user_id).await.unwrap(), 2);
    }
}

//! User remote methods: `login` and `logout`

use super::{RemoteContext, Reply};
use crate::core::error::{ApiResult, RequestError};
use crate::core::query::Filter;
use crate::identity::{hash_password, is_hashed, verify_password};
use crate::server::host::AppHost;
use crate::storage::document_id;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Replace a plain `password` with its hash
pub(crate) fn hash_password_field(data: &mut Map<String, Value>) -> ApiResult<()> {
    if let Some(Value::String(password)) = data.get_mut("password") {
        if !is_hashed(password) {
            *password = hash_password(password)?;
        }
    }
    Ok(())
}

/// Drop everything tied to a deleted user
pub(crate) async fn forget_user(host: &AppHost, user_id: &Uuid) -> ApiResult<()> {
    let tokens = host.tokens.revoke_all(user_id).await?;
    let roles = host.roles.revoke_all(user_id)?;
    tracing::debug!(user = %user_id, tokens, roles, "removed user credentials");
    Ok(())
}

/// Exchange credentials for an access token
///
/// Body: `{"username" | "email", "password"}`.
pub async fn login(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let credentials: Credentials = serde_json::from_value(Value::Object(ctx.args.json_body()?))?;

    let filter = match (&credentials.username, &credentials.email) {
        (Some(username), _) => Filter::default().and_equals("username", Value::String(username.clone())),
        (None, Some(email)) => Filter::default().and_equals("email", Value::String(email.clone())),
        (None, None) => {
            return Err(RequestError::BadRequest {
                message: "username or email is required".to_string(),
            }
            .into());
        }
    };
    let password = credentials.password.unwrap_or_default();

    let user = ctx
        .host
        .store
        .find(ctx.model.name(), &filter)
        .await?
        .into_iter()
        .next()
        .filter(|user| {
            user.get("password")
                .and_then(Value::as_str)
                .is_some_and(|stored| verify_password(&password, stored))
        });

    let Some(user_id) = user.as_ref().and_then(document_id) else {
        tracing::debug!(model = ctx.model.name(), "login failed");
        return Err(RequestError::LoginFailed.into());
    };

    let token = ctx.host.tokens.issue(user_id).await?;
    tracing::info!(user = %user_id, "user logged in");
    Ok(Reply::Json(serde_json::to_value(token)?))
}

/// Revoke the caller's access token
pub async fn logout(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let token_id = ctx
        .auth
        .token_id()
        .ok_or(RequestError::AuthorizationRequired)?;

    ctx.host.tokens.revoke(&token_id).await?;
    Ok(Reply::Empty(StatusCode::NO_CONTENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_password_is_hashed_once() {
        let mut data = json!({"username": "a", "password": "secret"})
            .as_object()
            .cloned()
            .unwrap();

        hash_password_field(&mut data).unwrap();
        let hashed = data["password"].as_str().unwrap().to_string();
        assert!(verify_password("secret", &hashed));

        hash_password_field(&mut data).unwrap();
        assert_eq!(data["password"], hashed);
    }

    #[test]
    fn test_missing_password_is_left_alone() {
        let mut data = json!({"username": "a"}).as_object().cloned().unwrap();
        hash_password_field(&mut data).unwrap();
        assert!(!data.contains_key("password"));
    }
}

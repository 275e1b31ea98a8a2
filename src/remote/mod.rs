//! Remote method dispatch
//!
//! Every model route ends up in [`dispatch`], which runs a call through the
//! same pipeline:
//!
//! ```text
//! token ─▶ AuthContext ─▶ instance id ─▶ ownership ─▶ ACL ─▶ method ─▶ JSON reply
//! ```
//!
//! Instance methods reject ids that cannot name an instance before any
//! access check, so a static path swallowed by `/{id}` answers 404 for every
//! caller.

pub mod change_stream;
pub mod crud;
pub mod relations;
pub mod users;

use crate::core::auth::{AccessRequest, AuthContext, AuthProvider, Permission, resolve_permission};
use crate::core::error::{ApiError, ApiResult, ModelError, RequestError};
use crate::core::method::{BaseMethod, MethodScope};
use crate::core::model::{ModelHandle, Ownership, RemoteMethod};
use crate::core::query::QueryParams;
use crate::server::host::AppHost;
use axum::Json;
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// The remote method a route invokes
#[derive(Debug, Clone)]
pub struct Invocation {
    pub model: String,
    pub method: RemoteMethod,
}

/// Raw request data handed to a remote method
#[derive(Debug)]
pub struct RemoteArgs {
    /// `{id}` path parameter
    pub id: Option<String>,

    /// `{fk}` path parameter
    pub fk: Option<String>,

    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RemoteArgs {
    pub fn new(
        id: Option<String>,
        fk: Option<String>,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            id,
            fk,
            uri,
            headers,
            body,
        }
    }

    pub fn query(&self) -> ApiResult<QueryParams> {
        Query::<QueryParams>::try_from_uri(&self.uri)
            .map(|Query(params)| params)
            .map_err(|e| {
                RequestError::BadRequest {
                    message: e.body_text(),
                }
                .into()
            })
    }

    /// Access token from `Authorization`, else from `?access_token=`
    pub fn token(&self, query: &QueryParams) -> Option<String> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| query.access_token.clone())
    }

    /// JSON object body; an empty body is an empty object
    pub fn json_body(&self) -> ApiResult<Map<String, Value>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice::<Value>(&self.body)? {
            Value::Object(data) => Ok(data),
            _ => Err(RequestError::BadRequest {
                message: "Request body must be a JSON object".to_string(),
            }
            .into()),
        }
    }

    /// Related instance id from `{fk}`
    pub fn foreign_id(&self, model: &str) -> ApiResult<Uuid> {
        parse_id(model, self.fk.as_deref())
    }
}

fn parse_id(model: &str, raw: Option<&str>) -> ApiResult<Uuid> {
    let raw = raw.unwrap_or_default();
    Uuid::parse_str(raw).map_err(|_| {
        ModelError::NotFound {
            model: model.to_string(),
            id: raw.to_string(),
        }
        .into()
    })
}

/// What a remote method answers
pub enum Reply {
    /// 200 with a JSON body
    Json(Value),

    /// Status without a body
    Empty(StatusCode),

    /// Fully built response, e.g. an event stream
    Raw(Response),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(value) => Json(value).into_response(),
            Reply::Empty(status) => status.into_response(),
            Reply::Raw(response) => response,
        }
    }
}

/// An authorized call in progress
pub struct RemoteContext<'a> {
    pub host: &'a AppHost,
    pub model: &'a ModelHandle,
    pub auth: AuthContext,
    pub query: QueryParams,
    pub args: RemoteArgs,

    /// Target instance of an instance method
    pub instance_id: Option<Uuid>,
}

impl RemoteContext<'_> {
    pub fn id(&self) -> ApiResult<Uuid> {
        self.instance_id.ok_or_else(|| {
            RequestError::BadRequest {
                message: "An instance id is required".to_string(),
            }
            .into()
        })
    }
}

/// Run a call and render its outcome
pub async fn dispatch(host: Arc<AppHost>, invocation: Arc<Invocation>, args: RemoteArgs) -> Response {
    let handler = host.settings.error_handler;

    match invoke(&host, &invocation, args).await {
        Ok(reply) => reply.into_response(),
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() && handler.log {
                tracing::warn!(
                    model = %invocation.model,
                    method = %invocation.method,
                    "remote method failed: {}",
                    err
                );
            } else {
                tracing::debug!(
                    model = %invocation.model,
                    method = %invocation.method,
                    status = status.as_u16(),
                    "{}",
                    err
                );
            }
            err.render(handler.debug)
        }
    }
}

pub async fn invoke(host: &AppHost, invocation: &Invocation, args: RemoteArgs) -> ApiResult<Reply> {
    let model = host
        .model(&invocation.model)
        .ok_or_else(|| ModelError::UnknownModel {
            model: invocation.model.clone(),
        })?;

    let method_name = invocation.method.name();
    if !model.is_enabled(&method_name) {
        return Err(RequestError::MethodDisabled {
            model: model.name().to_string(),
            method: method_name,
        }
        .into());
    }

    let query = args.query()?;
    let token = args.token(&query);
    let auth = host.tokens.resolve(token.as_deref()).await?;

    let instance_id = match invocation.method.scope() {
        MethodScope::Instance => Some(parse_id(model.name(), args.id.as_deref())?),
        MethodScope::Static => None,
    };
    let is_owner = match &instance_id {
        Some(id) => is_owner(host, model, id, &auth).await?,
        None => false,
    };

    let request = AccessRequest {
        method: &method_name,
        access_type: invocation.method.access_type(),
        context: &auth,
        is_owner,
    };
    if resolve_permission(model.acls(), &request) == Permission::Deny {
        tracing::debug!(
            model = model.name(),
            method = %method_name,
            authenticated = auth.is_authenticated(),
            is_owner,
            "access denied"
        );
        return Err(RequestError::AuthorizationRequired.into());
    }

    let ctx = RemoteContext {
        host,
        model,
        auth,
        query,
        args,
        instance_id,
    };

    match &invocation.method {
        RemoteMethod::Base(method) => match method {
            BaseMethod::Create => crud::create(&ctx).await,
            BaseMethod::PatchOrCreate => crud::patch_or_create(&ctx).await,
            BaseMethod::ReplaceOrCreate => crud::replace_or_create(&ctx).await,
            BaseMethod::UpsertWithWhere => crud::upsert_with_where(&ctx).await,
            BaseMethod::Exists => crud::exists(&ctx).await,
            BaseMethod::FindById => crud::find_by_id(&ctx).await,
            BaseMethod::ReplaceById => crud::replace_by_id(&ctx).await,
            BaseMethod::Find => crud::find(&ctx).await,
            BaseMethod::FindOne => crud::find_one(&ctx).await,
            BaseMethod::UpdateAll => crud::update_all(&ctx).await,
            BaseMethod::DeleteById => crud::delete_by_id(&ctx).await,
            BaseMethod::Count => crud::count(&ctx).await,
            BaseMethod::PatchAttributes => crud::patch_attributes(&ctx).await,
            BaseMethod::CreateChangeStream => Ok(change_stream::open(&ctx)),
            BaseMethod::Login => users::login(&ctx).await,
            BaseMethod::Logout => users::logout(&ctx).await,
        },
        RemoteMethod::Relation { op, relation } => relations::execute(*op, relation, &ctx).await,
    }
}

/// Whether the caller owns the addressed instance
///
/// Anonymous callers own nothing. Users own themselves; other models are
/// loaded and their owner field compared with the caller.
async fn is_owner(
    host: &AppHost,
    model: &ModelHandle,
    id: &Uuid,
    auth: &AuthContext,
) -> ApiResult<bool> {
    let Some(user_id) = auth.user_id() else {
        return Ok(false);
    };

    match model.ownership() {
        Ownership::None => Ok(false),
        Ownership::Identity => Ok(*id == user_id),
        Ownership::Field(field) => {
            let owner = host
                .store
                .get(model.name(), id)
                .await
                .map_err(ApiError::from)?
                .and_then(|instance| instance.get(field).and_then(Value::as_str).map(str::to_string));
            Ok(owner.is_some_and(|owner| owner == user_id.to_string()))
        }
    }
}

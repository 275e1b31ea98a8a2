//! Generated CRUD remote methods
//!
//! The write helpers ([`insert`], [`patch`], [`replace`], [`remove`]) are
//! shared with the relation methods. They validate, keep the owner field in
//! place, hash user passwords and publish change events.

use super::{RemoteContext, Reply, users};
use crate::core::error::{ApiError, ApiResult, ModelError, RequestError, ValidationError};
use crate::core::events::ChangeType;
use crate::core::model::{ModelHandle, Ownership};
use crate::core::query::Filter;
use crate::core::validation::{FieldErrors, ValidationMode, uniqueness_fields, validate};
use crate::server::host::AppHost;
use crate::storage::document_id;
use serde_json::{Map, Value, json};
use uuid::Uuid;

pub(crate) fn not_found(model: &ModelHandle, id: &Uuid) -> ApiError {
    ModelError::NotFound {
        model: model.name().to_string(),
        id: id.to_string(),
    }
    .into()
}

/// Run declared rules plus the store-backed uniqueness checks
///
/// `current` is the instance being written, which never conflicts with itself.
pub(crate) async fn check(
    host: &AppHost,
    model: &ModelHandle,
    data: &Map<String, Value>,
    mode: ValidationMode,
    current: Option<&Uuid>,
) -> ApiResult<()> {
    let mut errors = validate(model.validations(), data, mode).err().unwrap_or_default();

    for (field, value) in uniqueness_fields(model.validations(), data) {
        let filter = Filter::default().and_equals(field, value.clone());
        let taken = host
            .store
            .find(model.name(), &filter)
            .await?
            .iter()
            .any(|other| document_id(other).as_ref() != current);
        if taken {
            errors
                .entry(field.to_string())
                .or_default()
                .push("is not unique".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(invalid(model, errors))
    }
}

fn invalid(model: &ModelHandle, fields: FieldErrors) -> ApiError {
    ValidationError::Invalid {
        model: model.name().to_string(),
        fields,
    }
    .into()
}

fn strip_protected(model: &ModelHandle, data: &mut Map<String, Value>) {
    data.remove("id");
    if let Ownership::Field(field) = model.ownership() {
        data.remove(field);
    }
}

/// Create an instance owned by `caller`
pub(crate) async fn insert(
    host: &AppHost,
    model: &ModelHandle,
    mut data: Map<String, Value>,
    caller: Option<Uuid>,
) -> ApiResult<Value> {
    model.stamp_owner(&mut data, caller);
    insert_stamped(host, model, data).await
}

/// Create an instance whose owner field is already set
pub(crate) async fn insert_stamped(
    host: &AppHost,
    model: &ModelHandle,
    mut data: Map<String, Value>,
) -> ApiResult<Value> {
    data.remove("id");
    check(host, model, &data, ValidationMode::Full, None).await?;
    if model.is_user_model() {
        users::hash_password_field(&mut data)?;
    }

    let created = host.store.create(model.name(), data).await?;
    let shown = model.present(created);
    if let Some(id) = document_id(&shown) {
        host.publish(ChangeType::Create, model, id, Some(shown.clone()));
    }
    Ok(shown)
}

/// Merge changes into an existing instance; its id and owner stay
pub(crate) async fn patch(
    host: &AppHost,
    model: &ModelHandle,
    id: &Uuid,
    mut changes: Map<String, Value>,
) -> ApiResult<Value> {
    if host.store.get(model.name(), id).await?.is_none() {
        return Err(not_found(model, id));
    }

    strip_protected(model, &mut changes);
    check(host, model, &changes, ValidationMode::Partial, Some(id)).await?;
    if model.is_user_model() {
        users::hash_password_field(&mut changes)?;
    }

    let updated = host
        .store
        .update(model.name(), id, changes)
        .await?
        .ok_or_else(|| not_found(model, id))?;
    let shown = model.present(updated);
    host.publish(ChangeType::Update, model, *id, Some(shown.clone()));
    Ok(shown)
}

/// Replace every field of an existing instance except its id and owner
///
/// A user replaced without a password keeps the current one.
pub(crate) async fn replace(
    host: &AppHost,
    model: &ModelHandle,
    id: &Uuid,
    mut data: Map<String, Value>,
) -> ApiResult<Value> {
    let existing = host
        .store
        .get(model.name(), id)
        .await?
        .ok_or_else(|| not_found(model, id))?;

    strip_protected(model, &mut data);
    if let Ownership::Field(field) = model.ownership() {
        if let Some(owner) = existing.get(field) {
            data.insert(field.clone(), owner.clone());
        }
    }
    if model.is_user_model() && !data.contains_key("password") {
        if let Some(password) = existing.get("password") {
            data.insert("password".to_string(), password.clone());
        }
    }

    check(host, model, &data, ValidationMode::Full, Some(id)).await?;
    if model.is_user_model() {
        users::hash_password_field(&mut data)?;
    }

    let replaced = host
        .store
        .replace(model.name(), id, data)
        .await?
        .ok_or_else(|| not_found(model, id))?;
    let shown = model.present(replaced);
    host.publish(ChangeType::Update, model, *id, Some(shown.clone()));
    Ok(shown)
}

/// Delete an instance; returns whether it existed
pub(crate) async fn remove(host: &AppHost, model: &ModelHandle, id: &Uuid) -> ApiResult<bool> {
    let removed = host.store.delete(model.name(), id).await?;
    if removed {
        if model.is_user_model() {
            users::forget_user(host, id).await?;
        }
        host.publish(ChangeType::Remove, model, *id, None);
    }
    Ok(removed)
}

/// Id carried in a request body, when it names an instance
async fn existing_body_id(
    ctx: &RemoteContext<'_>,
    data: &Map<String, Value>,
) -> ApiResult<Option<Uuid>> {
    let Some(id) = data
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
    else {
        return Ok(None);
    };
    let exists = ctx.host.store.get(ctx.model.name(), &id).await?.is_some();
    Ok(exists.then_some(id))
}

pub async fn create(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let data = ctx.args.json_body()?;
    let created = insert(ctx.host, ctx.model, data, ctx.auth.user_id()).await?;
    Ok(Reply::Json(created))
}

pub async fn patch_or_create(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let data = ctx.args.json_body()?;
    let instance = match existing_body_id(ctx, &data).await? {
        Some(id) => patch(ctx.host, ctx.model, &id, data).await?,
        None => insert(ctx.host, ctx.model, data, ctx.auth.user_id()).await?,
    };
    Ok(Reply::Json(instance))
}

pub async fn replace_or_create(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let data = ctx.args.json_body()?;
    let instance = match existing_body_id(ctx, &data).await? {
        Some(id) => replace(ctx.host, ctx.model, &id, data).await?,
        None => insert(ctx.host, ctx.model, data, ctx.auth.user_id()).await?,
    };
    Ok(Reply::Json(instance))
}

/// Patch the single instance matching `?where=`, or create one
pub async fn upsert_with_where(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let data = ctx.args.json_body()?;
    let where_clause = ctx.query.where_clause()?.unwrap_or_default();
    let matching = ctx
        .host
        .store
        .find(ctx.model.name(), &Filter::with_where(where_clause))
        .await?;

    let instance = match matching.as_slice() {
        [] => insert(ctx.host, ctx.model, data, ctx.auth.user_id()).await?,
        [only] => {
            let id = document_id(only).ok_or_else(|| {
                ApiError::Internal(format!("{} instance without an id", ctx.model.name()))
            })?;
            patch(ctx.host, ctx.model, &id, data).await?
        }
        _ => {
            return Err(RequestError::BadRequest {
                message: "There are multiple instances found. Upsert Operation will not be performed!"
                    .to_string(),
            }
            .into());
        }
    };
    Ok(Reply::Json(instance))
}

pub async fn exists(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let id = ctx.id()?;
    let found = ctx.host.store.get(ctx.model.name(), &id).await?.is_some();
    Ok(Reply::Json(json!({ "exists": found })))
}

pub async fn find_by_id(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let id = ctx.id()?;
    let instance = ctx
        .host
        .store
        .get(ctx.model.name(), &id)
        .await?
        .ok_or_else(|| not_found(ctx.model, &id))?;
    Ok(Reply::Json(ctx.model.present(instance)))
}

pub async fn replace_by_id(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let id = ctx.id()?;
    let data = ctx.args.json_body()?;
    Ok(Reply::Json(replace(ctx.host, ctx.model, &id, data).await?))
}

pub async fn patch_attributes(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let id = ctx.id()?;
    let changes = ctx.args.json_body()?;
    Ok(Reply::Json(patch(ctx.host, ctx.model, &id, changes).await?))
}

pub async fn find(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let filter = ctx.query.filter()?;
    let found = ctx.host.store.find(ctx.model.name(), &filter).await?;
    Ok(Reply::Json(Value::Array(
        found.into_iter().map(|doc| ctx.model.present(doc)).collect(),
    )))
}

pub async fn find_one(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let mut filter = ctx.query.filter()?;
    filter.limit = Some(1);

    let found = ctx.host.store.find(ctx.model.name(), &filter).await?;
    match found.into_iter().next() {
        Some(instance) => Ok(Reply::Json(ctx.model.present(instance))),
        None => Err(ModelError::NotFound {
            model: ctx.model.name().to_string(),
            id: ctx.query.filter.clone().unwrap_or_default(),
        }
        .into()),
    }
}

/// Patch every instance matching `?where=`
pub async fn update_all(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let where_clause = ctx.query.where_clause()?;
    let mut changes = ctx.args.json_body()?;
    strip_protected(ctx.model, &mut changes);

    let errors = validate(ctx.model.validations(), &changes, ValidationMode::Partial)
        .err()
        .unwrap_or_default();
    if !errors.is_empty() {
        return Err(invalid(ctx.model, errors));
    }
    if ctx.model.is_user_model() {
        users::hash_password_field(&mut changes)?;
    }

    let store = &ctx.host.store;
    let filter = Filter {
        where_clause: where_clause.clone(),
        ..Default::default()
    };
    let ids: Vec<Uuid> = store
        .find(ctx.model.name(), &filter)
        .await?
        .iter()
        .filter_map(document_id)
        .collect();

    let count = store
        .update_where(ctx.model.name(), where_clause.as_ref(), changes)
        .await?;

    for id in ids {
        if let Some(updated) = store.get(ctx.model.name(), &id).await? {
            let shown = ctx.model.present(updated);
            ctx.host.publish(ChangeType::Update, ctx.model, id, Some(shown));
        }
    }

    Ok(Reply::Json(json!({ "count": count })))
}

pub async fn delete_by_id(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let id = ctx.id()?;
    let removed = remove(ctx.host, ctx.model, &id).await?;
    Ok(Reply::Json(json!({ "count": usize::from(removed) })))
}

pub async fn count(ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let where_clause = ctx.query.where_clause()?;
    let count = ctx
        .host
        .store
        .count(ctx.model.name(), where_clause.as_ref())
        .await?;
    Ok(Reply::Json(json!({ "count": count })))
}

//! Relation remote methods (`prototype.__<op>__<relation>`)
//!
//! | kind             | related instances                                   |
//! |------------------|-----------------------------------------------------|
//! | `belongsTo`      | target whose id is stored in the source's key       |
//! | `hasOne`         | the target whose key holds the source id            |
//! | `hasMany`        | every target whose key holds the source id          |
//! | `hasManyThrough` | targets joined to the source by rows of `through`   |

use super::crud::{self, not_found};
use super::{RemoteContext, Reply};
use crate::core::error::{ApiError, ApiResult, ModelError, RequestError};
use crate::core::model::ModelHandle;
use crate::core::query::{Filter, Where};
use crate::core::relation::{RelationDefinition, RelationKind, RelationOp};
use crate::storage::document_id;
use axum::http::StatusCode;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// A relation resolved against the registry for one source instance
struct Related<'a> {
    definition: &'a RelationDefinition,
    target: &'a ModelHandle,
    source_id: Uuid,

    /// Key on the target (`has*`) or on the source (`belongsTo`)
    foreign_key: String,
}

impl Related<'_> {
    fn scope(&self) -> Where {
        let mut scope = Where::new();
        scope.insert(
            self.foreign_key.clone(),
            Value::String(self.source_id.to_string()),
        );
        scope
    }

    /// `?filter=` narrowed to the instances of this relation
    fn scoped_filter(&self, ctx: &RemoteContext<'_>) -> ApiResult<Filter> {
        Ok(ctx
            .query
            .filter()?
            .and_equals(&self.foreign_key, Value::String(self.source_id.to_string())))
    }
}

pub async fn execute(op: RelationOp, relation: &str, ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let model = ctx.model;
    let definition = model
        .relation(relation)
        .ok_or_else(|| ModelError::UnknownRelation {
            model: model.name().to_string(),
            relation: relation.to_string(),
        })?;
    let target = ctx
        .host
        .model(&definition.model)
        .ok_or_else(|| ModelError::UnknownModel {
            model: definition.model.clone(),
        })?;

    let source_id = ctx.id()?;
    let source = ctx
        .host
        .store
        .get(model.name(), &source_id)
        .await?
        .ok_or_else(|| not_found(model, &source_id))?;

    let related = Related {
        definition,
        target,
        source_id,
        foreign_key: definition.foreign_key_for(model.name()),
    };

    match definition.kind {
        RelationKind::BelongsTo => belongs_to(op, &related, &source, ctx).await,
        RelationKind::HasOne => has_one(op, &related, ctx).await,
        RelationKind::HasMany => has_many(op, &related, ctx).await,
        RelationKind::HasManyThrough => has_many_through(op, &related, ctx).await,
    }
}

fn unsupported(op: RelationOp, related: &Related<'_>) -> ApiError {
    RequestError::BadRequest {
        message: format!(
            "{} relation \"{}\" does not support {}",
            kind_name(related.definition.kind),
            related.definition.name,
            op.method_name(&related.definition.name)
        ),
    }
    .into()
}

fn kind_name(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::BelongsTo => "belongsTo",
        RelationKind::HasMany => "hasMany",
        RelationKind::HasManyThrough => "hasManyThrough",
        RelationKind::HasOne => "hasOne",
    }
}

fn no_content() -> Reply {
    Reply::Empty(StatusCode::NO_CONTENT)
}

fn presented(target: &ModelHandle, instances: Vec<Value>) -> Reply {
    Reply::Json(Value::Array(
        instances.into_iter().map(|doc| target.present(doc)).collect(),
    ))
}

/// Parent referenced by the source, `null` when unset or dangling
async fn belongs_to(
    op: RelationOp,
    related: &Related<'_>,
    source: &Value,
    ctx: &RemoteContext<'_>,
) -> ApiResult<Reply> {
    if op != RelationOp::Get {
        return Err(unsupported(op, related));
    }

    let Some(parent_id) = source
        .get(&related.foreign_key)
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
    else {
        return Ok(Reply::Json(Value::Null));
    };

    let parent = ctx
        .host
        .store
        .get(related.target.name(), &parent_id)
        .await?;
    Ok(Reply::Json(
        parent.map_or(Value::Null, |doc| related.target.present(doc)),
    ))
}

async fn has_one(op: RelationOp, related: &Related<'_>, ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let target = related.target;
    let store = &ctx.host.store;
    let existing = store
        .find(target.name(), &Filter::with_where(related.scope()))
        .await?
        .into_iter()
        .next();

    match op {
        RelationOp::Get => Ok(Reply::Json(
            existing.map_or(Value::Null, |doc| target.present(doc)),
        )),
        RelationOp::Create => {
            if existing.is_some() {
                return Err(RequestError::BadRequest {
                    message: format!(
                        "\"{}\" already has a related \"{}\"",
                        ctx.model.name(),
                        related.definition.name
                    ),
                }
                .into());
            }
            let created = create_scoped(related, ctx).await?;
            Ok(Reply::Json(created))
        }
        RelationOp::Update => {
            let id = existing
                .as_ref()
                .and_then(document_id)
                .ok_or_else(|| missing_related(related))?;
            let changes = scoped_changes(related, ctx)?;
            Ok(Reply::Json(crud::patch(ctx.host, target, &id, changes).await?))
        }
        RelationOp::Destroy => {
            if let Some(id) = existing.as_ref().and_then(document_id) {
                crud::remove(ctx.host, target, &id).await?;
            }
            Ok(no_content())
        }
        _ => Err(unsupported(op, related)),
    }
}

async fn has_many(op: RelationOp, related: &Related<'_>, ctx: &RemoteContext<'_>) -> ApiResult<Reply> {
    let target = related.target;
    let store = &ctx.host.store;

    match op {
        RelationOp::Get => {
            let found = store.find(target.name(), &related.scoped_filter(ctx)?).await?;
            Ok(presented(target, found))
        }
        RelationOp::Create => Ok(Reply::Json(create_scoped(related, ctx).await?)),
        RelationOp::Delete => {
            let ids: Vec<Uuid> = store
                .find(target.name(), &Filter::with_where(related.scope()))
                .await?
                .iter()
                .filter_map(document_id)
                .collect();
            for id in ids {
                crud::remove(ctx.host, target, &id).await?;
            }
            Ok(no_content())
        }
        RelationOp::Count => {
            let mut scope = ctx.query.where_clause()?.unwrap_or_default();
            scope.extend(related.scope());
            let count = store.count(target.name(), Some(&scope)).await?;
            Ok(Reply::Json(json!({ "count": count })))
        }
        RelationOp::FindById => {
            let (_, instance) = scoped_instance(related, ctx).await?;
            Ok(Reply::Json(target.present(instance)))
        }
        RelationOp::UpdateById => {
            let (id, _) = scoped_instance(related, ctx).await?;
            let changes = scoped_changes(related, ctx)?;
            Ok(Reply::Json(crud::patch(ctx.host, target, &id, changes).await?))
        }
        RelationOp::DestroyById => {
            let (id, _) = scoped_instance(related, ctx).await?;
            crud::remove(ctx.host, target, &id).await?;
            Ok(no_content())
        }
        _ => Err(unsupported(op, related)),
    }
}

async fn has_many_through(
    op: RelationOp,
    related: &Related<'_>,
    ctx: &RemoteContext<'_>,
) -> ApiResult<Reply> {
    let target = related.target;
    let through = through_model(related, ctx)?;
    let key_through = related.definition.key_through();
    let store = &ctx.host.store;

    match op {
        RelationOp::Get => {
            let filter = ctx.query.filter()?;
            let mut found = Vec::new();
            for id in linked_ids(related, through, &key_through, ctx).await? {
                if let Some(instance) = store.get(target.name(), &id).await? {
                    if filter.matches(&instance) {
                        found.push(instance);
                    }
                }
            }
            Ok(presented(target, filter.paginate(found)))
        }
        RelationOp::Create => {
            let created = crud::insert(
                ctx.host,
                target,
                ctx.args.json_body()?,
                ctx.auth.user_id(),
            )
            .await?;
            let target_id = document_id(&created).ok_or_else(|| {
                ApiError::Internal(format!("{} instance without an id", target.name()))
            })?;
            link(related, through, &key_through, &target_id, ctx).await?;
            Ok(Reply::Json(created))
        }
        RelationOp::Delete => {
            for id in linked_ids(related, through, &key_through, ctx).await? {
                crud::remove(ctx.host, target, &id).await?;
            }
            store
                .delete_where(through.name(), Some(&related.scope()))
                .await?;
            Ok(no_content())
        }
        RelationOp::Count => {
            let count = linked_ids(related, through, &key_through, ctx).await?.len();
            Ok(Reply::Json(json!({ "count": count })))
        }
        RelationOp::FindById => {
            let target_id = linked_target(related, through, &key_through, ctx).await?;
            let instance = store
                .get(target.name(), &target_id)
                .await?
                .ok_or_else(|| not_found(target, &target_id))?;
            Ok(Reply::Json(target.present(instance)))
        }
        RelationOp::UpdateById => {
            let target_id = linked_target(related, through, &key_through, ctx).await?;
            let changes = ctx.args.json_body()?;
            Ok(Reply::Json(
                crud::patch(ctx.host, target, &target_id, changes).await?,
            ))
        }
        RelationOp::DestroyById => {
            let target_id = linked_target(related, through, &key_through, ctx).await?;
            crud::remove(ctx.host, target, &target_id).await?;
            store
                .delete_where(through.name(), Some(&link_row(related, &key_through, &target_id)))
                .await?;
            Ok(no_content())
        }
        RelationOp::Exists => {
            let target_id = ctx.args.foreign_id(target.name())?;
            let row = link_row(related, &key_through, &target_id);
            let linked = store.count(through.name(), Some(&row)).await? > 0;
            Ok(Reply::Empty(if linked {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            }))
        }
        RelationOp::Link => {
            let target_id = ctx.args.foreign_id(target.name())?;
            if store.get(target.name(), &target_id).await?.is_none() {
                return Err(not_found(target, &target_id));
            }
            let row = link(related, through, &key_through, &target_id, ctx).await?;
            Ok(Reply::Json(row))
        }
        RelationOp::Unlink => {
            let target_id = ctx.args.foreign_id(target.name())?;
            store
                .delete_where(through.name(), Some(&link_row(related, &key_through, &target_id)))
                .await?;
            Ok(no_content())
        }
        _ => Err(unsupported(op, related)),
    }
}

fn missing_related(related: &Related<'_>) -> ApiError {
    ModelError::NotFound {
        model: related.target.name().to_string(),
        id: format!("{}={}", related.foreign_key, related.source_id),
    }
    .into()
}

/// Request body with the relation key pointing at the source
fn scoped_changes(related: &Related<'_>, ctx: &RemoteContext<'_>) -> ApiResult<Map<String, Value>> {
    let mut data = ctx.args.json_body()?;
    data.insert(
        related.foreign_key.clone(),
        Value::String(related.source_id.to_string()),
    );
    Ok(data)
}

/// Create a target whose relation key points at the source
async fn create_scoped(related: &Related<'_>, ctx: &RemoteContext<'_>) -> ApiResult<Value> {
    let mut data = ctx.args.json_body()?;
    related.target.stamp_owner(&mut data, ctx.auth.user_id());
    data.insert(
        related.foreign_key.clone(),
        Value::String(related.source_id.to_string()),
    );
    crud::insert_stamped(ctx.host, related.target, data).await
}

/// The `{fk}` instance, provided it belongs to the source
async fn scoped_instance(related: &Related<'_>, ctx: &RemoteContext<'_>) -> ApiResult<(Uuid, Value)> {
    let target = related.target;
    let id = ctx.args.foreign_id(target.name())?;
    let instance = ctx
        .host
        .store
        .get(target.name(), &id)
        .await?
        .filter(|doc| {
            doc.get(&related.foreign_key).and_then(Value::as_str)
                == Some(related.source_id.to_string().as_str())
        })
        .ok_or_else(|| not_found(target, &id))?;
    Ok((id, instance))
}

fn through_model<'a>(related: &Related<'_>, ctx: &RemoteContext<'a>) -> ApiResult<&'a ModelHandle> {
    let name = related.definition.through.as_deref().unwrap_or_default();
    ctx.host.model(name).ok_or_else(|| {
        ModelError::UnknownModel {
            model: name.to_string(),
        }
        .into()
    })
}

fn link_row(related: &Related<'_>, key_through: &str, target_id: &Uuid) -> Where {
    let mut row = related.scope();
    row.insert(key_through.to_string(), Value::String(target_id.to_string()));
    row
}

/// Target ids joined to the source, in link order
async fn linked_ids(
    related: &Related<'_>,
    through: &ModelHandle,
    key_through: &str,
    ctx: &RemoteContext<'_>,
) -> ApiResult<Vec<Uuid>> {
    let rows = ctx
        .host
        .store
        .find(through.name(), &Filter::with_where(related.scope()))
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get(key_through).and_then(Value::as_str))
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect())
}

/// The `{fk}` target, provided a link row joins it to the source
async fn linked_target(
    related: &Related<'_>,
    through: &ModelHandle,
    key_through: &str,
    ctx: &RemoteContext<'_>,
) -> ApiResult<Uuid> {
    let target_id = ctx.args.foreign_id(related.target.name())?;
    let row = link_row(related, key_through, &target_id);
    if ctx.host.store.count(through.name(), Some(&row)).await? == 0 {
        return Err(not_found(related.target, &target_id));
    }
    Ok(target_id)
}

/// Join a target to the source, reusing an existing row
async fn link(
    related: &Related<'_>,
    through: &ModelHandle,
    key_through: &str,
    target_id: &Uuid,
    ctx: &RemoteContext<'_>,
) -> ApiResult<Value> {
    let row = link_row(related, key_through, target_id);
    let existing = ctx
        .host
        .store
        .find(through.name(), &Filter::with_where(row.clone()))
        .await?
        .into_iter()
        .next();

    match existing {
        Some(row) => Ok(through.present(row)),
        None => crud::insert(ctx.host, through, row, ctx.auth.user_id()).await,
    }
}

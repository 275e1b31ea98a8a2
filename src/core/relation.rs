//! Relation definitions and the remote methods synthesized for them
//!
//! For every relation a model declares, the host synthesizes a fixed family
//! of twelve remote methods named `prototype.__<op>__<relation>`. Which of
//! them actually get an HTTP route depends on the relation kind.

use crate::core::method::{AccessType, HttpVerb};
use serde::{Deserialize, Serialize};

/// Kind of link between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    HasManyThrough,
    HasOne,
}

/// Operations synthesized for each relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationOp {
    FindById,
    DestroyById,
    UpdateById,
    Exists,
    Link,
    Get,
    Create,
    Update,
    Destroy,
    Unlink,
    Count,
    Delete,
}

impl RelationOp {
    pub const ALL: [RelationOp; 12] = [
        RelationOp::FindById,
        RelationOp::DestroyById,
        RelationOp::UpdateById,
        RelationOp::Exists,
        RelationOp::Link,
        RelationOp::Get,
        RelationOp::Create,
        RelationOp::Update,
        RelationOp::Destroy,
        RelationOp::Unlink,
        RelationOp::Count,
        RelationOp::Delete,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            RelationOp::FindById => "prototype.__findById__",
            RelationOp::DestroyById => "prototype.__destroyById__",
            RelationOp::UpdateById => "prototype.__updateById__",
            RelationOp::Exists => "prototype.__exists__",
            RelationOp::Link => "prototype.__link__",
            RelationOp::Get => "prototype.__get__",
            RelationOp::Create => "prototype.__create__",
            RelationOp::Update => "prototype.__update__",
            RelationOp::Destroy => "prototype.__destroy__",
            RelationOp::Unlink => "prototype.__unlink__",
            RelationOp::Count => "prototype.__count__",
            RelationOp::Delete => "prototype.__delete__",
        }
    }

    /// Remote method name of this operation on `relation`
    pub fn method_name(self, relation: &str) -> String {
        format!("{}{}", self.prefix(), relation)
    }

    /// Split a synthesized method name back into operation and relation
    pub fn parse(name: &str) -> Option<(RelationOp, &str)> {
        Self::ALL.iter().find_map(|op| {
            name.strip_prefix(op.prefix())
                .filter(|relation| !relation.is_empty())
                .map(|relation| (*op, relation))
        })
    }

    /// Verb and path suffix relative to `/{id}/<relation>`
    pub fn binding(self) -> (HttpVerb, &'static str) {
        match self {
            RelationOp::Get => (HttpVerb::Get, ""),
            RelationOp::Create => (HttpVerb::Post, ""),
            RelationOp::Update => (HttpVerb::Put, ""),
            RelationOp::Destroy | RelationOp::Delete => (HttpVerb::Delete, ""),
            RelationOp::Count => (HttpVerb::Get, "/count"),
            RelationOp::FindById => (HttpVerb::Get, "/{fk}"),
            RelationOp::UpdateById => (HttpVerb::Put, "/{fk}"),
            RelationOp::DestroyById => (HttpVerb::Delete, "/{fk}"),
            RelationOp::Exists => (HttpVerb::Head, "/rel/{fk}"),
            RelationOp::Link => (HttpVerb::Put, "/rel/{fk}"),
            RelationOp::Unlink => (HttpVerb::Delete, "/rel/{fk}"),
        }
    }

    pub fn access_type(self) -> AccessType {
        match self {
            RelationOp::FindById | RelationOp::Exists | RelationOp::Get | RelationOp::Count => {
                AccessType::Read
            }
            _ => AccessType::Write,
        }
    }

    /// Whether the operation addresses a single related instance (`{fk}`)
    pub fn takes_foreign_id(self) -> bool {
        self.binding().1.contains("{fk}")
    }
}

impl RelationKind {
    pub fn supported_ops(self) -> &'static [RelationOp] {
        use RelationOp::*;

        match self {
            RelationKind::BelongsTo => &[Get],
            RelationKind::HasOne => &[Get, Create, Update, Destroy],
            RelationKind::HasMany => {
                &[Get, Create, Delete, Count, FindById, UpdateById, DestroyById]
            }
            RelationKind::HasManyThrough => &[
                Get,
                Create,
                Delete,
                Count,
                FindById,
                UpdateById,
                DestroyById,
                Exists,
                Link,
                Unlink,
            ],
        }
    }

    pub fn supports(self, op: RelationOp) -> bool {
        self.supported_ops().contains(&op)
    }
}

/// The twelve remote method names synthesized for `relation`
pub fn relation_method_names(relation: &str) -> Vec<String> {
    RelationOp::ALL
        .iter()
        .map(|op| op.method_name(relation))
        .collect()
}

/// A relation declared by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    pub kind: RelationKind,

    /// Target model name
    pub model: String,

    #[serde(default, alias = "foreignKey")]
    pub foreign_key: Option<String>,

    /// Junction model for `hasManyThrough`
    #[serde(default)]
    pub through: Option<String>,

    #[serde(default, alias = "keyThrough")]
    pub key_through: Option<String>,
}

impl RelationDefinition {
    /// Foreign key column, defaulting the way the relation kind implies
    ///
    /// `belongsTo` keeps the key on the source (`<relation>Id`), the `has*`
    /// kinds keep it on the target (`<sourceModel>Id`).
    pub fn foreign_key_for(&self, source_model: &str) -> String {
        if let Some(key) = &self.foreign_key {
            return key.clone();
        }
        match self.kind {
            RelationKind::BelongsTo => format!("{}Id", self.name),
            _ => format!("{}Id", source_model),
        }
    }

    /// Key on the junction model pointing at the target
    pub fn key_through(&self) -> String {
        self.key_through
            .clone()
            .unwrap_or_else(|| format!("{}Id", self.model))
    }
}

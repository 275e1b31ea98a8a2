//! Remote method catalog
//!
//! Every model exposes the same closed set of generated methods. A method is
//! reachable through one or more HTTP bindings expressed relative to the
//! model's collection path (`/{plural}`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP verbs a binding can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Head => "HEAD",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of access a method performs, matched against ACL rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessType {
    Read,
    Write,
    Execute,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Read => "READ",
            AccessType::Write => "WRITE",
            AccessType::Execute => "EXECUTE",
        }
    }
}

/// Whether a method acts on the collection or on one instance (`{id}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodScope {
    Static,
    Instance,
}

/// One HTTP entry point of a method, relative to `/{plural}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub verb: HttpVerb,
    pub path: &'static str,
}

/// Methods generated for every persisted model, plus the user-only auth methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseMethod {
    Create,
    PatchOrCreate,
    ReplaceOrCreate,
    UpsertWithWhere,
    Exists,
    FindById,
    ReplaceById,
    Find,
    FindOne,
    UpdateAll,
    DeleteById,
    Count,
    PatchAttributes,
    CreateChangeStream,
    Login,
    Logout,
}

impl BaseMethod {
    /// Methods every persisted model carries
    pub const PERSISTED: [BaseMethod; 14] = [
        BaseMethod::Create,
        BaseMethod::PatchOrCreate,
        BaseMethod::ReplaceOrCreate,
        BaseMethod::UpsertWithWhere,
        BaseMethod::Exists,
        BaseMethod::FindById,
        BaseMethod::ReplaceById,
        BaseMethod::Find,
        BaseMethod::FindOne,
        BaseMethod::UpdateAll,
        BaseMethod::DeleteById,
        BaseMethod::Count,
        BaseMethod::PatchAttributes,
        BaseMethod::CreateChangeStream,
    ];

    /// Extra methods carried by models based on `User`
    pub const USER: [BaseMethod; 2] = [BaseMethod::Login, BaseMethod::Logout];

    pub fn name(self) -> &'static str {
        match self {
            BaseMethod::Create => "create",
            BaseMethod::PatchOrCreate => "patchOrCreate",
            BaseMethod::ReplaceOrCreate => "replaceOrCreate",
            BaseMethod::UpsertWithWhere => "upsertWithWhere",
            BaseMethod::Exists => "exists",
            BaseMethod::FindById => "findById",
            BaseMethod::ReplaceById => "replaceById",
            BaseMethod::Find => "find",
            BaseMethod::FindOne => "findOne",
            BaseMethod::UpdateAll => "updateAll",
            BaseMethod::DeleteById => "deleteById",
            BaseMethod::Count => "count",
            BaseMethod::PatchAttributes => "patchAttributes",
            BaseMethod::CreateChangeStream => "createChangeStream",
            BaseMethod::Login => "login",
            BaseMethod::Logout => "logout",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PERSISTED
            .iter()
            .chain(Self::USER.iter())
            .copied()
            .find(|method| method.name() == name)
    }

    /// HTTP bindings, the first one being the primary route
    pub fn bindings(self) -> &'static [Binding] {
        use HttpVerb::*;

        match self {
            BaseMethod::Create => &[Binding { verb: Post, path: "" }],
            BaseMethod::PatchOrCreate => &[Binding { verb: Patch, path: "" }],
            BaseMethod::ReplaceOrCreate => &[
                Binding { verb: Put, path: "" },
                Binding { verb: Post, path: "/replace" },
            ],
            BaseMethod::UpsertWithWhere => &[Binding {
                verb: Post,
                path: "/upsertWithWhere",
            }],
            BaseMethod::Exists => &[Binding { verb: Get, path: "/{id}/exists" }],
            BaseMethod::FindById => &[Binding { verb: Get, path: "/{id}" }],
            BaseMethod::ReplaceById => &[
                Binding { verb: Put, path: "/{id}" },
                Binding { verb: Post, path: "/{id}/replace" },
            ],
            BaseMethod::Find => &[Binding { verb: Get, path: "" }],
            BaseMethod::FindOne => &[Binding { verb: Get, path: "/findOne" }],
            BaseMethod::UpdateAll => &[Binding { verb: Post, path: "/update" }],
            BaseMethod::DeleteById => &[Binding { verb: Delete, path: "/{id}" }],
            BaseMethod::Count => &[Binding { verb: Get, path: "/count" }],
            BaseMethod::PatchAttributes => &[Binding { verb: Patch, path: "/{id}" }],
            BaseMethod::CreateChangeStream => &[
                Binding { verb: Get, path: "/change-stream" },
                Binding { verb: Post, path: "/change-stream" },
            ],
            BaseMethod::Login => &[Binding { verb: Post, path: "/login" }],
            BaseMethod::Logout => &[Binding { verb: Post, path: "/logout" }],
        }
    }

    pub fn access_type(self) -> AccessType {
        match self {
            BaseMethod::Exists
            | BaseMethod::FindById
            | BaseMethod::Find
            | BaseMethod::FindOne
            | BaseMethod::Count
            | BaseMethod::CreateChangeStream => AccessType::Read,
            BaseMethod::Login | BaseMethod::Logout => AccessType::Execute,
            _ => AccessType::Write,
        }
    }

    pub fn scope(self) -> MethodScope {
        match self {
            BaseMethod::Exists
            | BaseMethod::FindById
            | BaseMethod::ReplaceById
            | BaseMethod::DeleteById
            | BaseMethod::PatchAttributes => MethodScope::Instance,
            _ => MethodScope::Static,
        }
    }
}

impl fmt::Display for BaseMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base methods registered for a model
pub fn catalog(is_user_model: bool) -> Vec<BaseMethod> {
    let mut methods = BaseMethod::PERSISTED.to_vec();
    if is_user_model {
        methods.extend(BaseMethod::USER);
    }
    methods
}

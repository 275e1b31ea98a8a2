//! Registered models and their remote method surface

use crate::config::{ModelBase, ModelConfig};
use crate::core::auth::AclRule;
use crate::core::method::{AccessType, BaseMethod, HttpVerb, MethodScope, catalog};
use crate::core::relation::{RelationDefinition, RelationOp};
use crate::core::surface::RemoteMethodHost;
use crate::core::validation::ValidationRule;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// How the owner of an instance is determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// Nobody owns instances
    None,
    /// The instance is the user itself
    Identity,
    /// The instance stores its owner's user id in this field
    Field(String),
}

impl Ownership {
    pub fn from_config(owner: Option<&str>) -> Self {
        match owner {
            None => Ownership::None,
            Some("identity") => Ownership::Identity,
            Some(field) => Ownership::Field(field.to_string()),
        }
    }
}

/// A remote method of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMethod {
    Base(BaseMethod),
    Relation { op: RelationOp, relation: String },
}

impl RemoteMethod {
    pub fn name(&self) -> String {
        match self {
            RemoteMethod::Base(method) => method.name().to_string(),
            RemoteMethod::Relation { op, relation } => op.method_name(relation),
        }
    }

    pub fn access_type(&self) -> AccessType {
        match self {
            RemoteMethod::Base(method) => method.access_type(),
            RemoteMethod::Relation { op, .. } => op.access_type(),
        }
    }

    /// Relation methods always act on an instance of the source model
    pub fn scope(&self) -> MethodScope {
        match self {
            RemoteMethod::Base(method) => method.scope(),
            RemoteMethod::Relation { .. } => MethodScope::Instance,
        }
    }
}

impl fmt::Display for RemoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A route to register for a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub method: RemoteMethod,
    pub verb: HttpVerb,

    /// Relative to the REST root, e.g. `/interactions/{id}/job`
    pub path: String,
}

impl MethodBinding {
    /// Number of path parameters (`{id}`, `{fk}`)
    pub fn path_params(&self) -> usize {
        self.path.matches('{').count()
    }
}

/// A model as registered with the application
#[derive(Debug, Clone)]
pub struct ModelHandle {
    name: String,
    plural: String,
    config: ModelConfig,
    ownership: Ownership,
    methods: Vec<BaseMethod>,
    disabled: BTreeSet<String>,
}

impl ModelHandle {
    pub fn new(name: &str, config: ModelConfig) -> Self {
        Self {
            name: name.to_string(),
            plural: config.plural_for(name),
            ownership: Ownership::from_config(config.owner.as_deref()),
            methods: catalog(config.base == ModelBase::User),
            disabled: BTreeSet::new(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn is_public(&self) -> bool {
        self.config.public
    }

    pub fn is_user_model(&self) -> bool {
        self.config.base == ModelBase::User
    }

    pub fn data_source(&self) -> &str {
        &self.config.data_source
    }

    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    pub fn acls(&self) -> &[AclRule] {
        &self.config.acls
    }

    pub fn validations(&self) -> &[ValidationRule] {
        &self.config.validations
    }

    pub fn enabled_methods(&self) -> &[String] {
        &self.config.enabled_methods
    }

    pub fn relations(&self) -> &[RelationDefinition] {
        self.config.relations()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations().iter().find(|relation| relation.name == name)
    }

    pub fn is_enabled(&self, method: &str) -> bool {
        !self.disabled.contains(method)
    }

    pub fn disabled_methods(&self) -> &BTreeSet<String> {
        &self.disabled
    }

    /// Remove hidden fields before an instance leaves the server
    pub fn present(&self, mut instance: Value) -> Value {
        if let Value::Object(fields) = &mut instance {
            for hidden in &self.config.hidden {
                fields.remove(hidden);
            }
        }
        instance
    }

    /// Owner field value for a new instance created by `user_id`
    pub fn stamp_owner(&self, data: &mut Map<String, Value>, user_id: Option<uuid::Uuid>) {
        if let (Ownership::Field(field), Some(user_id)) = (&self.ownership, user_id) {
            data.insert(field.clone(), Value::String(user_id.to_string()));
        }
    }

    /// Routes of every enabled method, relation methods limited to what the relation kind supports
    pub fn bindings(&self) -> Vec<MethodBinding> {
        let mut bindings = Vec::new();

        for method in self.methods.iter().filter(|m| self.is_enabled(m.name())) {
            for binding in method.bindings() {
                bindings.push(MethodBinding {
                    method: RemoteMethod::Base(*method),
                    verb: binding.verb,
                    path: format!("/{}{}", self.plural, binding.path),
                });
            }
        }

        for relation in self.relations() {
            for op in relation.kind.supported_ops() {
                if !self.is_enabled(&op.method_name(&relation.name)) {
                    continue;
                }
                let (verb, suffix) = op.binding();
                bindings.push(MethodBinding {
                    method: RemoteMethod::Relation {
                        op: *op,
                        relation: relation.name.clone(),
                    },
                    verb,
                    path: format!("/{}/{{id}}/{}{}", self.plural, relation.name, suffix),
                });
            }
        }

        bindings
    }
}

impl RemoteMethodHost for ModelHandle {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn remote_method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name().to_string()).collect()
    }

    fn relation_names(&self) -> Vec<String> {
        self.relations().iter().map(|r| r.name.clone()).collect()
    }

    fn disable_remote_method_by_name(&mut self, name: &str) {
        self.disabled.insert(name.to_string());
    }
}

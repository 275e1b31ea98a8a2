//! Endpoint allow-list enforcement
//!
//! A model's externally callable surface is restricted to an explicit
//! allow-list. Everything the model registers (base methods plus the
//! methods synthesized for each relation) that is not listed gets disabled,
//! so anything unknown to the allow-list fails closed.
//!
//! The decision itself is a pure function ([`compute_allowed_surface`]);
//! [`disable_all_methods_with_exceptions`] applies it to anything that
//! implements [`RemoteMethodHost`].

use crate::core::relation::relation_method_names;
use std::collections::BTreeSet;

/// What the enforcer needs from a model
pub trait RemoteMethodHost {
    /// Name used when reporting on this host
    fn model_name(&self) -> &str;

    /// Names of every remote method registered on the model
    fn remote_method_names(&self) -> Vec<String>;

    /// Names of the declared relations (empty when the model has none)
    fn relation_names(&self) -> Vec<String>;

    /// Make a method unreachable. Disabling twice is a no-op.
    fn disable_remote_method_by_name(&mut self, name: &str);
}

/// Outcome of applying an allow-list to a method surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceDecision {
    /// Methods that stay invokable
    pub exposed: BTreeSet<String>,

    /// Methods to disable
    pub hidden: BTreeSet<String>,

    /// Allow-list entries that matched no method
    pub unmatched: BTreeSet<String>,
}

/// Strip an alternate-binding suffix: `replaceById$post` -> `replaceById`
pub fn base_name(entry: &str) -> &str {
    entry.split_once('$').map_or(entry, |(name, _)| name)
}

/// Partition a model's full surface into exposed and hidden methods
pub fn compute_allowed_surface(
    all_methods: &[String],
    relation_names: &[String],
    allow_list: &[String],
) -> SurfaceDecision {
    let allowed: BTreeSet<&str> = allow_list.iter().map(|entry| base_name(entry)).collect();

    let mut surface: BTreeSet<String> = all_methods.iter().cloned().collect();
    for relation in relation_names {
        surface.extend(relation_method_names(relation));
    }

    let (exposed, hidden): (BTreeSet<String>, BTreeSet<String>) = surface
        .into_iter()
        .partition(|name| allowed.contains(name.as_str()));

    let unmatched = allowed
        .into_iter()
        .filter(|name| !exposed.contains(*name))
        .map(String::from)
        .collect();

    SurfaceDecision {
        exposed,
        hidden,
        unmatched,
    }
}

/// Disable every method of `host` that `methods_to_expose` does not name
pub fn disable_all_methods_with_exceptions<H>(host: &mut H, methods_to_expose: &[String])
where
    H: RemoteMethodHost + ?Sized,
{
    let decision = compute_allowed_surface(
        &host.remote_method_names(),
        &host.relation_names(),
        methods_to_expose,
    );

    for name in &decision.unmatched {
        tracing::warn!(
            model = host.model_name(),
            "allow-list entry '{}' matches no remote method",
            name
        );
    }

    if decision.hidden.is_empty() {
        return;
    }

    let hidden: Vec<&str> = decision.hidden.iter().map(String::as_str).collect();
    tracing::info!(
        model = host.model_name(),
        "hiding remote methods: {}",
        hidden.join(", ")
    );

    for name in &decision.hidden {
        host.disable_remote_method_by_name(name);
    }
}

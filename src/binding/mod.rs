//! Service binding through environment variables.
//!
//! A binding has no storage of its own. Binding service `rails-postgres`
//! to an application writes these keys onto the application's deployment:
//!
//! ```text
//! RAILS_POSTGRES_USER=...
//! RAILS_POSTGRES_PASSWORD=...
//! RAILS_POSTGRES_DATABASE=...
//! RAILS_POSTGRES_LABEL=postgresql
//! CF_BOUND_SERVICES=... RAILS_POSTGRES
//! ```
//!
//! A prefix is listed in `CF_BOUND_SERVICES` exactly when its keys are
//! present, so every bind or unbind goes out as a single environment write.
//! Nothing in this module performs I/O.

use crate::platform::{DELETION_MARKER, EnvMap};

/// Space-separated list of bound prefixes.
pub const BOUND_SERVICES: &str = "CF_BOUND_SERVICES";
/// Buildpack source applied by the build config.
pub const BUILDPACK_URL: &str = "BUILDPACK_URL";
/// Memory limit exposed to the running application.
pub const MEMORY_LIMIT: &str = "MEMORY_LIMIT";
/// Start command override.
pub const CF_COMMAND: &str = "CF_COMMAND";

/// Key markers of recognized database images, in scan order.
pub const LABEL_FAMILIES: [(&str, &str); 3] = [
    ("POSTGRESQL", "postgresql"),
    ("MYSQL", "mysql"),
    ("MONGODB", "mongodb"),
];

/// Credential keys copied from the service into the binding.
pub const CREDENTIAL_SUFFIXES: [&str; 3] = ["_USER", "_PASSWORD", "_DATABASE"];

const LABEL_SUFFIX: &str = "_LABEL";

/// Canonical environment prefix for a service name.
///
/// # Example
/// ```
/// use ocf::binding::binding_prefix;
/// assert_eq!(binding_prefix("rails-postgres"), "RAILS_POSTGRES");
/// ```
pub fn binding_prefix(service: &str) -> String {
    service.replace('-', "_").to_uppercase()
}

/// Derive the binding keys for `prefix` from a service's own environment.
///
/// The label comes from the last recognized family seen while scanning
/// keys in order; it is empty when no family matches. Credentials are
/// copied from any key ending in `_USER`, `_PASSWORD` or `_DATABASE`.
pub fn derive_binding_env(service_env: &EnvMap, prefix: &str) -> EnvMap {
    let mut env = EnvMap::new();

    let mut label = "";
    let mut families: Vec<&str> = Vec::new();
    for key in service_env.keys() {
        if let Some((_, family)) = LABEL_FAMILIES
            .iter()
            .find(|(marker, _)| key.starts_with(marker))
        {
            label = *family;
            if !families.contains(family) {
                families.push(*family);
            }
        }
    }
    if families.len() > 1 {
        tracing::warn!(
            prefix,
            families = ?families,
            label,
            "service environment matches several database families"
        );
    }

    for (key, value) in service_env {
        if let Some(suffix) = CREDENTIAL_SUFFIXES
            .iter()
            .find(|suffix| key.ends_with(*suffix))
        {
            env.insert(format!("{}{}", prefix, suffix), value.clone());
        }
    }

    env.insert(format!("{}{}", prefix, LABEL_SUFFIX), label.to_string());
    env
}

/// Prefixes listed in `CF_BOUND_SERVICES`, in order.
pub fn bound_prefixes(env: &EnvMap) -> Vec<String> {
    env.get(BOUND_SERVICES)
        .map(|bound| bound.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Whether `prefix` appears as a whole token in a bound-services value.
pub fn is_bound(bound: &str, prefix: &str) -> bool {
    !prefix.is_empty() && bound.split_whitespace().any(|token| token == prefix)
}

/// Append `prefix` to a bound-services value.
pub fn append_bound(bound: &str, prefix: &str) -> String {
    format!("{} {}", bound, prefix).trim_start().to_string()
}

/// Remove `prefix` from a bound-services value.
pub fn remove_bound(bound: &str, prefix: &str) -> String {
    bound
        .split_whitespace()
        .filter(|token| *token != prefix)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Environment delta that binds a service under `prefix`.
///
/// Returns `None` when the prefix is already bound.
pub fn binding_delta(app_env: &EnvMap, service_env: &EnvMap, prefix: &str) -> Option<EnvMap> {
    let bound = app_env.get(BOUND_SERVICES).map(String::as_str).unwrap_or("");
    if is_bound(bound, prefix) {
        return None;
    }

    let mut delta = derive_binding_env(service_env, prefix);
    delta.insert(BOUND_SERVICES.to_string(), append_bound(bound, prefix));
    Some(delta)
}

/// Environment delta that removes the binding for `prefix`.
///
/// Every key owned by the prefix is set to the deletion marker, except
/// keys owned by another bound prefix that extends this one
/// (`FOO_BAR_USER` stays when unbinding `FOO` while `FOO_BAR` is bound).
/// Returns `None` when the prefix is not bound.
pub fn unbinding_delta(app_env: &EnvMap, prefix: &str) -> Option<EnvMap> {
    let bound = app_env.get(BOUND_SERVICES).map(String::as_str).unwrap_or("");
    if !is_bound(bound, prefix) {
        return None;
    }

    let owned = format!("{}_", prefix);
    let others: Vec<String> = bound_prefixes(app_env)
        .into_iter()
        .filter(|other| other != prefix && other.starts_with(&owned))
        .map(|other| format!("{}_", other))
        .collect();

    let mut delta = EnvMap::new();
    for key in app_env.keys() {
        if key.starts_with(&owned) && !others.iter().any(|other| key.starts_with(other)) {
            delta.insert(key.clone(), DELETION_MARKER.to_string());
        }
    }
    delta.insert(BOUND_SERVICES.to_string(), remove_bound(bound, prefix));
    Some(delta)
}

//! Option resolution across declaration scopes
//!
//! Every scope (global defaults, directory or namespace, class) is an
//! option map. Besides plain keys it may hold:
//! - `methods`: method name (or `*`) to option map
//! - `before` / `after`: a hook list for every method, or a map from
//!   method name (or `*`) to hook list
//! - `di`: property to type map, or a map from method name (or `*`) to
//!   such a map
//!
//! For each method, a scope contributes its plain keys, then
//! `methods["*"]`, then `methods[method]`. Scopes are then merged in
//! increasing precedence with the merge policy.

use crate::entity::{CallableEntity, HookCall, WILDCARD};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tether_config::MergePolicy;
use tether_core::{CallableKind, Options, Result, SetupError};

/// Keys with a structure interpreted by the resolver
const STRUCTURED_KEYS: &[&str] = &["methods", "before", "after", "di"];

/// Keys describing a declaration scope rather than its callables
pub(crate) const SCOPE_KEYS: &[&str] = &[
    "classes",
    "directory",
    "namespace",
    "separator",
    "extensions",
    "include",
];

/// Identity of the entity being built
#[derive(Debug, Clone)]
pub(crate) struct EntityIdentity {
    pub(crate) qualified_name: String,
    pub(crate) external_name: String,
    pub(crate) kind: CallableKind,
    pub(crate) separator: char,
    pub(crate) timestamp: u64,
}

/// Merge scopes, lowest precedence first, into an entity
pub(crate) fn build_entity(
    identity: EntityIdentity,
    scopes: &[&Options],
    policy: &MergePolicy,
) -> Result<CallableEntity> {
    let owner = identity.qualified_name.as_str();

    let mut methods = BTreeSet::new();
    methods.insert(WILDCARD.to_string());
    for scope in scopes {
        collect_methods(owner, scope, &mut methods)?;
    }

    let mut per_method_options = BTreeMap::new();
    let mut before_hooks = BTreeMap::new();
    let mut after_hooks = BTreeMap::new();
    let mut di_bindings = BTreeMap::new();

    for method in &methods {
        let layers = scopes
            .iter()
            .map(|scope| method_layer(owner, scope, method, policy))
            .collect::<Result<Vec<_>>>()?;
        let merged = policy.merge(&layers);

        before_hooks.insert(method.clone(), hooks(owner, merged.get("before"))?);
        after_hooks.insert(method.clone(), hooks(owner, merged.get("after"))?);
        if let Some(bindings) = bindings(owner, merged.get("di"))? {
            di_bindings.insert(method.clone(), bindings);
        }

        per_method_options.insert(method.clone(), merged);
    }

    let protected_methods = per_method_options
        .get(WILDCARD)
        .and_then(|options| options.get("protected"))
        .map(|value| string_list(owner, "protected", value))
        .transpose()?
        .unwrap_or_default()
        .into_iter()
        .collect();

    Ok(CallableEntity {
        qualified_name: identity.qualified_name,
        external_name: identity.external_name,
        kind: identity.kind,
        separator: identity.separator,
        protected_methods,
        before_hooks,
        after_hooks,
        di_bindings,
        per_method_options,
        source_timestamp: identity.timestamp,
    })
}

/// Options one scope contributes to one method
fn method_layer(owner: &str, scope: &Options, method: &str, policy: &MergePolicy) -> Result<Options> {
    let mut plain = scope.clone();
    for key in STRUCTURED_KEYS.iter().chain(SCOPE_KEYS) {
        plain.remove(*key);
    }

    let mut layers = vec![plain];

    if let Some(methods) = object(owner, scope, "methods")? {
        for key in keys_for(method) {
            match methods.get(key) {
                None => {}
                Some(Value::Object(options)) => layers.push(options.clone()),
                Some(_) => {
                    return Err(SetupError::malformed(
                        owner,
                        format!("options of method '{key}' must be a map"),
                    )
                    .into());
                }
            }
        }
    }

    let mut structured = Options::new();
    for key in ["before", "after"] {
        let declared = hooks_declared(owner, scope, key, method)?;
        if !declared.is_empty() {
            structured.insert(key.to_string(), Value::Array(declared));
        }
    }
    if let Some(di) = di_declared(owner, scope, method)? {
        structured.insert("di".to_string(), Value::Object(di));
    }
    layers.push(structured);

    Ok(policy.merge(&layers))
}

/// `*` first, then the method itself
fn keys_for(method: &str) -> Vec<&str> {
    if method == WILDCARD {
        vec![WILDCARD]
    } else {
        vec![WILDCARD, method]
    }
}

fn object<'a>(owner: &str, scope: &'a Options, key: &str) -> Result<Option<&'a Options>> {
    match scope.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(SetupError::malformed(owner, format!("'{key}' must be a map")).into()),
    }
}

fn hooks_declared(owner: &str, scope: &Options, key: &str, method: &str) -> Result<Vec<Value>> {
    match scope.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => Ok(list.clone()),
        Some(Value::String(hook)) => Ok(vec![Value::String(hook.clone())]),
        Some(Value::Object(by_method)) => {
            let mut declared = Vec::new();
            for k in keys_for(method) {
                match by_method.get(k) {
                    None | Some(Value::Null) => {}
                    Some(Value::Array(list)) => declared.extend(list.iter().cloned()),
                    Some(hook @ (Value::String(_) | Value::Object(_))) => declared.push(hook.clone()),
                    Some(other) => {
                        return Err(SetupError::malformed(
                            owner,
                            format!("invalid '{key}' hooks for '{k}': {other}"),
                        )
                        .into());
                    }
                }
            }
            Ok(declared)
        }
        Some(other) => {
            Err(SetupError::malformed(owner, format!("invalid '{key}' hooks: {other}")).into())
        }
    }
}

fn di_declared(owner: &str, scope: &Options, method: &str) -> Result<Option<Options>> {
    let Some(di) = object(owner, scope, "di")? else {
        return Ok(None);
    };

    // A flat property map applies to every method
    if di.values().all(Value::is_string) {
        return Ok((!di.is_empty()).then(|| di.clone()));
    }

    let mut record = Options::new();
    for k in keys_for(method) {
        match di.get(k) {
            None => {}
            Some(Value::Object(bindings)) => {
                record.extend(bindings.iter().map(|(p, t)| (p.clone(), t.clone())));
            }
            Some(_) => {
                return Err(
                    SetupError::malformed(owner, format!("'di' for '{k}' must be a map")).into(),
                );
            }
        }
    }

    Ok((!record.is_empty()).then_some(record))
}

fn collect_methods(owner: &str, scope: &Options, methods: &mut BTreeSet<String>) -> Result<()> {
    for key in ["methods", "before", "after"] {
        if let Some(Value::Object(by_method)) = scope.get(key) {
            methods.extend(by_method.keys().cloned());
        }
    }

    if let Some(di) = object(owner, scope, "di")? {
        if !di.values().all(Value::is_string) {
            methods.extend(di.keys().cloned());
        }
    }

    Ok(())
}

fn hooks(owner: &str, value: Option<&Value>) -> Result<Vec<HookCall>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(list)) => list.iter().map(|hook| HookCall::parse(owner, hook)).collect(),
        Some(other) => HookCall::parse(owner, other).map(|hook| vec![hook]),
    }
}

fn bindings(owner: &str, value: Option<&Value>) -> Result<Option<BTreeMap<String, String>>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let Value::Object(map) = value else {
        return Err(SetupError::malformed(owner, "'di' must be a map").into());
    };

    map.iter()
        .map(|(property, ty)| match ty.as_str() {
            Some(ty) => Ok((property.clone(), ty.to_string())),
            None => Err(SetupError::malformed(
                owner,
                format!("'di' type of '{property}' must be a string"),
            )
            .into()),
        })
        .collect::<Result<BTreeMap<_, _>>>()
        .map(Some)
}

fn string_list(owner: &str, key: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    SetupError::malformed(owner, format!("'{key}' must list strings")).into()
                })
            })
            .collect(),
        _ => Err(SetupError::malformed(owner, format!("'{key}' must be a list")).into()),
    }
}

//! Entity identities inside cached payloads.
//!
//! Any JSON object carrying the identity field is an entity. Its key is
//! `<__typename>:<id>` when the object names its type, otherwise the id alone.

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// The normalized identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(Arc<str>);

impl EntityKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Derives the key of `object`, if it is an entity.
    pub fn of(object: &Map<String, Value>, field: &str) -> Option<Self> {
        let id = match object.get(field)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        match object.get("__typename").and_then(Value::as_str) {
            Some(typename) => Some(Self::new(format!("{}:{}", typename, id))),
            None => Some(Self::new(id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every entity key found anywhere in `value`.
pub fn collect_keys(value: &Value, field: &str) -> FxHashSet<EntityKey> {
    let mut keys = FxHashSet::default();
    visit(value, &mut |object| {
        if let Some(key) = EntityKey::of(object, field) {
            keys.insert(key);
        }
    });
    keys
}

/// Every entity object found anywhere in `value`, outermost first.
pub fn collect_entities(value: &Value, field: &str) -> Vec<(EntityKey, Map<String, Value>)> {
    let mut entities = Vec::new();
    visit(value, &mut |object| {
        if let Some(key) = EntityKey::of(object, field) {
            entities.push((key, object.clone()));
        }
    });
    entities
}

fn visit<'v>(value: &'v Value, f: &mut impl FnMut(&'v Map<String, Value>)) {
    match value {
        Value::Object(object) => {
            f(object);
            for child in object.values() {
                visit(child, f);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, f);
            }
        }
        _ => {}
    }
}

/// Overwrites the fields of every occurrence of `key` with those of `entity`.
///
/// Returns true if anything changed.
pub fn merge_entity(
    value: &mut Value,
    key: &EntityKey,
    entity: &Map<String, Value>,
    field: &str,
) -> bool {
    match value {
        Value::Object(object) => {
            if EntityKey::of(object, field).as_ref() == Some(key) {
                let mut changed = false;
                for (name, incoming) in entity {
                    if object.get(name) != Some(incoming) {
                        object.insert(name.clone(), incoming.clone());
                        changed = true;
                    }
                }
                return changed;
            }
            let mut changed = false;
            for child in object.values_mut() {
                changed |= merge_entity(child, key, entity, field);
            }
            changed
        }
        Value::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= merge_entity(item, key, entity, field);
            }
            changed
        }
        _ => false,
    }
}

/// Removes every occurrence of `key`: list items are dropped, single fields
/// become `null`.
///
/// Returns true if anything changed.
pub fn evict_entity(value: &mut Value, key: &EntityKey, field: &str) -> bool {
    let matches = |v: &Value| match v {
        Value::Object(object) => EntityKey::of(object, field).as_ref() == Some(key),
        _ => false,
    };

    match value {
        Value::Object(object) => {
            let mut changed = false;
            for child in object.values_mut() {
                if matches(child) {
                    *child = Value::Null;
                    changed = true;
                } else {
                    changed |= evict_entity(child, key, field);
                }
            }
            changed
        }
        Value::Array(items) => {
            let before = items.len();
            items.retain(|item| !matches(item));
            let mut changed = items.len() != before;
            for item in items {
                changed |= evict_entity(item, key, field);
            }
            changed
        }
        _ => false,
    }
}

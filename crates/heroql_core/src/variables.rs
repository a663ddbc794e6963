//! Variables bound to an operation at call time.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::error::ValidationError;
use crate::operation::VariableSchema;
use crate::types::describe;

/// A variables object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(Map<String, Value>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds one variable, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts a JSON object into variables.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ValidationError::NotAnObject(describe(&other))),
        }
    }

    /// Serializes a record (e.g. an entity) into variables, one per field.
    pub fn from_record<T: Serialize + ?Sized>(record: &T) -> Result<Self, ValidationError> {
        let value = serde_json::to_value(record)
            .map_err(|e| ValidationError::Serialize(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Checks these variables against `schema`.
    pub fn validate(&self, schema: &VariableSchema) -> Result<(), ValidationError> {
        if let Some(unknown) = self.0.keys().find(|name| !schema.contains_key(*name)) {
            return Err(ValidationError::UnknownVariable(unknown.clone()));
        }

        for (name, ty) in schema {
            match self.0.get(name) {
                None if ty.is_non_null() => {
                    return Err(ValidationError::MissingVariable(name.clone()))
                }
                None => {}
                Some(value) if !ty.accepts(value) => {
                    return Err(ValidationError::TypeMismatch {
                        name: name.clone(),
                        expected: ty.to_string(),
                        actual: describe(value),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Serializes with object keys sorted at every level, so equal bindings
    /// always produce equal text regardless of insertion order.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        write_canonical(&mut out, &Value::Object(self.0.clone()));
        out
    }
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(out, &map[key]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl Serialize for Variables {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Renders as canonical JSON, the form used in log messages.
impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<Map<String, Value>> for Variables {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;
    use serde_json::json;

    fn schema(entries: &[(&str, TypeRef)]) -> VariableSchema {
        entries
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect()
    }

    #[test]
    fn test_canonical_ignores_insertion_order() {
        let a = Variables::new().with("name", "Narco").with("id", 12);
        let b = Variables::new().with("id", 12).with("name", "Narco");
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"{"id":12,"name":"Narco"}"#);
    }

    #[test]
    fn test_canonical_nested() {
        let vars = Variables::from_value(json!({"b": [{"z": 1, "a": 2}], "a": null})).unwrap();
        assert_eq!(vars.canonical(), r#"{"a":null,"b":[{"a":2,"z":1}]}"#);
        assert_eq!(Variables::new().to_string(), "{}");
    }

    #[test]
    fn test_from_record() {
        #[derive(Serialize)]
        struct Draft {
            name: String,
        }

        let vars = Variables::from_record(&Draft { name: "Dr IQ".into() }).unwrap();
        assert_eq!(vars.get("name"), Some(&json!("Dr IQ")));

        assert_eq!(
            Variables::from_record(&42).unwrap_err(),
            ValidationError::NotAnObject("Int".into())
        );
    }

    #[test]
    fn test_validate() {
        let schema = schema(&[
            ("id", TypeRef::non_null(TypeRef::named("Int"))),
            ("name", TypeRef::named("String")),
        ]);

        assert!(Variables::new().with("id", 1).validate(&schema).is_ok());
        assert!(Variables::new()
            .with("id", 1)
            .with("name", "Bombasto")
            .validate(&schema)
            .is_ok());

        assert_eq!(
            Variables::new().validate(&schema).unwrap_err(),
            ValidationError::MissingVariable("id".into())
        );
        assert_eq!(
            Variables::new().with("id", 1).with("power", 9).validate(&schema).unwrap_err(),
            ValidationError::UnknownVariable("power".into())
        );
        assert_eq!(
            Variables::new().with("id", "one").validate(&schema).unwrap_err(),
            ValidationError::TypeMismatch {
                name: "id".into(),
                expected: "Int!".into(),
                actual: "String".into(),
            }
        );
        assert!(Variables::new().with("id", Value::Null).validate(&schema).is_err());
    }
}

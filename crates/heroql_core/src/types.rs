//! Variable type references.

use serde_json::Value;
use std::fmt;

/// A GraphQL input type reference as written in a variable definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A named type such as `Int` or `HeroPatch`.
    Named(String),
    /// `[T]`
    List(Box<TypeRef>),
    /// `T!`
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Returns true if the variable must be supplied with a non-null value.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Checks a bound value against this type.
    ///
    /// Built-in scalars are checked strictly. Any other named type (enums,
    /// input objects, custom scalars) accepts any non-null value, since the
    /// schema that defines them lives on the server.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::NonNull(inner) => !value.is_null() && inner.accepts(value),
            _ if value.is_null() => true,
            Self::List(inner) => match value {
                Value::Array(items) => items.iter().all(|item| inner.accepts(item)),
                _ => false,
            },
            Self::Named(name) => match name.as_str() {
                "Int" => value.as_i64().is_some() || value.as_u64().is_some(),
                "Float" => value.is_number(),
                "String" => value.is_string(),
                "Boolean" => value.is_boolean(),
                "ID" => value.is_string() || value.as_i64().is_some() || value.as_u64().is_some(),
                _ => true,
            },
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{}", name),
            Self::List(inner) => write!(f, "[{}]", inner),
            Self::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// Describes the JSON kind of a value for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "Boolean".into(),
        Value::Number(n) if n.is_f64() => "Float".into(),
        Value::Number(_) => "Int".into(),
        Value::String(_) => "String".into(),
        Value::Array(_) => "list".into(),
        Value::Object(_) => "object".into(),
    }
}

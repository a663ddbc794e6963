//! Operation descriptors.
//!
//! A descriptor is built once from the operation text and reused for every
//! call. The variable schema is read from the operation header so the two can
//! never disagree.
//!
//! ```
//! use heroql_core::{OperationDescriptor, OperationKind};
//!
//! let op = OperationDescriptor::parse(
//!     "query readHeroById($id:Int!){heroById(id:$id){id,name}}",
//! ).unwrap();
//! assert_eq!(op.kind(), OperationKind::Query);
//! assert_eq!(op.name(), Some("readHeroById"));
//! assert_eq!(op.variables()["id"].to_string(), "Int!");
//! ```

use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{ConfigError, ValidationError};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::types::TypeRef;
use crate::variables::Variables;

/// The kind of GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a successful mutation updates previously cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MutationEffect {
    /// Merge the returned entities into every cached result containing them.
    #[default]
    Merge,
    /// Remove the returned entities from every cached result containing them.
    Evict,
    /// Re-execute the active live queries against the server.
    Refetch,
}

/// Declared variables, in declaration order.
pub type VariableSchema = IndexMap<String, TypeRef>;

#[derive(Debug)]
struct Inner {
    kind: OperationKind,
    name: Option<String>,
    text: Arc<str>,
    variables: VariableSchema,
    effect: MutationEffect,
}

/// An immutable, cheaply clonable GraphQL operation.
///
/// Two descriptors are equal when their text is equal.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    inner: Arc<Inner>,
}

impl OperationDescriptor {
    /// Parses the header of `text` into a descriptor.
    pub fn parse(text: impl Into<Arc<str>>) -> Result<Self, ConfigError> {
        let text = text.into();
        let header = HeaderParser::new(&text).parse()?;
        Ok(Self {
            inner: Arc::new(Inner {
                kind: header.kind,
                name: header.name,
                variables: header.variables,
                text,
                effect: MutationEffect::default(),
            }),
        })
    }

    /// Returns a copy of this descriptor carrying `effect`.
    pub fn with_effect(self, effect: MutationEffect) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(Inner {
                kind: inner.kind,
                name: inner.name.clone(),
                text: inner.text.clone(),
                variables: inner.variables.clone(),
                effect,
            }),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.inner.text
    }

    pub(crate) fn text_arc(&self) -> Arc<str> {
        self.inner.text.clone()
    }

    pub fn variables(&self) -> &VariableSchema {
        &self.inner.variables
    }

    pub fn effect(&self) -> MutationEffect {
        self.inner.effect
    }

    /// Rejects a call through the wrong entry point.
    pub fn expect_kind(&self, expected: OperationKind) -> Result<(), ValidationError> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(ValidationError::WrongKind {
                operation: self.label(),
                expected,
                actual: self.kind(),
            })
        }
    }

    /// Checks bound variables against the declared schema.
    pub fn validate(&self, variables: &Variables) -> Result<(), ValidationError> {
        variables.validate(self.variables())
    }

    /// The operation name, or its text when anonymous.
    pub fn label(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => self.text().to_string(),
        }
    }
}

impl PartialEq for OperationDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.inner.text == other.inner.text
    }
}

impl Eq for OperationDescriptor {}

impl Hash for OperationDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.text.hash(state);
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} {}", self.kind(), name),
            None => write!(f, "anonymous {}", self.kind()),
        }
    }
}

struct Header {
    kind: OperationKind,
    name: Option<String>,
    variables: VariableSchema,
}

/// Reads `kind name? (variables)?` up to the selection set.
struct HeaderParser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
}

impl<'a> HeaderParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    fn bump(&mut self) -> Token<'a> {
        let token = self.current;
        self.current = self.lexer.next_token();
        token
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Syntax {
            offset: self.current.offset,
            message: message.into(),
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, what: &str) -> Result<(), ConfigError> {
        if self.current.kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn expect_name(&mut self) -> Result<&'a str, ConfigError> {
        match self.current.kind {
            TokenKind::Name(name) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn parse(mut self) -> Result<Header, ConfigError> {
        // Shorthand `{ ... }` is an anonymous query without variables.
        if self.current.kind == TokenKind::LBrace {
            return Ok(Header {
                kind: OperationKind::Query,
                name: None,
                variables: VariableSchema::new(),
            });
        }

        let kind = match self.current.kind {
            TokenKind::Name("query") => OperationKind::Query,
            TokenKind::Name("mutation") => OperationKind::Mutation,
            TokenKind::Name(other @ "subscription") => {
                return Err(ConfigError::UnsupportedKind(other.to_string()))
            }
            _ => return Err(self.error("expected `query`, `mutation` or `{`")),
        };
        self.bump();

        let name = match self.current.kind {
            TokenKind::Name(name) => {
                self.bump();
                Some(name.to_string())
            }
            _ => None,
        };

        let mut variables = VariableSchema::new();
        if self.current.kind == TokenKind::LParen {
            self.bump();
            while self.current.kind != TokenKind::RParen {
                self.expect(TokenKind::Dollar, "`$` or `)`")?;
                let var = self.expect_name()?;
                self.expect(TokenKind::Colon, "`:`")?;
                let ty = self.parse_type()?;
                if self.current.kind == TokenKind::Equals {
                    return Err(ConfigError::DefaultValue(var.to_string()));
                }
                if variables.insert(var.to_string(), ty).is_some() {
                    return Err(ConfigError::DuplicateVariable(var.to_string()));
                }
            }
            self.bump();
        }

        self.expect(TokenKind::LBrace, "a selection set")?;

        Ok(Header {
            kind,
            name,
            variables,
        })
    }

    fn parse_type(&mut self) -> Result<TypeRef, ConfigError> {
        let base = match self.current.kind {
            TokenKind::LBracket => {
                self.bump();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RBracket, "`]`")?;
                TypeRef::list(inner)
            }
            TokenKind::Name(name) => {
                self.bump();
                TypeRef::named(name)
            }
            _ => return Err(self.error("expected a type")),
        };

        if self.current.kind == TokenKind::Bang {
            self.bump();
            Ok(TypeRef::non_null(base))
        } else {
            Ok(base)
        }
    }
}

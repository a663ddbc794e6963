//! Core types for HeroQL.
//!
//! This crate provides the pure data layer shared by the cache and the client:
//! - `operation`: operation descriptors parsed from GraphQL text
//! - `types`: variable type references
//! - `variables`: bound variables and their validation
//! - `fingerprint`: deterministic cache keys
//! - `error`: the error taxonomy

pub mod error;
pub mod fingerprint;
pub mod lexer;
pub mod operation;
pub mod types;
pub mod variables;

pub use error::{ConfigError, ErrorCode, ExecutionError, ExecutionResult, ValidationError};
pub use fingerprint::Fingerprint;
pub use operation::{MutationEffect, OperationDescriptor, OperationKind, VariableSchema};
pub use types::TypeRef;
pub use variables::Variables;

//! HeroQL SDK
//!
//! A client-side data-access layer for GraphQL endpoints: operations are
//! declared once, executed through a [`GraphQLClient`] that caches results by
//! fingerprint, and read back as streams that never fail.
//!
//! # Queries and mutations
//!
//! ```ignore
//! use heroql_sdk::{ClientConfig, GraphQLClient, OperationSet};
//!
//! let client = GraphQLClient::builder(ClientConfig::default()).build()?;
//! let operations: OperationSet = hero_operations()?;
//!
//! // One-shot read. Failures are logged and replaced by the fallback.
//! let heroes: AllHeroes = client.read_all(&operations)?.await;
//!
//! // Writes apply their effect to the cache before resolving.
//! let created: CreatedHero = client.create(&operations, &HeroDraft { name: "Tornado".into() })?.await;
//! ```
//!
//! # Live queries
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut results = client.read_with_term::<Search>(&operations, "a")?;
//! while let Some(search) = results.next().await {
//!     // Re-emitted whenever a write changes the cached result.
//! }
//! ```

pub mod client;
pub mod http;
pub mod log;
pub mod operation_set;
pub mod stream;
pub mod transport;

pub use client::{
    ClientBuilder, ClientConfig, FetchPolicy, GraphQLClient, DEFAULT_ENDPOINT, LOG_SOURCE,
};
pub use http::HttpTransport;
pub use log::{DiagnosticLog, LogEntry, MessageLog};
pub use operation_set::{OperationSet, OperationSetBuilder};
pub use stream::{Live, Single};
pub use transport::{GraphQLError, Request, Response, Transport};

// Re-export the building blocks callers name directly
pub use heroql_cache::{CacheConfig, EntityKey, ResultCache};
pub use heroql_core::{
    ConfigError, ErrorCode, ExecutionError, ExecutionResult, Fingerprint, MutationEffect,
    OperationDescriptor, OperationKind, TypeRef, ValidationError, Variables,
};

//! Hero domain service.
//!
//! The hero catalogue as seen through a [`GraphQLClient`](heroql_sdk::GraphQLClient):
//! every read is a stream that falls back to an empty result, every write
//! keeps the client's cache (and the live reads watching it) consistent.
//!
//! # Running against the in-memory server
//! ```ignore
//! use hero_service::{HeroService, InMemoryHeroServer};
//! use heroql_sdk::MessageLog;
//! use std::sync::Arc;
//!
//! let server = Arc::new(InMemoryHeroServer::with_seed_data());
//! let service = HeroService::in_memory(server, Arc::new(MessageLog::new()))?;
//! let heroes = service.get_all()?.await;
//! ```

pub mod domain;
pub mod infrastructure;
pub mod operations;
pub mod service;

pub use domain::*;
pub use infrastructure::*;
pub use operations::hero_operations;
pub use service::HeroService;

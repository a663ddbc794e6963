//! Normalized result cache for HeroQL.
//!
//! - `cache`: the [`ResultCache`] and its entries
//! - `identity`: entity keys and payload rewriting
//! - `subscription`: live change streams
//! - `config`: capacity, TTL and identity settings

pub mod cache;
pub mod config;
pub mod identity;
pub mod subscription;

pub use cache::{CacheEntry, ResultCache};
pub use config::CacheConfig;
pub use identity::EntityKey;
pub use subscription::Subscription;

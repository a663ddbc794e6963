//! Infrastructure layer - Transports the hero service can run against.

pub mod memory;

pub use memory::*;

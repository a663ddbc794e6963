//! Domain layer - Heroes and the errors the service reports.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;

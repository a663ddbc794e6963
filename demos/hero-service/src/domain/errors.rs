//! Domain errors - Contract violations surfaced before any request is sent.

use heroql_sdk::{ConfigError, ValidationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeroError {
    #[error("Invalid hero operations: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid hero request: {0}")]
    Validation(#[from] ValidationError),
}

pub type HeroResult<T> = Result<T, HeroError>;

//! Cache configuration.

use std::time::Duration;

/// Eviction and normalization settings.
///
/// Both limits default to unlimited.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of written entries. Entries with live subscribers are
    /// never evicted, so the cache may exceed this while they are active.
    pub capacity: Option<usize>,
    /// Age after which an entry is treated as absent.
    pub ttl: Option<Duration>,
    /// Field that carries an entity's identity.
    pub identity_field: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            ttl: None,
            identity_field: "id".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Sets the time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the identity field name.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }
}

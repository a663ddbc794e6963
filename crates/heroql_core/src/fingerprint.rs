//! Cache addressing.

use rustc_hash::FxHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::operation::OperationDescriptor;
use crate::variables::Variables;

/// Deterministic key derived from an operation's text and its canonical
/// variables. Equality compares the full text, never just the digest.
///
/// The bound variables and the operation name travel with the key so a
/// cached query can be re-executed from its fingerprint alone.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    text: Arc<str>,
    variables: Arc<str>,
    bound: Arc<Variables>,
    name: Option<Arc<str>>,
}

impl Fingerprint {
    pub fn new(operation: &OperationDescriptor, variables: &Variables) -> Self {
        Self {
            text: operation.text_arc(),
            variables: Arc::from(variables.canonical()),
            bound: Arc::new(variables.clone()),
            name: operation.name().map(Arc::from),
        }
    }

    /// The variables this fingerprint was derived from.
    pub fn bound_variables(&self) -> &Variables {
        &self.bound
    }

    /// Name of the operation the text declares, if any.
    pub fn operation_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Canonical JSON of the bound variables.
    pub fn variables(&self) -> &str {
        &self.variables
    }

    /// Short stable digest, used in logs.
    pub fn digest(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.text.hash(&mut hasher);
        self.variables.hash(&mut hasher);
        hasher.finish()
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.variables == other.variables
    }
}

impl Eq for Fingerprint {}

impl Hash for Fingerprint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.variables.hash(state);
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.digest())
    }
}

//! Per-entity operation sets.
//!
//! ```
//! use heroql_sdk::{MutationEffect, OperationDescriptor, OperationSet};
//!
//! let op = |text: &str| OperationDescriptor::parse(text).unwrap();
//! let heroes = OperationSet::builder()
//!     .read_all(op("query readAllHeroes{allHeroes{nodes{id,name}}}"))
//!     .read_by_id(op("query readHeroById($id:Int!){heroById(id:$id){id,name}}"))
//!     .read_with_term(op("query readHeroesWithTerm($term:String!){herowithterm(term:$term){nodes{id,name}}}"))
//!     .create(op("mutation create($name:String!){createHero(input:{hero:{name:$name}}){hero{id,name}}}")
//!         .with_effect(MutationEffect::Refetch))
//!     .update(op("mutation update($id:Int!,$name:String!){updateHeroById(input:{id:$id,heroPatch:{name:$name}}){hero{id,name}}}"))
//!     .delete(op("mutation delete($id:Int!){deleteHeroById(input:{id:$id}){hero{id,name}}}")
//!         .with_effect(MutationEffect::Evict))
//!     .delete_by_id(op("mutation delete($id:Int!){deleteHeroById(input:{id:$id}){hero{id,name}}}")
//!         .with_effect(MutationEffect::Evict))
//!     .build()
//!     .unwrap();
//! assert_eq!(heroes.read_all().name(), Some("readAllHeroes"));
//! ```

use heroql_core::{ConfigError, OperationDescriptor, OperationKind};

/// The descriptors one entity type needs, checked at construction.
#[derive(Debug, Clone)]
pub struct OperationSet {
    read_all: OperationDescriptor,
    read_by_id: OperationDescriptor,
    read_with_term: OperationDescriptor,
    create: OperationDescriptor,
    update: OperationDescriptor,
    delete: OperationDescriptor,
    delete_by_id: OperationDescriptor,
}

impl OperationSet {
    pub fn builder() -> OperationSetBuilder {
        OperationSetBuilder::default()
    }

    pub fn read_all(&self) -> &OperationDescriptor {
        &self.read_all
    }

    pub fn read_by_id(&self) -> &OperationDescriptor {
        &self.read_by_id
    }

    pub fn read_with_term(&self) -> &OperationDescriptor {
        &self.read_with_term
    }

    pub fn create(&self) -> &OperationDescriptor {
        &self.create
    }

    pub fn update(&self) -> &OperationDescriptor {
        &self.update
    }

    pub fn delete(&self) -> &OperationDescriptor {
        &self.delete
    }

    pub fn delete_by_id(&self) -> &OperationDescriptor {
        &self.delete_by_id
    }
}

/// Builder for [`OperationSet`].
#[derive(Debug, Default)]
pub struct OperationSetBuilder {
    read_all: Option<OperationDescriptor>,
    read_by_id: Option<OperationDescriptor>,
    read_with_term: Option<OperationDescriptor>,
    create: Option<OperationDescriptor>,
    update: Option<OperationDescriptor>,
    delete: Option<OperationDescriptor>,
    delete_by_id: Option<OperationDescriptor>,
}

macro_rules! slot {
    ($name:ident) => {
        pub fn $name(mut self, operation: OperationDescriptor) -> Self {
            self.$name = Some(operation);
            self
        }
    };
}

impl OperationSetBuilder {
    slot!(read_all);
    slot!(read_by_id);
    slot!(read_with_term);
    slot!(create);
    slot!(update);
    slot!(delete);
    slot!(delete_by_id);

    /// Validates every slot and builds the set.
    pub fn build(self) -> Result<OperationSet, ConfigError> {
        use OperationKind::{Mutation, Query};

        Ok(OperationSet {
            read_all: checked("read_all", self.read_all, Query)?,
            read_by_id: checked("read_by_id", self.read_by_id, Query)?,
            read_with_term: checked("read_with_term", self.read_with_term, Query)?,
            create: checked("create", self.create, Mutation)?,
            update: checked("update", self.update, Mutation)?,
            delete: checked("delete", self.delete, Mutation)?,
            delete_by_id: checked("delete_by_id", self.delete_by_id, Mutation)?,
        })
    }
}

fn checked(
    slot: &'static str,
    operation: Option<OperationDescriptor>,
    expected: OperationKind,
) -> Result<OperationDescriptor, ConfigError> {
    let operation = operation.ok_or(ConfigError::MissingOperation(slot))?;
    if operation.kind() != expected {
        return Err(ConfigError::KindMismatch {
            slot,
            operation: operation.label(),
            expected,
            actual: operation.kind(),
        });
    }
    Ok(operation)
}

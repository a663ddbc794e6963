//! The hero schema's operations.

use heroql_sdk::{ConfigError, MutationEffect, OperationDescriptor, OperationSet};

pub const READ_ALL: &str = "query readAllHeroes{allHeroes{nodes{id,name}}}";
pub const READ_BY_ID: &str = "query readHeroById($id:Int!){heroById(id:$id){id,name}}";
pub const READ_WITH_TERM: &str =
    "query readHeroesWithTerm($term:String!){herowithterm(term:$term){nodes{id,name}}}";
pub const CREATE: &str = "mutation create($name:String!)
  {createHero(input:{hero:{name:$name}})
    {hero{id,name}}}";
pub const UPDATE: &str = "mutation update($id:Int!,$name:String!)
  {updateHeroById(input:{id:$id,heroPatch:{name:$name}})
    {hero{id,name}}}";
pub const DELETE: &str = "mutation delete($id:Int!)
  {deleteHeroById(input:{id:$id})
    {hero{id,name}}}";

/// Builds the hero operation set.
///
/// A created hero may belong to any list or search result, so `create`
/// refetches live reads. Deletes evict the hero from cached results and
/// updates merge into them.
pub fn hero_operations() -> Result<OperationSet, ConfigError> {
    let delete = OperationDescriptor::parse(DELETE)?.with_effect(MutationEffect::Evict);

    OperationSet::builder()
        .read_all(OperationDescriptor::parse(READ_ALL)?)
        .read_by_id(OperationDescriptor::parse(READ_BY_ID)?)
        .read_with_term(OperationDescriptor::parse(READ_WITH_TERM)?)
        .create(OperationDescriptor::parse(CREATE)?.with_effect(MutationEffect::Refetch))
        .update(OperationDescriptor::parse(UPDATE)?.with_effect(MutationEffect::Merge))
        .delete(delete.clone())
        .delete_by_id(delete)
        .build()
}

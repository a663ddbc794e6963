//! Hero service - The hero catalogue's data access.

use crate::domain::*;
use crate::infrastructure::InMemoryHeroServer;
use crate::operations::hero_operations;
use futures::stream::{BoxStream, StreamExt};
use heroql_sdk::{ClientConfig, DiagnosticLog, GraphQLClient, OperationSet, Single};
use std::sync::Arc;

/// Reads return the empty result on failure, writes return `None`.
#[derive(Clone)]
pub struct HeroService {
    client: GraphQLClient,
    operations: OperationSet,
}

impl HeroService {
    pub fn new(client: GraphQLClient) -> HeroResult<Self> {
        Ok(Self {
            client,
            operations: hero_operations()?,
        })
    }

    /// Runs against `server` instead of an HTTP endpoint.
    pub fn in_memory(
        server: Arc<InMemoryHeroServer>,
        log: Arc<dyn DiagnosticLog>,
    ) -> HeroResult<Self> {
        let client = GraphQLClient::builder(ClientConfig::default())
            .transport(server)
            .log(log)
            .build()?;
        Self::new(client)
    }

    pub fn client(&self) -> &GraphQLClient {
        &self.client
    }

    pub fn get_all(&self) -> HeroResult<Single<Vec<Hero>>> {
        Ok(self
            .client
            .read_all::<AllHeroes>(&self.operations)?
            .map(AllHeroes::into_heroes))
    }

    /// Every hero, re-emitted whenever a write changes the list.
    pub fn watch_all(&self) -> HeroResult<BoxStream<'static, Vec<Hero>>> {
        Ok(self
            .client
            .watch_all::<AllHeroes>(&self.operations)?
            .map(AllHeroes::into_heroes)
            .boxed())
    }

    pub fn get_by_id(&self, id: i64) -> HeroResult<Single<Option<Hero>>> {
        Ok(self
            .client
            .read_by_id::<HeroById>(&self.operations, id)?
            .map(HeroById::into_hero))
    }

    /// Heroes whose name contains `term`, kept current until dropped. A
    /// blank term yields no heroes without asking the server.
    pub fn search(&self, term: &str) -> HeroResult<BoxStream<'static, Vec<Hero>>> {
        Ok(self
            .client
            .read_with_term::<HeroesWithTerm>(&self.operations, term)?
            .map(HeroesWithTerm::into_heroes)
            .boxed())
    }

    pub fn create(&self, draft: &HeroDraft) -> HeroResult<Single<Option<Hero>>> {
        Ok(self
            .client
            .create::<CreateHero, _>(&self.operations, draft)?
            .map(CreateHero::into_hero))
    }

    pub fn update(&self, hero: &Hero) -> HeroResult<Single<Option<Hero>>> {
        Ok(self
            .client
            .update::<UpdateHero, _>(&self.operations, hero)?
            .map(UpdateHero::into_hero))
    }

    pub fn delete(&self, hero: &Hero) -> HeroResult<Single<Option<Hero>>> {
        Ok(self
            .client
            .delete::<DeleteHero, _>(&self.operations, hero)?
            .map(DeleteHero::into_hero))
    }

    pub fn delete_by_id(&self, id: i64) -> HeroResult<Single<Option<Hero>>> {
        Ok(self
            .client
            .delete_by_id::<DeleteHero>(&self.operations, id)?
            .map(DeleteHero::into_hero))
    }
}

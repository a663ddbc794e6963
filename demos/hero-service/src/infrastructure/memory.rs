//! In-memory hero server.
//!
//! Answers the hero operations the way the hero GraphQL endpoint does, which
//! makes it a drop-in [`Transport`] for demos and tests.

use crate::domain::Hero;
use async_trait::async_trait;
use heroql_sdk::{ExecutionError, ExecutionResult, Request, Response, Transport};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

struct Store {
    heroes: BTreeMap<i64, String>,
    next_id: i64,
}

pub struct InMemoryHeroServer {
    store: RwLock<Store>,
    requests: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryHeroServer {
    pub fn new(heroes: impl IntoIterator<Item = Hero>) -> Self {
        let heroes: BTreeMap<i64, String> = heroes.into_iter().map(|h| (h.id, h.name)).collect();
        let next_id = heroes.keys().next_back().map_or(1, |id| id + 1);
        Self {
            store: RwLock::new(Store { heroes, next_id }),
            requests: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        }
    }

    pub fn with_seed_data() -> Self {
        Self::new(
            [
                (11, "Mr. Nice"),
                (12, "Narco"),
                (13, "Bombasto"),
                (14, "Celeritas"),
                (15, "Magneta"),
                (16, "RubberMan"),
                (17, "Dynama"),
                (18, "Dr IQ"),
                (19, "Magma"),
                (20, "Tornado"),
            ]
            .map(|(id, name)| Hero::new(id, name)),
        )
    }

    /// Number of requests received so far, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// While offline every request fails like an unreachable endpoint.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn heroes(&self) -> Vec<Hero> {
        let store = self.store.read().await;
        store.heroes.iter().map(|(id, name)| Hero::new(*id, name.as_str())).collect()
    }

    async fn answer(&self, request: &Request) -> Response {
        let id = request.variables.get("id").and_then(Value::as_i64);
        let name = request.variables.get("name").and_then(Value::as_str);
        let query = request.query.as_str();

        // Mutations first: their field names contain the read field names.
        if query.contains("createHero") {
            let mut store = self.store.write().await;
            let id = store.next_id;
            store.next_id += 1;
            let name = name.unwrap_or_default().to_string();
            store.heroes.insert(id, name.clone());
            return data("createHero", json!({"hero": Hero::new(id, name)}));
        }
        if query.contains("updateHeroById") {
            let mut store = self.store.write().await;
            let updated = id.zip(name).and_then(|(id, name)| {
                let slot = store.heroes.get_mut(&id)?;
                *slot = name.to_string();
                Some(Hero::new(id, name))
            });
            return data("updateHeroById", json!({"hero": updated}));
        }
        if query.contains("deleteHeroById") {
            let mut store = self.store.write().await;
            let removed =
                id.and_then(|id| store.heroes.remove(&id).map(|name| Hero::new(id, name)));
            return data("deleteHeroById", json!({"hero": removed}));
        }

        let store = self.store.read().await;
        let heroes = store.heroes.iter().map(|(id, name)| Hero::new(*id, name.as_str()));

        if query.contains("herowithterm") {
            let term = request
                .variables
                .get("term")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            let nodes: Vec<Hero> = heroes
                .filter(|h| h.name.to_lowercase().contains(&term))
                .collect();
            data("herowithterm", json!({ "nodes": nodes }))
        } else if query.contains("heroById") {
            let found =
                id.and_then(|id| store.heroes.get(&id).map(|name| Hero::new(id, name.as_str())));
            data("heroById", json!(found))
        } else if query.contains("allHeroes") {
            let nodes: Vec<Hero> = heroes.collect();
            data("allHeroes", json!({ "nodes": nodes }))
        } else {
            Response::errors(&["Cannot query this field on the hero schema"])
        }
    }
}

fn data(field: &str, value: Value) -> Response {
    let mut data = serde_json::Map::new();
    data.insert(field.to_string(), value);
    Response::data(Value::Object(data))
}

#[async_trait]
impl Transport for InMemoryHeroServer {
    async fn execute(&self, request: &Request) -> ExecutionResult<Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        trace!(query = %request.query, variables = %request.variables, "in-memory request");

        if self.offline.load(Ordering::SeqCst) {
            return Err(ExecutionError::network("in-memory hero server is offline"));
        }
        Ok(self.answer(request).await)
    }
}

//! Integration tests for heroql_sdk

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use heroql_sdk::{
    ClientConfig, ExecutionError, ExecutionResult, FetchPolicy, Fingerprint, GraphQLClient,
    MessageLog, MutationEffect, OperationDescriptor, OperationSet, Request, Response, Transport,
    Variables,
};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Hero fixtures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Hero {
    id: i64,
    name: String,
}

#[derive(Debug, Serialize)]
struct HeroDraft {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Nodes {
    nodes: Vec<Hero>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllHeroes {
    all_heroes: Nodes,
}

#[derive(Debug, Default, Deserialize)]
struct Search {
    herowithterm: Nodes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeroById {
    hero_by_id: Option<Hero>,
}

#[derive(Debug, Default, Deserialize)]
struct HeroPayload {
    hero: Option<Hero>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    create_hero: HeroPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Updated {
    update_hero_by_id: HeroPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Deleted {
    delete_hero_by_id: HeroPayload,
}

fn operations() -> OperationSet {
    let op = |text: &str| OperationDescriptor::parse(text).unwrap();
    let delete = "mutation delete($id:Int!){deleteHeroById(input:{id:$id}){hero{id,name}}}";

    OperationSet::builder()
        .read_all(op("query readAllHeroes{allHeroes{nodes{id,name}}}"))
        .read_by_id(op("query readHeroById($id:Int!){heroById(id:$id){id,name}}"))
        .read_with_term(op(
            "query readHeroesWithTerm($term:String!){herowithterm(term:$term){nodes{id,name}}}",
        ))
        .create(
            op("mutation create($name:String!){createHero(input:{hero:{name:$name}}){hero{id,name}}}")
                .with_effect(MutationEffect::Refetch),
        )
        .update(op(
            "mutation update($id:Int!,$name:String!){updateHeroById(input:{id:$id,heroPatch:{name:$name}}){hero{id,name}}}",
        ))
        .delete(op(delete).with_effect(MutationEffect::Evict))
        .delete_by_id(op(delete).with_effect(MutationEffect::Evict))
        .build()
        .unwrap()
}

/// An in-memory hero server speaking the wire shapes of the hero schema.
struct HeroBackend {
    heroes: Mutex<BTreeMap<i64, String>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl HeroBackend {
    fn with(heroes: &[(i64, &str)]) -> Arc<Self> {
        let next_id = heroes.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        Arc::new(Self {
            heroes: Mutex::new(heroes.iter().map(|(id, name)| (*id, name.to_string())).collect()),
            next_id: AtomicI64::new(next_id),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &Request) -> Response {
        let id = request.variables.get("id").and_then(Value::as_i64);
        let name = request.variables.get("name").and_then(Value::as_str).map(str::to_string);
        let hero = |id: i64, name: &str| json!({"id": id, "name": name});
        let nodes = |rows: Vec<Value>| json!({"nodes": rows});

        let mut heroes = self.heroes.lock().unwrap();
        let query = request.query.as_str();

        let data = if query.contains("createHero") {
            let name = name.unwrap_or_default();
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            heroes.insert(id, name.clone());
            json!({"createHero": {"hero": hero(id, &name)}})
        } else if query.contains("updateHeroById") {
            let updated = id.zip(name).and_then(|(id, name)| {
                let slot = heroes.get_mut(&id)?;
                *slot = name;
                Some(hero(id, slot))
            });
            json!({"updateHeroById": {"hero": updated}})
        } else if query.contains("deleteHeroById") {
            let removed = id.and_then(|id| heroes.remove(&id).map(|name| hero(id, &name)));
            json!({"deleteHeroById": {"hero": removed}})
        } else if query.contains("herowithterm") {
            let term = request.variables.get("term").and_then(Value::as_str).unwrap_or_default();
            let term = term.to_lowercase();
            let rows = heroes
                .iter()
                .filter(|(_, name)| name.to_lowercase().contains(&term))
                .map(|(id, name)| hero(*id, name))
                .collect();
            json!({"herowithterm": nodes(rows)})
        } else if query.contains("heroById") {
            let found = id.and_then(|id| heroes.get(&id).map(|name| hero(id, name)));
            json!({"heroById": found})
        } else if query.contains("allHeroes") {
            let rows = heroes.iter().map(|(id, name)| hero(*id, name)).collect();
            json!({"allHeroes": nodes(rows)})
        } else {
            return Response::errors(&["unknown operation"]);
        };

        Response::data(data)
    }
}

#[async_trait]
impl Transport for HeroBackend {
    async fn execute(&self, request: &Request) -> ExecutionResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(ExecutionError::network("connection reset by peer"));
        }
        Ok(self.respond(request))
    }
}

fn client_for(backend: &Arc<HeroBackend>) -> (GraphQLClient, Arc<MessageLog>) {
    client_with(backend, ClientConfig::default())
}

fn client_with(
    backend: &Arc<HeroBackend>,
    config: ClientConfig,
) -> (GraphQLClient, Arc<MessageLog>) {
    let log = Arc::new(MessageLog::new());
    let client = GraphQLClient::builder(config)
        .transport(backend.clone())
        .log(log.clone())
        .build()
        .unwrap();
    (client, log)
}

fn ids(heroes: &[Hero]) -> Vec<i64> {
    heroes.iter().map(|hero| hero.id).collect()
}

async fn assert_quiet<S: futures::Stream + Unpin>(stream: &mut S) {
    let next = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(next.is_err(), "stream emitted unexpectedly");
}

// ============================================================================
// Client behavior
// ============================================================================

#[tokio::test]
async fn test_one_shot_reads_yield_exactly_once() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let all: Vec<AllHeroes> = client.read_all(&operations).unwrap().collect().await;
    assert_eq!(all.len(), 1);
    assert_eq!(ids(&all[0].all_heroes.nodes), vec![1, 2]);

    let one: Vec<HeroById> = client.read_by_id(&operations, 2).unwrap().collect().await;
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].hero_by_id.as_ref().map(|h| h.name.as_str()), Some("B"));
}

#[tokio::test]
async fn test_blank_search_term_never_reaches_the_network() {
    let backend = HeroBackend::with(&[(1, "A")]);
    let (client, log) = client_for(&backend);
    let operations = operations();

    for term in ["", "   "] {
        let live = client.read_with_term::<Search>(&operations, term).unwrap();
        assert!(!live.is_watching());

        let results: Vec<Search> = live.collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].herowithterm.nodes.is_empty());
    }

    assert_eq!(backend.calls(), 0);
    assert!(client.cache().is_empty());
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_transport_failure_yields_fallback_and_one_log_entry() {
    let backend = HeroBackend::with(&[(42, "Magneta")]);
    backend.offline.store(true, Ordering::SeqCst);
    let (client, log) = client_for(&backend);

    let hero: HeroById = client.read_by_id(&operations(), 42).unwrap().await;
    assert!(hero.hero_by_id.is_none());

    let messages = log.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("42"));
    assert!(messages[0].contains("Description=readById"));
    assert!(messages[0].contains("code: NETWORK_ERROR"));
}

#[tokio::test]
async fn test_create_emits_once_on_live_reads() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut all = client.watch_all::<AllHeroes>(&operations).unwrap();
    let mut search = client.read_with_term::<Search>(&operations, "a").unwrap();

    assert_eq!(ids(&all.next().await.unwrap().all_heroes.nodes), vec![1, 2]);
    assert_eq!(ids(&search.next().await.unwrap().herowithterm.nodes), vec![1]);

    let created: Created = client
        .create(&operations, &HeroDraft { name: "Carla".into() })
        .unwrap()
        .await;
    let carla = created.create_hero.hero.unwrap();
    assert_eq!(carla.id, 3);

    assert_eq!(ids(&all.next().await.unwrap().all_heroes.nodes), vec![1, 2, 3]);
    assert_eq!(ids(&search.next().await.unwrap().herowithterm.nodes), vec![1, 3]);
    assert_quiet(&mut all).await;
    assert_quiet(&mut search).await;
}

#[tokio::test]
async fn test_create_that_misses_a_search_does_not_emit_there() {
    let backend = HeroBackend::with(&[(1, "A")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut search = client.read_with_term::<Search>(&operations, "a").unwrap();
    assert_eq!(ids(&search.next().await.unwrap().herowithterm.nodes), vec![1]);

    let _: Created = client
        .create(&operations, &HeroDraft { name: "Bob".into() })
        .unwrap()
        .await;
    assert_quiet(&mut search).await;
}

#[tokio::test]
async fn test_delete_by_id_is_reflected_in_later_reads() {
    let backend = HeroBackend::with(&[(5, "E"), (6, "F"), (7, "G")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut live = client.watch_all::<AllHeroes>(&operations).unwrap();
    assert_eq!(ids(&live.next().await.unwrap().all_heroes.nodes), vec![5, 6, 7]);

    let deleted: Deleted = client.delete_by_id(&operations, 7).unwrap().await;
    assert_eq!(deleted.delete_hero_by_id.hero.map(|h| h.id), Some(7));

    assert_eq!(ids(&live.next().await.unwrap().all_heroes.nodes), vec![5, 6]);

    let all: AllHeroes = client.read_all(&operations).unwrap().await;
    assert_eq!(ids(&all.all_heroes.nodes), vec![5, 6]);
}

#[tokio::test]
async fn test_delete_uses_the_record_identity() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, log) = client_for(&backend);
    let operations = operations();

    let hero = Hero { id: 1, name: "A".into() };
    let deleted: Deleted = client.delete(&operations, &hero).unwrap().await;
    assert_eq!(deleted.delete_hero_by_id.hero, Some(hero));
    assert_eq!(
        log.messages(),
        vec![r#"GraphQLService: delete record(s) with {"id":1}"#]
    );
}

#[tokio::test]
async fn test_update_merges_into_cached_results() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut live = client.watch_all::<AllHeroes>(&operations).unwrap();
    live.next().await.unwrap();
    let before = backend.calls();

    let updated: Updated = client
        .update(&operations, &Hero { id: 2, name: "Bea".into() })
        .unwrap()
        .await;
    assert_eq!(updated.update_hero_by_id.hero.unwrap().name, "Bea");

    let names: Vec<String> = live
        .next()
        .await
        .unwrap()
        .all_heroes
        .nodes
        .into_iter()
        .map(|hero| hero.name)
        .collect();
    assert_eq!(names, vec!["A", "Bea"]);
    // The merge happened locally; only the mutation went out.
    assert_eq!(backend.calls(), before + 1);
}

#[tokio::test]
async fn test_fresh_read_updates_live_results_sharing_the_entity() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut live = client.watch_all::<AllHeroes>(&operations).unwrap();
    live.next().await.unwrap();

    // Renamed behind the client's back; the next read of hero 2 sees it.
    backend.heroes.lock().unwrap().insert(2, "Bea".into());
    let hero: HeroById = client.read_by_id(&operations, 2).unwrap().await;
    assert_eq!(hero.hero_by_id.map(|h| h.name), Some("Bea".to_string()));

    assert_eq!(
        live.next().await.unwrap().all_heroes.nodes,
        vec![Hero { id: 1, name: "A".into() }, Hero { id: 2, name: "Bea".into() }]
    );
    assert_quiet(&mut live).await;
}

#[tokio::test]
async fn test_cache_first_live_query_still_fetches() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let config = ClientConfig::default().fetch_policy(FetchPolicy::CacheFirst);
    let (client, _) = client_with(&backend, config);
    let operations = operations();

    let cached: AllHeroes = client.read_all(&operations).unwrap().await;
    assert_eq!(cached.all_heroes.nodes[1].name, "B");
    backend.heroes.lock().unwrap().insert(2, "Bea".into());
    let before = backend.calls();

    let mut live = client.watch_all::<AllHeroes>(&operations).unwrap();
    assert_eq!(live.next().await.unwrap().all_heroes.nodes[1].name, "B");
    assert_eq!(live.next().await.unwrap().all_heroes.nodes[1].name, "Bea");
    assert_eq!(backend.calls(), before + 1);

    // One-shot reads keep serving the cache.
    let again: AllHeroes = client.read_all(&operations).unwrap().await;
    assert_eq!(again.all_heroes.nodes[1].name, "Bea");
    assert_eq!(backend.calls(), before + 1);
}

#[tokio::test]
async fn test_scenario_read_all_then_search() {
    let backend = HeroBackend::with(&[(1, "A"), (2, "B")]);
    let (client, log) = client_for(&backend);
    let operations = operations();

    let all: Vec<AllHeroes> = client.read_all(&operations).unwrap().collect().await;
    assert_eq!(all.len(), 1);
    assert_eq!(
        all[0].all_heroes.nodes,
        vec![Hero { id: 1, name: "A".into() }, Hero { id: 2, name: "B".into() }]
    );

    let mut search = client.read_with_term::<Search>(&operations, "a").unwrap();
    let found = search.next().await.unwrap();
    assert_eq!(found.herowithterm.nodes, vec![Hero { id: 1, name: "A".into() }]);

    assert_eq!(
        log.messages(),
        vec![
            "GraphQLService: read record(s) with {}",
            r#"GraphQLService: readWithTerm record(s) with {"term":"a"}"#,
        ]
    );
}

#[tokio::test]
async fn test_live_query_stays_open_after_failed_fetch() {
    let backend = HeroBackend::with(&[(1, "A")]);
    backend.offline.store(true, Ordering::SeqCst);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut search = client.read_with_term::<Search>(&operations, "a").unwrap();
    assert!(search.next().await.unwrap().herowithterm.nodes.is_empty());

    backend.offline.store(false, Ordering::SeqCst);
    let _: Created = client
        .create(&operations, &HeroDraft { name: "Ada".into() })
        .unwrap()
        .await;

    assert_eq!(ids(&search.next().await.unwrap().herowithterm.nodes), vec![1, 2]);
}

#[tokio::test]
async fn test_dropping_a_live_query_unsubscribes() {
    let backend = HeroBackend::with(&[(1, "A")]);
    let (client, _) = client_for(&backend);
    let operations = operations();

    let mut live = client.watch_all::<AllHeroes>(&operations).unwrap();
    live.next().await.unwrap();
    assert_eq!(client.cache().live_entries().len(), 1);

    drop(live);
    assert!(client.cache().live_entries().is_empty());
}

/// Answers the first call slowly and every later call quickly.
struct Staggered {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for Staggered {
    async fn execute(&self, _request: &Request) -> ExecutionResult<Response> {
        let (delay, name) = match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => (60, "slow"),
            _ => (5, "fast"),
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(Response::data(json!({"heroById": {"id": 1, "name": name}})))
    }
}

#[tokio::test]
async fn test_concurrent_calls_keep_the_later_completion() {
    let client = GraphQLClient::builder(ClientConfig::default())
        .transport(Arc::new(Staggered {
            calls: AtomicUsize::new(0),
        }))
        .build()
        .unwrap();
    let operations = operations();

    let first = client.read_by_id::<HeroById>(&operations, 1).unwrap();
    let second = client.read_by_id::<HeroById>(&operations, 1).unwrap();
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.hero_by_id.unwrap().name, "slow");
    assert_eq!(second.hero_by_id.unwrap().name, "fast");

    let key = Fingerprint::new(operations.read_by_id(), &Variables::new().with("id", 1));
    let entry = client.cache().get(&key).unwrap();
    assert_eq!(entry.payload["heroById"]["name"], "slow");
    assert_eq!(entry.revision, 2);
}

// ============================================================================
// HTTP transport
// ============================================================================

/// Serves every request with `handler(request body)` on a local port.
async fn serve(handler: fn(Value) -> (u16, String)) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let service = service_fn(move |request: hyper::Request<Incoming>| async move {
                    let body = request.into_body().collect().await?.to_bytes();
                    let sent = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    let (status, reply) = handler(sent);
                    Ok::<_, hyper::Error>(
                        hyper::Response::builder()
                            .status(status)
                            .header("content-type", "application/json")
                            .body(Full::new(Bytes::from(reply)))
                            .unwrap(),
                    )
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    format!("http://{addr}/graphql")
}

fn http_client(endpoint: &str) -> (GraphQLClient, Arc<MessageLog>) {
    let log = Arc::new(MessageLog::new());
    let client = GraphQLClient::builder(ClientConfig::new(endpoint).timeout(Duration::from_secs(5)))
        .log(log.clone())
        .build()
        .unwrap();
    (client, log)
}

fn echo() -> OperationDescriptor {
    OperationDescriptor::parse("query echo($id:Int!){echo(id:$id)}").unwrap()
}

#[tokio::test]
async fn test_http_posts_the_graphql_body() {
    let endpoint = serve(|body| (200, json!({"data": {"echo": body}}).to_string())).await;
    let (client, log) = http_client(&endpoint);

    let data: Value = client
        .query(&echo(), Variables::new().with("id", 5), "echo")
        .unwrap()
        .await;

    assert_eq!(data["echo"]["query"], "query echo($id:Int!){echo(id:$id)}");
    assert_eq!(data["echo"]["variables"], json!({"id": 5}));
    assert_eq!(data["echo"]["operationName"], "echo");
    assert_eq!(log.messages(), vec![r#"GraphQLService: echo record(s) with {"id":5}"#]);
}

#[tokio::test]
async fn test_http_non_success_status_is_a_transport_failure() {
    let endpoint = serve(|_| (500, "{}".to_string())).await;
    let (client, log) = http_client(&endpoint);

    let data: Value = client
        .query(&echo(), Variables::new().with("id", 5), "echo")
        .unwrap()
        .await;

    assert!(data.is_null());
    assert!(log.messages()[0].contains("code: HTTP_ERROR"));
}

#[tokio::test]
async fn test_http_errors_body_is_a_server_failure() {
    let endpoint = serve(|_| {
        (200, json!({"data": null, "errors": [{"message": "boom"}]}).to_string())
    })
    .await;
    let (client, log) = http_client(&endpoint);

    let data: Value = client
        .query(&echo(), Variables::new().with("id", 5), "echo")
        .unwrap()
        .or(json!("fallback"))
        .await;

    assert_eq!(data, json!("fallback"));
    assert!(log.messages()[0].ends_with("failed: boom code: SERVER_ERROR"));
}

#[tokio::test]
async fn test_http_unreachable_endpoint_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/graphql", listener.local_addr().unwrap());
    drop(listener);
    let (client, log) = http_client(&endpoint);

    let data: Value = client
        .query(&echo(), Variables::new().with("id", 5), "echo")
        .unwrap()
        .await;

    assert!(data.is_null());
    assert!(log.messages()[0].contains("code: CONNECTION_REFUSED"));
}

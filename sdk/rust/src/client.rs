//! HeroQL client.
//!
//! The client is the single point of execution for GraphQL operations. It
//! owns the result cache, isolates callers from transport and server
//! failures, and reports a trace of every call to a [`DiagnosticLog`].
//!
//! ```ignore
//! use heroql_sdk::{ClientConfig, GraphQLClient, OperationDescriptor, Variables};
//!
//! let client = GraphQLClient::builder(ClientConfig::default()).build()?;
//! let op = OperationDescriptor::parse("query readHeroById($id:Int!){heroById(id:$id){id,name}}")?;
//!
//! // Validation errors surface here, synchronously.
//! let hero: HeroById = client
//!     .query(&op, Variables::new().with("id", 12), "readHeroById")?
//!     // Transport and server errors never do: they become the fallback.
//!     .await;
//! ```

use futures::future::join_all;
use heroql_cache::{identity, CacheConfig, EntityKey, ResultCache};
use heroql_core::{
    ConfigError, ExecutionError, ExecutionResult, Fingerprint, MutationEffect,
    OperationDescriptor, OperationKind, ValidationError, Variables,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::http::HttpTransport;
use crate::log::{DiagnosticLog, MessageLog};
use crate::operation_set::OperationSet;
use crate::stream::{Live, Single};
use crate::transport::{Request, Transport};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/graphql";

/// Source name the client logs under.
pub const LOG_SOURCE: &str = "GraphQLService";

/// How plain queries use the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Always execute against the endpoint, then write the cache.
    #[default]
    NetworkOnly,
    /// Serve a fresh cache entry when one exists.
    CacheFirst,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL of the GraphQL endpoint.
    pub endpoint: String,
    /// Per-request timeout. None waits for the transport's own behavior.
    pub timeout: Option<Duration>,
    /// Headers sent with every request.
    pub headers: HashMap<String, String>,
    pub fetch_policy: FetchPolicy,
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            headers: HashMap::new(),
            fetch_policy: FetchPolicy::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a new config with an endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a default header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the fetch policy.
    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Sets the cache configuration.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// Builder for [`GraphQLClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    log: Option<Arc<dyn DiagnosticLog>>,
}

impl ClientBuilder {
    /// Uses `transport` instead of HTTP to the configured endpoint.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Reports to `log` instead of a private [`MessageLog`].
    pub fn log(mut self, log: Arc<dyn DiagnosticLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> Result<GraphQLClient, ConfigError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                &self.config.endpoint,
                &self.config.headers,
            )?),
        };
        let log = self.log.unwrap_or_else(|| Arc::new(MessageLog::new()));
        let cache = ResultCache::new(self.config.cache.clone());

        Ok(GraphQLClient {
            inner: Arc::new(Inner {
                config: self.config,
                transport,
                cache,
                log,
            }),
        })
    }
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: ResultCache,
    log: Arc<dyn DiagnosticLog>,
}

/// One validated call.
struct Call {
    operation: OperationDescriptor,
    fingerprint: Fingerprint,
    description: String,
}

/// The GraphQL client. Cloning shares the transport, cache and log.
#[derive(Clone)]
pub struct GraphQLClient {
    inner: Arc<Inner>,
}

impl GraphQLClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            log: None,
        }
    }

    /// Creates an HTTP client for `endpoint` with default settings.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder(ClientConfig::new(endpoint)).build()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    pub fn diagnostic_log(&self) -> &Arc<dyn DiagnosticLog> {
        &self.inner.log
    }

    fn call(
        &self,
        operation: &OperationDescriptor,
        expected: OperationKind,
        variables: Variables,
        description: &str,
    ) -> Result<Call, ValidationError> {
        operation.expect_kind(expected)?;
        operation.validate(&variables)?;
        Ok(Call {
            operation: operation.clone(),
            fingerprint: Fingerprint::new(operation, &variables),
            description: description.to_string(),
        })
    }

    /// Executes a read operation. The stream yields the decoded `data`, or the
    /// fallback if the call fails, exactly once.
    pub fn query<T>(
        &self,
        operation: &OperationDescriptor,
        variables: Variables,
        description: &str,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let call = self.call(operation, OperationKind::Query, variables, description)?;
        let client = self.clone();
        let policy = self.inner.config.fetch_policy;
        Ok(Single::new(async move { client.run_query(call, policy).await }))
    }

    /// Executes a write operation and applies its declared effect to the cache.
    pub fn mutate<T>(
        &self,
        operation: &OperationDescriptor,
        variables: Variables,
        description: &str,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let call = self.call(operation, OperationKind::Mutation, variables, description)?;
        let client = self.clone();
        Ok(Single::new(async move { client.run_mutation(call).await }))
    }

    /// Executes a read operation as a live query: the stream re-emits every
    /// time the cached result changes, until it is dropped.
    pub fn watch<T>(
        &self,
        operation: &OperationDescriptor,
        variables: Variables,
        description: &str,
    ) -> Result<Live<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let call = self.call(operation, OperationKind::Query, variables, description)?;
        let subscription = self.inner.cache.subscribe(&call.fingerprint);
        let client = self.clone();
        Ok(Live::watch(subscription, async move {
            // Live queries always go to the network once, whatever the policy.
            client
                .run_query::<T>(call, FetchPolicy::NetworkOnly)
                .await
                .map(drop)
        }))
    }

    // Operation-set conveniences

    pub fn read_all<T>(&self, operations: &OperationSet) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.query(operations.read_all(), Variables::new(), "read")
    }

    /// Live variant of [`read_all`](Self::read_all).
    pub fn watch_all<T>(&self, operations: &OperationSet) -> Result<Live<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.watch(operations.read_all(), Variables::new(), "read")
    }

    pub fn read_by_id<T>(
        &self,
        operations: &OperationSet,
        id: impl Into<Value>,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.query(operations.read_by_id(), self.id_variables(id), "readById")
    }

    /// Live search. A blank term yields the empty result at once, without
    /// touching the network or the cache.
    pub fn read_with_term<T>(
        &self,
        operations: &OperationSet,
        term: &str,
    ) -> Result<Live<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        if term.trim().is_empty() {
            debug!("blank search term, skipping request");
            return Ok(Live::ready(T::default()));
        }
        self.watch(
            operations.read_with_term(),
            Variables::new().with("term", term),
            "readWithTerm",
        )
    }

    pub fn create<T, R>(
        &self,
        operations: &OperationSet,
        record: &R,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + ?Sized,
    {
        self.mutate(operations.create(), Variables::from_record(record)?, "create")
    }

    pub fn update<T, R>(
        &self,
        operations: &OperationSet,
        record: &R,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + ?Sized,
    {
        self.mutate(operations.update(), Variables::from_record(record)?, "update")
    }

    /// Deletes the entity identified by `record`'s identity field.
    pub fn delete<T, R>(
        &self,
        operations: &OperationSet,
        record: &R,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + ?Sized,
    {
        let field = self.identity_field();
        let id = Variables::from_record(record)?
            .get(field)
            .cloned()
            .ok_or_else(|| ValidationError::MissingVariable(field.to_string()))?;
        self.mutate(operations.delete(), self.id_variables(id), "delete")
    }

    pub fn delete_by_id<T>(
        &self,
        operations: &OperationSet,
        id: impl Into<Value>,
    ) -> Result<Single<T>, ValidationError>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        self.mutate(operations.delete_by_id(), self.id_variables(id), "deleteById")
    }

    fn identity_field(&self) -> &str {
        &self.inner.cache.config().identity_field
    }

    fn id_variables(&self, id: impl Into<Value>) -> Variables {
        Variables::new().with(self.identity_field(), id)
    }

    // Execution

    async fn run_query<T: DeserializeOwned>(
        &self,
        call: Call,
        policy: FetchPolicy,
    ) -> ExecutionResult<T> {
        if policy == FetchPolicy::CacheFirst {
            if let Some(entry) = self.inner.cache.get(&call.fingerprint) {
                if let Ok(value) = T::deserialize(entry.payload.as_ref()) {
                    debug!(fingerprint = %call.fingerprint, revision = entry.revision, "cache hit");
                    self.report(&call, Ok(()));
                    return Ok(value);
                }
            }
        }

        let outcome = self.fetch(&call).await.and_then(|data| {
            let value = decode::<T>(&data)?;
            self.inner.cache.put(&call.fingerprint, data);
            Ok(value)
        });
        self.report(&call, outcome.as_ref().map(drop));
        outcome
    }

    async fn run_mutation<T: DeserializeOwned>(&self, call: Call) -> ExecutionResult<T> {
        let outcome = self
            .fetch(&call)
            .await
            .and_then(|data| decode::<T>(&data).map(|value| (value, data)));
        self.report(&call, outcome.as_ref().map(drop));

        let (value, data) = outcome?;
        self.apply_effect(&call.operation, &data).await;
        Ok(value)
    }

    async fn fetch(&self, call: &Call) -> ExecutionResult<Value> {
        let request = Request::new(&call.operation, call.fingerprint.bound_variables());
        self.send(&request).await
    }

    async fn send(&self, request: &Request) -> ExecutionResult<Value> {
        debug!(
            operation = request.operation_name.as_deref().unwrap_or("<anonymous>"),
            variables = %request.variables,
            "executing"
        );
        let transport = &self.inner.transport;
        let response = match self.inner.config.timeout {
            Some(limit) => tokio::time::timeout(limit, transport.execute(request))
                .await
                .map_err(|_| ExecutionError::timeout())??,
            None => transport.execute(request).await?,
        };
        response.into_data()
    }

    async fn apply_effect(&self, operation: &OperationDescriptor, data: &Value) {
        let cache = &self.inner.cache;
        let entities = identity::collect_entities(data, &cache.config().identity_field);

        match operation.effect() {
            MutationEffect::Merge => {
                let touched = cache.merge_entities(&entities);
                debug!(
                    entities = entities.len(),
                    touched = touched.len(),
                    "merged mutation result"
                );
            }
            MutationEffect::Evict => {
                let mut keys: Vec<EntityKey> = entities.into_iter().map(|(key, _)| key).collect();
                keys.sort();
                keys.dedup();
                let touched = cache.evict_entities(&keys);
                debug!(entities = keys.len(), touched = touched.len(), "evicted mutation result");
            }
            MutationEffect::Refetch => {
                cache.merge_entities(&entities);
                self.refetch_live().await;
            }
        }
    }

    /// Re-executes every live query and writes the results back, so each
    /// subscriber whose result changed sees exactly one new emission.
    async fn refetch_live(&self) {
        let live = self.inner.cache.live_entries();
        debug!(queries = live.len(), "refetching live queries");

        join_all(live.into_iter().map(|fingerprint| async move {
            let request = Request::from_fingerprint(&fingerprint);
            match self.send(&request).await {
                Ok(data) => {
                    self.inner.cache.put(&fingerprint, data);
                    self.inner.log.log(
                        LOG_SOURCE,
                        &format!("refetch record(s) with {}", fingerprint.bound_variables()),
                    );
                }
                Err(e) => self.report_failure(
                    OperationKind::Query,
                    fingerprint.text(),
                    fingerprint.bound_variables(),
                    "refetch",
                    &e,
                ),
            }
        }))
        .await;
    }

    fn report(&self, call: &Call, outcome: Result<(), &ExecutionError>) {
        let variables = call.fingerprint.bound_variables();
        match outcome {
            Ok(()) => self.inner.log.log(
                LOG_SOURCE,
                &format!("{} record(s) with {}", call.description, variables),
            ),
            Err(e) => self.report_failure(
                call.operation.kind(),
                call.operation.text(),
                variables,
                &call.description,
                e,
            ),
        }
    }

    /// Surfaces a failure on the console channel and in the diagnostic log.
    fn report_failure(
        &self,
        kind: OperationKind,
        text: &str,
        variables: &Variables,
        description: &str,
        err: &ExecutionError,
    ) {
        let label = match kind {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutate",
        };
        let operation = format!(
            "{}={} Variables={} Description={}",
            label,
            Value::String(text.to_string()),
            variables,
            description
        );

        error!(code = %err.code, %operation, "{}", err.message);
        self.inner.log.log(
            LOG_SOURCE,
            &format!("{} failed: {} code: {}", operation, err.message, err.code),
        );
    }
}

fn decode<T: DeserializeOwned>(data: &Value) -> ExecutionResult<T> {
    T::deserialize(data).map_err(|e| ExecutionError::deserialize(e.to_string()))
}

//! Result streams returned by the client.
//!
//! - [`Single`] emits exactly one value and completes. Plain queries and
//!   mutations return it.
//! - [`Live`] emits on every relevant cache change until it is dropped.
//!
//! Both carry a fallback. An execution that fails is replaced by the fallback
//! before it reaches the stream, so consumers never see an error item.

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{Stream, StreamExt};
use heroql_cache::Subscription;
use heroql_core::{ExecutionError, ExecutionResult};
use serde::de::DeserializeOwned;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::task::JoinHandle;
use tracing::warn;

type Fallback<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A single-value result stream.
///
/// Await it directly, or consume it as a [`Stream`] that yields once.
#[must_use = "streams do nothing unless polled"]
pub struct Single<T> {
    execution: Option<BoxFuture<'static, ExecutionResult<T>>>,
    fallback: Fallback<T>,
}

impl<T: Default + Send + 'static> Single<T> {
    /// Wraps an execution. The fallback defaults to `T::default()`.
    pub(crate) fn new<F>(execution: F) -> Self
    where
        F: Future<Output = ExecutionResult<T>> + Send + 'static,
    {
        Self {
            execution: Some(execution.boxed()),
            fallback: Arc::new(T::default),
        }
    }

    /// A stream that immediately yields `value`.
    pub fn ready(value: T) -> Self {
        Self::new(future::ready(Ok(value)))
    }
}

impl<T: Send + 'static> Single<T> {
    /// Replaces the fallback value.
    pub fn or(self, fallback: T) -> Self
    where
        T: Clone + Sync,
    {
        self.or_else(move || fallback.clone())
    }

    /// Replaces the fallback with a lazily computed value.
    pub fn or_else<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Reshapes the value (and the fallback) while keeping single arity.
    pub fn map<U, F>(self, f: F) -> Single<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let on_value = f.clone();
        let fallback = self.fallback;

        Single {
            execution: self
                .execution
                .map(|execution| execution.map(move |r| r.map(|v| (*on_value)(v))).boxed()),
            fallback: Arc::new(move || (*f)((*fallback)())),
        }
    }
}

impl<T> Stream for Single<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let Some(execution) = self.execution.as_mut() else {
            return Poll::Ready(None);
        };
        let outcome = ready!(execution.as_mut().poll(cx));
        self.execution = None;
        Poll::Ready(Some(match outcome {
            Ok(value) => value,
            Err(_) => (self.fallback)(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.execution.is_some());
        (n, Some(n))
    }
}

impl<T: Send + 'static> IntoFuture for Single<T> {
    type Output = T;
    type IntoFuture = BoxFuture<'static, T>;

    fn into_future(self) -> Self::IntoFuture {
        let fallback = self.fallback;
        match self.execution {
            Some(execution) => execution
                .map(move |outcome| outcome.unwrap_or_else(|_| (*fallback)()))
                .boxed(),
            None => future::ready((*fallback)()).boxed(),
        }
    }
}

/// A multi-value result stream backed by a cache subscription.
#[must_use = "streams do nothing unless polled"]
pub struct Live<T> {
    inner: LiveInner<T>,
}

enum LiveInner<T> {
    Ready(Option<T>),
    Watching(Watching<T>),
}

struct Watching<T> {
    subscription: Subscription,
    fetch: Fetch,
    fallback: Fallback<T>,
    emitted: bool,
}

enum Fetch {
    Idle(BoxFuture<'static, ExecutionResult<()>>),
    Running(JoinHandle<ExecutionResult<()>>),
    Done,
}

impl<T> Live<T> {
    /// Watches `subscription`, running `fetch` once on first poll.
    ///
    /// The fetch runs as its own task so dropping the stream never cancels a
    /// request that is already in flight.
    pub(crate) fn watch<F>(subscription: Subscription, fetch: F) -> Self
    where
        T: Default + 'static,
        F: Future<Output = ExecutionResult<()>> + Send + 'static,
    {
        Self {
            inner: LiveInner::Watching(Watching {
                subscription,
                fetch: Fetch::Idle(fetch.boxed()),
                fallback: Arc::new(T::default),
                emitted: false,
            }),
        }
    }

    /// A stream that yields `value` once and completes without watching
    /// anything.
    pub fn ready(value: T) -> Self {
        Self {
            inner: LiveInner::Ready(Some(value)),
        }
    }

    /// Replaces the value emitted when the initial fetch fails.
    pub fn or(self, fallback: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.or_else(move || fallback.clone())
    }

    /// Like [`or`](Self::or), computing the value lazily.
    pub fn or_else<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        if let LiveInner::Watching(watching) = &mut self.inner {
            watching.fallback = Arc::new(fallback);
        }
        self
    }

    /// Returns false for streams that completed without watching the cache.
    pub fn is_watching(&self) -> bool {
        matches!(self.inner, LiveInner::Watching(_))
    }
}

impl<T: DeserializeOwned + Unpin> Stream for Live<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        match &mut self.get_mut().inner {
            LiveInner::Ready(value) => Poll::Ready(value.take()),
            LiveInner::Watching(watching) => watching.poll_next(cx),
        }
    }
}

impl<T: DeserializeOwned> Watching<T> {
    fn poll_next(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        loop {
            if let Some(Err(_)) = self.poll_fetch(cx) {
                if !self.emitted {
                    self.emitted = true;
                    return Poll::Ready(Some((self.fallback)()));
                }
            }

            match ready!(self.subscription.poll_next_unpin(cx)) {
                Some(payload) => match T::deserialize(payload.as_ref()) {
                    Ok(value) => {
                        self.emitted = true;
                        return Poll::Ready(Some(value));
                    }
                    Err(e) => {
                        warn!(
                            fingerprint = %self.subscription.fingerprint(),
                            error = %e,
                            "skipping live payload of unexpected shape"
                        );
                    }
                },
                None => return Poll::Ready(None),
            }
        }
    }

    fn poll_fetch(&mut self, cx: &mut Context<'_>) -> Option<ExecutionResult<()>> {
        if matches!(self.fetch, Fetch::Idle(_)) {
            if let Fetch::Idle(fetch) = std::mem::replace(&mut self.fetch, Fetch::Done) {
                self.fetch = Fetch::Running(tokio::spawn(fetch));
            }
        }

        let Fetch::Running(handle) = &mut self.fetch else {
            return None;
        };
        match Pin::new(handle).poll(cx) {
            Poll::Ready(joined) => {
                self.fetch = Fetch::Done;
                Some(joined.unwrap_or_else(|e| {
                    Err(ExecutionError::network(format!("fetch task failed: {}", e)))
                }))
            }
            Poll::Pending => None,
        }
    }
}

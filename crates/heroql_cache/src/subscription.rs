//! Live subscriptions to cache entries.

use futures::Stream;
use heroql_core::Fingerprint;
use serde_json::Value;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::cache::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriberId(pub(crate) u64);

/// A stream of payloads for one fingerprint, in the order they were written.
///
/// Dropping the subscription cancels it. Other subscribers of the same
/// fingerprint and in-flight requests are unaffected.
pub struct Subscription {
    id: SubscriberId,
    fingerprint: Fingerprint,
    receiver: UnboundedReceiverStream<Arc<Value>>,
    state: Weak<Mutex<State>>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        fingerprint: Fingerprint,
        receiver: mpsc::UnboundedReceiver<Arc<Value>>,
        state: Weak<Mutex<State>>,
    ) -> Self {
        Self {
            id,
            fingerprint,
            receiver: UnboundedReceiverStream::new(receiver),
            state,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Stream for Subscription {
    type Item = Arc<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = state.entries.get_mut(&self.fingerprint) {
            slot.subscribers.remove(&self.id);
            if slot.is_unused() {
                state.entries.remove(&self.fingerprint);
            }
        }
        debug!(fingerprint = %self.fingerprint, subscriber = self.id.0, "unsubscribed");
    }
}

//! Normalized result cache.
//!
//! Entries are addressed by [`Fingerprint`]. Alongside them the cache keeps an
//! identity index (entity key -> fingerprints whose payload contains it), so a
//! mutation touching one entity can update every dependent result without
//! going back to the network.
//!
//! All state lives behind one mutex that is only held for synchronous work.
//! A write is therefore never observable half-applied.

use heroql_core::Fingerprint;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::identity::{self, EntityKey};
use crate::subscription::{Subscription, SubscriberId};

/// A snapshot of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    /// Last successful payload. Replaced as a whole, never patched in place.
    pub payload: Arc<Value>,
    /// Incremented each time the payload changes.
    pub revision: u64,
    pub written_at: Instant,
}

pub(crate) struct Slot {
    payload: Option<Arc<Value>>,
    revision: u64,
    written_at: Option<Instant>,
    write_seq: u64,
    identities: FxHashSet<EntityKey>,
    pub(crate) subscribers: FxHashMap<SubscriberId, mpsc::UnboundedSender<Arc<Value>>>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            payload: None,
            revision: 0,
            written_at: None,
            write_seq: 0,
            identities: FxHashSet::default(),
            subscribers: FxHashMap::default(),
        }
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn is_unused(&self) -> bool {
        self.payload.is_none() && self.subscribers.is_empty()
    }
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) entries: FxHashMap<Fingerprint, Slot>,
    identity_index: FxHashMap<EntityKey, FxHashSet<Fingerprint>>,
    next_subscriber: u64,
    write_seq: u64,
}

/// The shared, process-wide result cache. Cloning shares the same storage.
#[derive(Clone)]
pub struct ResultCache {
    state: Arc<Mutex<State>>,
    config: Arc<CacheConfig>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry for `fingerprint`, unless it was never written or
    /// has outlived the configured TTL.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let state = self.lock();
        let slot = state.entries.get(fingerprint)?;
        let (payload, written_at) = (slot.payload.clone()?, slot.written_at?);

        if let Some(ttl) = self.config.ttl {
            if written_at.elapsed() >= ttl {
                trace!(%fingerprint, "cache entry expired");
                return None;
            }
        }

        Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            payload,
            revision: slot.revision,
            written_at,
        })
    }

    /// Replaces the payload for `fingerprint` and notifies its subscribers if
    /// the payload changed. Every entity the payload carries is then merged
    /// into the other entries that contain it, so live results showing the
    /// same entity follow along. Returns the entry's revision after the write.
    pub fn put(&self, fingerprint: &Fingerprint, payload: Value) -> u64 {
        let field = self.config.identity_field.as_str();
        let entities = identity::collect_entities(&payload, field);

        let mut state = self.lock();
        let revision = write(&mut state, &self.config, fingerprint, payload);
        let touched = rewrite_dependents(
            &mut state,
            &self.config,
            entities.iter().map(|(key, _)| key),
            Some(fingerprint),
            |payload, key| merge_from(&entities, payload, key, field),
        );
        if !touched.is_empty() {
            debug!(
                %fingerprint,
                dependents = touched.len(),
                "normalized entities into dependents"
            );
        }
        enforce_capacity(&mut state, self.config.capacity);
        revision
    }

    /// Subscribes to changes of `fingerprint`. The current payload, if any, is
    /// delivered first.
    pub fn subscribe(&self, fingerprint: &Fingerprint) -> Subscription {
        let mut state = self.lock();
        let id = SubscriberId(state.next_subscriber);
        state.next_subscriber += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let slot = state
            .entries
            .entry(fingerprint.clone())
            .or_insert_with(Slot::empty);
        let fresh = match (self.config.ttl, slot.written_at) {
            (Some(ttl), Some(written_at)) => written_at.elapsed() < ttl,
            _ => true,
        };
        if let (true, Some(payload)) = (fresh, &slot.payload) {
            let _ = tx.send(payload.clone());
        }
        slot.subscribers.insert(id, tx);

        debug!(%fingerprint, subscriber = id.0, "subscribed");
        Subscription::new(id, fingerprint.clone(), rx, Arc::downgrade(&self.state))
    }

    /// Merges each entity into every cached payload that contains it.
    ///
    /// Returns the fingerprints whose payload changed.
    pub fn merge_entities(
        &self,
        entities: &[(EntityKey, Map<String, Value>)],
    ) -> Vec<Fingerprint> {
        let field = self.config.identity_field.as_str();
        let mut state = self.lock();
        rewrite_dependents(
            &mut state,
            &self.config,
            entities.iter().map(|(key, _)| key),
            None,
            |payload, key| merge_from(entities, payload, key, field),
        )
    }

    /// Removes each entity from every cached payload that contains it.
    ///
    /// Returns the fingerprints whose payload changed.
    pub fn evict_entities(&self, keys: &[EntityKey]) -> Vec<Fingerprint> {
        let field = self.config.identity_field.as_str();
        let mut state = self.lock();
        rewrite_dependents(&mut state, &self.config, keys.iter(), None, |payload, key| {
            identity::evict_entity(payload, key, field)
        })
    }

    /// Fingerprints that currently have at least one live subscriber.
    pub fn live_entries(&self) -> Vec<Fingerprint> {
        self.lock()
            .entries
            .iter()
            .filter(|(_, slot)| !slot.subscribers.is_empty())
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect()
    }

    /// Fingerprints whose payload contains `key`.
    pub fn dependents(&self, key: &EntityKey) -> Vec<Fingerprint> {
        self.lock()
            .identity_index
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drops the entry for `fingerprint`. Its subscribers stay registered and
    /// will see the next write.
    pub fn remove(&self, fingerprint: &Fingerprint) {
        let mut state = self.lock();
        drop_payload(&mut state, fingerprint);
        if state
            .entries
            .get(fingerprint)
            .is_some_and(Slot::is_unused)
        {
            state.entries.remove(fingerprint);
        }
    }

    /// Number of written entries.
    pub fn len(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|slot| slot.payload.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn merge_from(
    entities: &[(EntityKey, Map<String, Value>)],
    payload: &mut Value,
    key: &EntityKey,
    field: &str,
) -> bool {
    match entities.iter().find(|(k, _)| k == key) {
        Some((_, entity)) => identity::merge_entity(payload, key, entity, field),
        None => false,
    }
}

/// Rewrites every entry that depends on one of `keys`, except `skip`.
///
/// Each changed entry is written once, however many keys touched it.
fn rewrite_dependents<'k>(
    state: &mut State,
    config: &CacheConfig,
    keys: impl Iterator<Item = &'k EntityKey>,
    skip: Option<&Fingerprint>,
    mut rewrite: impl FnMut(&mut Value, &EntityKey) -> bool,
) -> Vec<Fingerprint> {
    let mut pending: Vec<(Fingerprint, Value)> = Vec::new();

    for key in keys {
        let dependents: Vec<Fingerprint> = match state.identity_index.get(key) {
            Some(set) => set.iter().filter(|f| skip != Some(*f)).cloned().collect(),
            None => continue,
        };

        for fingerprint in dependents {
            let position = pending.iter().position(|(f, _)| *f == fingerprint);
            let next = match position {
                Some(i) => &mut pending[i].1,
                None => {
                    let Some(current) = state
                        .entries
                        .get(&fingerprint)
                        .and_then(|slot| slot.payload.clone())
                    else {
                        continue;
                    };
                    pending.push((fingerprint, (*current).clone()));
                    let last = pending.len() - 1;
                    &mut pending[last].1
                }
            };
            rewrite(next, key);
        }
    }

    let mut touched = Vec::new();
    for (fingerprint, next) in pending {
        let before = state.entries.get(&fingerprint).map(Slot::revision);
        let after = write(state, config, &fingerprint, next);
        if before != Some(after) {
            touched.push(fingerprint);
        }
    }
    touched
}

fn write(
    state: &mut State,
    config: &CacheConfig,
    fingerprint: &Fingerprint,
    payload: Value,
) -> u64 {
    let identities = identity::collect_keys(&payload, &config.identity_field);
    state.write_seq += 1;
    let write_seq = state.write_seq;

    let slot = state
        .entries
        .entry(fingerprint.clone())
        .or_insert_with(Slot::empty);

    let changed = slot.payload.as_deref() != Some(&payload);
    slot.written_at = Some(Instant::now());
    slot.write_seq = write_seq;

    if !changed {
        trace!(%fingerprint, revision = slot.revision, "cache write unchanged");
        return slot.revision;
    }

    let payload = Arc::new(payload);
    slot.payload = Some(payload.clone());
    slot.revision += 1;
    let revision = slot.revision;

    slot.subscribers
        .retain(|_, tx| tx.send(payload.clone()).is_ok());
    debug!(
        %fingerprint,
        revision,
        subscribers = slot.subscribers.len(),
        "cache entry updated"
    );

    let previous = std::mem::replace(&mut slot.identities, identities.clone());
    for key in previous.difference(&identities) {
        if let Some(set) = state.identity_index.get_mut(key) {
            set.remove(fingerprint);
            if set.is_empty() {
                state.identity_index.remove(key);
            }
        }
    }
    for key in identities {
        state
            .identity_index
            .entry(key)
            .or_default()
            .insert(fingerprint.clone());
    }

    revision
}

fn drop_payload(state: &mut State, fingerprint: &Fingerprint) {
    let Some(slot) = state.entries.get_mut(fingerprint) else {
        return;
    };
    slot.payload = None;
    slot.written_at = None;
    for key in std::mem::take(&mut slot.identities) {
        if let Some(set) = state.identity_index.get_mut(&key) {
            set.remove(fingerprint);
            if set.is_empty() {
                state.identity_index.remove(&key);
            }
        }
    }
}

fn enforce_capacity(state: &mut State, capacity: Option<usize>) {
    let Some(capacity) = capacity else {
        return;
    };

    loop {
        let written = state
            .entries
            .values()
            .filter(|slot| slot.payload.is_some())
            .count();
        if written <= capacity {
            return;
        }

        let oldest = state
            .entries
            .iter()
            .filter(|(_, slot)| slot.payload.is_some() && slot.subscribers.is_empty())
            .min_by_key(|(_, slot)| slot.write_seq)
            .map(|(fingerprint, _)| fingerprint.clone());

        let Some(fingerprint) = oldest else {
            return;
        };
        debug!(%fingerprint, "evicting cache entry");
        drop_payload(state, &fingerprint);
        state.entries.remove(&fingerprint);
    }
}

//! Filter broker: the one piece of shared mutable state.
//!
//! [`FilterState`] is an immutable value. Every update builds a new value and
//! swaps it in whole, so a reader sees either the old or the new state and
//! never a mix. Writers are serialized from the swap through the last
//! listener call, so listeners observe changes in the order they were made.
//! Async consumers can follow the same state through [`FilterBroker::watch`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

use crate::dimension::{Dimension, DimensionKey};
use crate::model::{CanonicalRecord, EntityType};

/// Active dimension plus the airline-name allow-list.
///
/// An empty selection means "no restriction", not "nothing selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    active_dimension: Option<DimensionKey>,
    selected_entities: BTreeSet<String>,
}

impl FilterState {
    pub fn new(active_dimension: Option<DimensionKey>, selected_entities: BTreeSet<String>) -> Self {
        Self {
            active_dimension,
            selected_entities,
        }
    }

    pub fn active_dimension(&self) -> Option<DimensionKey> {
        self.active_dimension
    }

    pub fn dimension(&self) -> Option<Dimension> {
        self.active_dimension.map(DimensionKey::dimension)
    }

    /// The dimension charts should plot: the active one, else overall.
    pub fn effective_dimension(&self) -> DimensionKey {
        self.active_dimension.unwrap_or(DimensionKey::Overall)
    }

    pub fn selected_entities(&self) -> &BTreeSet<String> {
        &self.selected_entities
    }

    pub fn is_unfiltered(&self) -> bool {
        self.active_dimension.is_none() && self.selected_entities.is_empty()
    }

    /// Whether `record` passes the entity selection. The selection holds
    /// airline names, so airport and lounge records always pass.
    pub fn admits(&self, record: &CanonicalRecord) -> bool {
        record.entity_type() != EntityType::Airline
            || self.selected_entities.is_empty()
            || self.selected_entities.contains(record.entity_name())
    }

    fn toggle_dimension(&self, dimension: Option<DimensionKey>) -> Self {
        let active_dimension = match dimension {
            Some(d) if self.active_dimension == Some(d) => None,
            other => other,
        };
        Self {
            active_dimension,
            selected_entities: self.selected_entities.clone(),
        }
    }

    fn with_selection(&self, selected_entities: BTreeSet<String>) -> Self {
        Self {
            active_dimension: self.active_dimension,
            selected_entities,
        }
    }
}

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&FilterState) + Send + Sync>;

/// Holds the current [`FilterState`] and fans out changes.
pub struct FilterBroker {
    state: watch::Sender<Arc<FilterState>>,
    writer: Mutex<()>,
    revision: AtomicU64,
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl Default for FilterBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBroker {
    /// Starts with no active dimension and an empty selection.
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(FilterState::default()));
        Self {
            state,
            writer: Mutex::new(()),
            revision: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> Arc<FilterState> {
        self.state.borrow().clone()
    }

    /// Number of effective changes so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Sets the active dimension. Selecting the dimension that is already
    /// active clears it; `None` clears it too.
    pub fn set_active_dimension(&self, dimension: Option<DimensionKey>) -> Arc<FilterState> {
        self.update(|s| s.toggle_dimension(dimension))
    }

    /// Replaces the airline selection. An empty set lifts the restriction.
    pub fn set_selected_entities(&self, names: BTreeSet<String>) -> Arc<FilterState> {
        self.update(|s| s.with_selection(names))
    }

    /// Adds `name` to the selection, or removes it if already present.
    pub fn toggle_entity(&self, name: &str) -> Arc<FilterState> {
        self.update(|s| {
            let mut names = s.selected_entities.clone();
            if !names.remove(name) {
                names.insert(name.to_string());
            }
            s.with_selection(names)
        })
    }

    /// Back to the startup state.
    pub fn clear(&self) -> Arc<FilterState> {
        self.update(|_| FilterState::default())
    }

    /// Registers a listener called synchronously after every change.
    ///
    /// Listeners may read the broker but must not update it: the writer
    /// lock is held while they run.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&FilterState) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Receiver that observes every state swap.
    pub fn watch(&self) -> watch::Receiver<Arc<FilterState>> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&FilterState) -> FilterState) -> Arc<FilterState> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut changed = None;
        self.state.send_if_modified(|current| {
            let next = f(&**current);
            if next == **current {
                return false;
            }
            let next = Arc::new(next);
            *current = next.clone();
            changed = Some(next);
            true
        });

        match changed {
            Some(state) => {
                let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(
                    revision,
                    dimension = ?state.active_dimension,
                    selected = state.selected_entities.len(),
                    "Filter state changed"
                );
                self.notify(&state);
                state
            }
            None => self.current(),
        }
    }

    fn notify(&self, state: &FilterState) {
        // Listeners may subscribe from the callback, so run them outside the list lock.
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(state);
        }
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

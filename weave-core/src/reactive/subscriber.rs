//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values. Each
//! has a [`SubscriberId`]; a [`Dep`] is the set of subscribers registered
//! under one tracked key.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::effect::{Effect, WeakEffect};

/// Unique identifier for a subscriber.
///
/// Each computation (effect, computed or watcher) gets a unique ID when
/// created. This ID is used to deduplicate subscriptions and queued jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber set.
///
/// Members are held weakly: being subscribed never keeps a computation
/// alive. Cloning a `Dep` clones the handle, so the store and every
/// member's forward-dependency list share one set.
#[derive(Clone, Default)]
pub struct Dep(Rc<RefCell<IndexMap<SubscriberId, WeakEffect>>>);

impl Dep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered members, live or not.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Number of members that are still alive.
    pub fn live_count(&self) -> usize {
        self.0.borrow().values().filter(|e| e.is_alive()).count()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.0.borrow().contains_key(&id)
    }

    /// Add a member. Returns `false` if it was already present.
    pub(crate) fn insert(&self, effect: &Effect) -> bool {
        let mut members = self.0.borrow_mut();
        if members.contains_key(&effect.id()) {
            return false;
        }
        members.insert(effect.id(), effect.downgrade());
        true
    }

    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        self.0.borrow_mut().swap_remove(&id).is_some()
    }

    /// Snapshot of the live members. Dead members are dropped on the way.
    pub fn subscribers(&self) -> Vec<Effect> {
        let mut members = self.0.borrow_mut();
        let mut live = Vec::with_capacity(members.len());
        members.retain(|_, weak| match weak.upgrade() {
            Some(effect) => {
                live.push(effect);
                true
            }
            None => false,
        });
        live
    }

    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep").field("len", &self.len()).finish()
    }
}

//! Observation Store
//!
//! Maps an observed object's identity to its [`KeyRegistry`], and each key
//! in a registry to the [`Dep`] (subscriber set) of computations that read
//! it.
//!
//! The store holds objects weakly: an entry never keeps its object alive,
//! and entries whose object has been dropped are reclaimed by
//! [`ObservationStore::sweep`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::reactive::Dep;
use crate::value::{Object, ObjectId, Value, WeakObject};

/// A tracked key on an observed object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackKey {
    /// A named record property.
    Prop(Rc<str>),

    /// A list element.
    Index(usize),

    /// A list's `length`.
    Length,

    /// A map entry or set member, keyed by its raw key.
    Entry(Value),

    /// Own-key enumeration (and collection size).
    Iterate,

    /// Map key enumeration. Separate from [`TrackKey::Iterate`] so that
    /// overwriting a value does not re-run a computation that only
    /// enumerated keys.
    MapKeyIterate,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Prop(name) => f.write_str(name),
            TrackKey::Index(i) => write!(f, "{i}"),
            TrackKey::Length => f.write_str("length"),
            TrackKey::Entry(key) => write!(f, "entry({key})"),
            TrackKey::Iterate => f.write_str("<iterate>"),
            TrackKey::MapKeyIterate => f.write_str("<map-key-iterate>"),
        }
    }
}

impl From<&str> for TrackKey {
    fn from(name: &str) -> Self {
        TrackKey::Prop(Rc::from(name))
    }
}

impl From<usize> for TrackKey {
    fn from(index: usize) -> Self {
        TrackKey::Index(index)
    }
}

/// The kind of write being reported to `trigger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    /// An existing key was overwritten.
    Set,
    /// A new key or element appeared.
    Add,
    /// A key or element was removed.
    Delete,
    /// A collection was emptied in one step.
    Clear,
}

/// Per-object mapping from key to subscriber set.
#[derive(Default)]
pub struct KeyRegistry {
    deps: HashMap<TrackKey, Dep>,
}

impl KeyRegistry {
    pub fn get(&self, key: &TrackKey) -> Option<&Dep> {
        self.deps.get(key)
    }

    /// Get the subscriber set for `key`, creating it on first use.
    pub fn get_or_insert(&mut self, key: TrackKey) -> Dep {
        self.deps.entry(key).or_default().clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackKey, &Dep)> {
        self.deps.iter()
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    fn prune(&mut self) {
        self.deps.retain(|_, dep| dep.live_count() > 0);
    }
}

struct TargetEntry {
    target: WeakObject,
    keys: KeyRegistry,
}

/// The central registry of observed objects.
#[derive(Default)]
pub struct ObservationStore {
    targets: HashMap<ObjectId, TargetEntry>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the subscriber set for `(target, key)`, creating the registry
    /// and the set as needed.
    pub fn dep(&mut self, target: &Object, key: TrackKey) -> Dep {
        self.targets
            .entry(target.id())
            .or_insert_with(|| TargetEntry {
                target: target.downgrade(),
                keys: KeyRegistry::default(),
            })
            .keys
            .get_or_insert(key)
    }

    /// The registry for an object, if anything has tracked it.
    pub fn registry(&self, id: ObjectId) -> Option<&KeyRegistry> {
        self.targets.get(&id).map(|entry| &entry.keys)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.targets.contains_key(&id)
    }

    /// Drop an object's registry outright.
    pub fn evict(&mut self, id: ObjectId) -> bool {
        self.targets.remove(&id).is_some()
    }

    /// Drop registries whose object is gone and subscriber sets with no
    /// live subscribers. Returns the number of registries removed.
    pub fn sweep(&mut self) -> usize {
        let before = self.targets.len();
        self.targets.retain(|_, entry| {
            if !entry.target.is_alive() {
                return false;
            }
            entry.keys.prune();
            true
        });
        before - self.targets.len()
    }

    /// Number of objects with a registry.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

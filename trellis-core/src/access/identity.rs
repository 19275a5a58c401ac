//! Proxy Identity
//!
//! Traced handles are created fresh on every read, so the handle itself
//! carries no identity. Instead, every complex node is assigned a stable
//! `ProxyId` the first time it is traced, and the same node gets the same id
//! on every later pass for as long as it is alive.
//!
//! The table is keyed by allocation address and holds only weak references.
//! When a node is dropped its entry goes stale; a stale entry is replaced the
//! next time its address shows up, and stale entries are swept once the
//! table has doubled since the last sweep.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::state::{Map, NodeKey, Value};

/// Table size below which no sweep is attempted.
const MIN_SWEEP_LEN: usize = 1024;

/// Stable identity of a traced complex node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(u64);

impl ProxyId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
enum WeakNode {
    Array(Weak<Vec<Value>>),
    Object(Weak<Map>),
}

impl WeakNode {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(WeakNode::Array(Arc::downgrade(items))),
            Value::Object(fields) => Some(WeakNode::Object(Arc::downgrade(fields))),
            _ => None,
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            WeakNode::Array(weak) => weak.strong_count() > 0,
            WeakNode::Object(weak) => weak.strong_count() > 0,
        }
    }
}

/// Weak map from complex node to its `ProxyId`.
#[derive(Debug)]
pub struct IdentityCache {
    entries: DashMap<NodeKey, (WeakNode, ProxyId)>,
    sweep_at: AtomicUsize,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            sweep_at: AtomicUsize::new(MIN_SWEEP_LEN),
        }
    }

    /// The process-wide table used by traced handles.
    pub fn global() -> &'static IdentityCache {
        static GLOBAL: OnceLock<IdentityCache> = OnceLock::new();
        GLOBAL.get_or_init(IdentityCache::new)
    }

    /// Identity of `value`, or `None` for scalars.
    pub fn proxy_id(&self, value: &Value) -> Option<ProxyId> {
        let key = value.node_key()?;
        let id = match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                // A live entry at this address can only belong to `value`.
                if occupied.get().0.is_alive() {
                    return Some(occupied.get().1);
                }
                let id = ProxyId::next();
                occupied.insert((WeakNode::of(value)?, id));
                id
            }
            Entry::Vacant(vacant) => {
                let id = ProxyId::next();
                vacant.insert((WeakNode::of(value)?, id));
                id
            }
        };
        self.maybe_sweep();
        Some(id)
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry whose node is gone.
    pub fn sweep(&self) {
        self.entries.retain(|_, (weak, _)| weak.is_alive());
    }

    fn maybe_sweep(&self) {
        let len = self.entries.len();
        if len < self.sweep_at.load(Ordering::Relaxed) {
            return;
        }
        self.sweep();
        let next = (self.entries.len() * 2).max(MIN_SWEEP_LEN);
        self.sweep_at.store(next, Ordering::Relaxed);
        tracing::trace!(before = len, after = self.entries.len(), "swept identity cache");
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

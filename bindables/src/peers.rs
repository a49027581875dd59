use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// A set of non-owning references to the other members of a binding group.
///
/// Entries whose target has been dropped stay in the set until the next traversal
/// ([`PeerSet::live`], [`PeerSet::prune`] or [`PeerSet::clear`]) removes them.
pub struct PeerSet<I>(RwLock<Vec<Weak<I>>>);

impl<I> Default for PeerSet<I> {
    fn default() -> Self { Self::new() }
}

impl<I> std::fmt::Debug for PeerSet<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("PeerSet").field("entries", &self.len()).finish() }
}

impl<I> PeerSet<I> {
    pub fn new() -> Self { Self(RwLock::new(Vec::new())) }

    /// Adds a peer. Returns false if it was already present.
    pub fn insert(&self, peer: &Arc<I>) -> bool {
        let mut entries = self.0.write();
        if entries.iter().any(|entry| std::ptr::eq(entry.as_ptr(), Arc::as_ptr(peer))) {
            return false;
        }
        entries.push(Arc::downgrade(peer));
        true
    }

    pub fn remove(&self, peer: &Arc<I>) -> bool {
        let mut entries = self.0.write();
        let before = entries.len();
        entries.retain(|entry| !std::ptr::eq(entry.as_ptr(), Arc::as_ptr(peer)));
        entries.len() != before
    }

    pub fn contains(&self, peer: &Arc<I>) -> bool {
        self.0.read().iter().any(|entry| std::ptr::eq(entry.as_ptr(), Arc::as_ptr(peer)) && entry.strong_count() > 0)
    }

    /// Upgrades every live peer, dropping entries whose target is gone
    pub fn live(&self) -> Vec<Arc<I>> {
        let mut entries = self.0.write();
        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|entry| match entry.upgrade() {
            Some(peer) => {
                live.push(peer);
                true
            }
            None => false,
        });
        live
    }

    /// Removes dead entries, returning how many were removed
    pub fn prune(&self) -> usize {
        let mut entries = self.0.write();
        let before = entries.len();
        entries.retain(|entry| entry.strong_count() > 0);
        before - entries.len()
    }

    /// Empties the set, returning the peers that were still alive
    pub fn clear(&self) -> Vec<Arc<I>> { std::mem::take(&mut *self.0.write()).into_iter().filter_map(|entry| entry.upgrade()).collect() }

    /// Number of entries, including any dead ones not yet pruned
    pub fn len(&self) -> usize { self.0.read().len() }

    pub fn is_empty(&self) -> bool { self.0.read().is_empty() }
}

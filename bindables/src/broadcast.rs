use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::Result;

/// Identifies a listener registered with a [`Broadcast`]. Used to remove it again.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// A listener that is called with a borrow of each event sent through a broadcast.
pub enum Listener<E> {
    /// Infallible callback
    Callback(Arc<dyn Fn(&E) + Send + Sync + 'static>),
    /// Callback whose failure is reported back to whoever sent the event
    Fallible(Arc<dyn Fn(&E) -> Result<()> + Send + Sync + 'static>),
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        match self {
            Listener::Callback(f) => Listener::Callback(f.clone()),
            Listener::Fallible(f) => Listener::Fallible(f.clone()),
        }
    }
}

impl<E> Listener<E> {
    pub fn fallible<F>(f: F) -> Self
    where F: Fn(&E) -> Result<()> + Send + Sync + 'static {
        Listener::Fallible(Arc::new(f))
    }

    pub fn call(&self, event: &E) -> Result<()> {
        match self {
            Listener::Callback(f) => {
                f(event);
                Ok(())
            }
            Listener::Fallible(f) => f(event),
        }
    }
}

/// Trait for types that can be converted into broadcast listeners.
pub trait IntoListener<E> {
    fn into_listener(self) -> Listener<E>;
}

/// Ordered multicast of events to listeners.
///
/// Listeners are called in subscription order. The listener table is snapshotted before
/// dispatch so listeners may subscribe or unsubscribe while being called.
pub struct Broadcast<E> {
    listeners: RwLock<BTreeMap<ListenerId, Listener<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for Broadcast<E> {
    fn default() -> Self { Self::new() }
}

impl<E> std::fmt::Debug for Broadcast<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcast").field("listeners", &self.listeners.read().len()).finish()
    }
}

impl<E> Broadcast<E> {
    pub fn new() -> Self { Self { listeners: RwLock::new(BTreeMap::new()), next_id: AtomicU64::new(0) } }

    /// Appends a listener, returning the id that removes it
    pub fn listen<L>(&self, listener: L) -> ListenerId
    where L: IntoListener<E> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().insert(id, listener.into_listener());
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool { self.listeners.write().remove(&id).is_some() }

    pub fn clear(&self) { self.listeners.write().clear(); }

    pub fn len(&self) -> usize { self.listeners.read().len() }

    pub fn is_empty(&self) -> bool { self.listeners.read().is_empty() }

    /// Sends an event to every listener.
    ///
    /// All listeners are called even if one fails; the first failure is returned.
    pub fn send(&self, event: &E) -> Result<()> {
        // Clone the listeners to avoid holding the lock during callback execution
        let listeners: Vec<Listener<E>> = self.listeners.read().values().cloned().collect();

        let mut first_error = None;
        for listener in &listeners {
            if let Err(err) = listener.call(event) {
                tracing::debug!("listener failed: {err}");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

// IntoListener implementations for various types

impl<F, E> IntoListener<E> for F
where F: Fn(&E) + Send + Sync + 'static
{
    fn into_listener(self) -> Listener<E> { Listener::Callback(Arc::new(self)) }
}

impl<E> IntoListener<E> for Listener<E> {
    fn into_listener(self) -> Listener<E> { self }
}

impl<E> IntoListener<E> for std::sync::mpsc::Sender<E>
where E: Clone + Send + 'static
{
    fn into_listener(self) -> Listener<E> {
        Listener::Callback(Arc::new(move |event: &E| {
            let _ = self.send(event.clone()); // Ignore send errors
        }))
    }
}

#[cfg(feature = "tokio")]
impl<E> IntoListener<E> for tokio::sync::mpsc::UnboundedSender<E>
where E: Clone + Send + Sync + 'static
{
    fn into_listener(self) -> Listener<E> {
        Listener::Callback(Arc::new(move |event: &E| {
            let _ = self.send(event.clone()); // Ignore send errors
        }))
    }
}

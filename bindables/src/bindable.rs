use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use tracing::{debug, trace, warn};

use crate::{
    broadcast::{Broadcast, IntoListener, Listener, ListenerId},
    error::{BindableError, Result},
    peers::PeerSet,
    read::ReadBindable,
    subscription::SubscriptionGuard,
    value::ValueCell,
};

/// Serializes every read-modify-propagate-notify sequence across all binding groups.
/// Reentrant so listeners may mutate bindables from inside a notification.
static PROPAGATION: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

pub(crate) fn propagation_guard() -> ReentrantMutexGuard<'static, ()> { PROPAGATION.lock() }

/// Bounds shared by every type a bindable can hold
pub trait BindableValue: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static {}
impl<T> BindableValue for T where T: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static {}

/// Payload of a value-changed notification
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged<T> {
    pub old: T,
    pub new: T,
}

/// Normalizes every value written into a cell, shared by all members of a binding group
pub(crate) trait Constraint<T>: Send + Sync {
    fn apply(&self, value: T) -> T;

    /// An independent constraint with the same settings
    fn duplicate(&self) -> Arc<dyn Constraint<T>>;

    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct Inner<T> {
    pub(crate) cell: ValueCell<T>,
    pub(crate) constraint: RwLock<Option<Arc<dyn Constraint<T>>>>,
    pub(crate) value_changed: Broadcast<ValueChanged<T>>,
    pub(crate) disabled_changed: Broadcast<bool>,
    pub(crate) peers: PeerSet<Inner<T>>,
}

impl<T> Inner<T> {
    fn new(value: T, default: T) -> Self {
        Self { cell: ValueCell::new(value, default), constraint: RwLock::new(None), value_changed: Broadcast::new(), disabled_changed: Broadcast::new(), peers: PeerSet::new() }
    }
}

/// An observable value cell that can be bound bidirectionally to other cells of the same type.
///
/// Cloning a `Bindable` yields another handle to the *same* cell. A separate cell that
/// mirrors this one is obtained with [`Bindable::get_bound_copy`].
///
/// Bound cells only hold weak references to each other: a binding never keeps a
/// cell alive, and a dropped cell silently leaves its group.
pub struct Bindable<T>(pub(crate) Arc<Inner<T>>);

impl<T> Clone for Bindable<T> {
    fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<T: BindableValue + Default> Default for Bindable<T> {
    fn default() -> Self { Self::new(T::default()) }
}

// Listener bookkeeping needs no bounds on T so it can run from Drop impls
impl<T> Bindable<T> {
    pub fn remove_value_listener(&self, id: ListenerId) -> bool { self.0.value_changed.remove(id) }

    pub fn remove_disabled_listener(&self, id: ListenerId) -> bool { self.0.disabled_changed.remove(id) }

    /// Registers a value listener without running it
    pub(crate) fn listen_value(&self, listener: Listener<ValueChanged<T>>) -> ListenerId { self.0.value_changed.listen(listener) }

    /// Whether both handles refer to the same cell
    pub fn ptr_eq(&self, other: &Bindable<T>) -> bool { Arc::ptr_eq(&self.0, &other.0) }

    pub(crate) fn constraint(&self) -> Option<Arc<dyn Constraint<T>>> { self.0.constraint.read().clone() }

    pub(crate) fn set_constraint(&self, constraint: Arc<dyn Constraint<T>>) { *self.0.constraint.write() = Some(constraint); }

    /// Removes every value and disabled listener
    pub fn unbind_events(&self) {
        self.0.value_changed.clear();
        self.0.disabled_changed.clear();
    }
}

impl<T: BindableValue> Bindable<T> {
    /// Creates an unbound cell whose value and default are both `value`
    pub fn new(value: T) -> Self { Self(Arc::new(Inner::new(value.clone(), value))) }

    pub fn with_default(value: T, default: T) -> Self { Self(Arc::new(Inner::new(value, default))) }

    pub fn value(&self) -> T { self.0.cell.value() }

    /// Calls a closure with a borrow of the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.0.cell.with(f) }

    pub fn default_value(&self) -> T { self.0.cell.default_value() }

    pub fn is_default(&self) -> bool { self.0.cell.is_default() }

    pub fn is_disabled(&self) -> bool { self.0.cell.is_disabled() }

    /// Sets the value and propagates it to every live member of the binding group.
    ///
    /// Peers receive the value and fire their listeners before this cell's listeners fire.
    /// Setting a value equal to the current one does nothing. A range or precision shared with
    /// a [`BindableNumber`](crate::BindableNumber) is applied first.
    pub fn set_value(&self, value: T) -> Result<()> {
        let _guard = propagation_guard();
        if self.0.cell.is_disabled() {
            return Err(BindableError::disabled(&value));
        }
        let value = match self.constraint() {
            Some(constraint) => constraint.apply(value),
            None => value,
        };
        if self.0.cell.holds(&value) {
            return Ok(());
        }
        let previous = self.0.cell.replace(value);
        propagate_value(&self.0, previous)
    }

    /// Resets the value to the default
    pub fn set_default(&self) -> Result<()> { self.set_value(self.default_value()) }

    /// Changes the stored default. Not propagated to peers.
    pub fn set_default_value(&self, default: T) -> Result<()> {
        let _guard = propagation_guard();
        if self.0.cell.is_disabled() {
            return Err(BindableError::disabled(&default));
        }
        self.0.cell.set_default(default);
        Ok(())
    }

    /// Enables or disables this cell and every live member of its binding group.
    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        let _guard = propagation_guard();
        if self.0.cell.is_disabled() == disabled {
            return Ok(());
        }
        self.0.cell.set_disabled(disabled);

        let group = relax(&self.0, |peer| {
            peer.cell.set_disabled(disabled);
            true
        });
        trace!(members = group.len(), disabled, "propagated disabled state");

        let mut first_error = None;
        for member in group.iter().rev() {
            if member.cell.is_disabled() != disabled {
                continue;
            }
            if let Err(err) = member.disabled_changed.send(&disabled) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Binds this cell to `other` so that changes to either propagate to the other.
    ///
    /// `other` should be the more permanent end of the binding (e.g. a config-backed
    /// bindable): its value, default and disabled state are copied onto this cell first.
    /// If `other` carries numeric limits, this cell shares them from then on.
    pub fn bind_to(&self, other: &Bindable<T>) -> Result<()> {
        let _guard = propagation_guard();
        if self.ptr_eq(other) {
            return Err(BindableError::InvalidArgument("a bindable cannot be bound to itself".into()));
        }
        if self.0.peers.contains(&other.0) {
            return Err(BindableError::AlreadyBound);
        }
        self.0.cell.copy_from(&other.0.cell);
        if let Some(constraint) = other.constraint() {
            self.set_constraint(constraint);
        }
        link(&self.0, &other.0);
        debug!(value = ?self.0.cell.value(), "bound bindable");
        Ok(())
    }

    /// Removes the link between this cell and `other`. Listeners are untouched.
    pub fn unbind_from(&self, other: &Bindable<T>) {
        let _guard = propagation_guard();
        let removed = self.0.peers.remove(&other.0);
        other.0.peers.remove(&self.0);
        if removed {
            debug!("unbound bindable");
        }
    }

    /// Removes this cell from its binding group
    pub fn unbind_bindings(&self) {
        let _guard = propagation_guard();
        for peer in self.0.peers.clear() {
            peer.peers.remove(&self.0);
        }
    }

    /// Removes every listener and every binding
    pub fn unbind_all(&self) {
        self.unbind_events();
        self.unbind_bindings();
    }

    /// A new cell bound to this one, sharing its limits if it has any
    pub fn get_bound_copy(&self) -> Bindable<T> {
        let _guard = propagation_guard();
        let copy = self.copy_cell();
        if let Some(constraint) = self.constraint() {
            copy.set_constraint(constraint);
        }
        link(&copy.0, &self.0);
        copy
    }

    /// A new cell with this cell's value, default, disabled state and a copy of its limits,
    /// not bound to anything
    pub fn get_unbound_copy(&self) -> Bindable<T> {
        let copy = self.copy_cell();
        if let Some(constraint) = self.constraint() {
            copy.set_constraint(constraint.duplicate());
        }
        copy
    }

    fn copy_cell(&self) -> Bindable<T> {
        let copy = Bindable::new(self.value());
        copy.0.cell.copy_from(&self.0.cell);
        copy
    }

    /// Number of live bound peers. Dead references are pruned.
    pub fn peer_count(&self) -> usize { self.0.peers.live().len() }

    pub fn is_bound_to(&self, other: &Bindable<T>) -> bool { self.0.peers.contains(&other.0) }

    /// Read-only view of this cell
    pub fn read(&self) -> ReadBindable<T> { ReadBindable::from(self) }

    /// Adds a value-changed listener. It stays registered until removed or `unbind_events`.
    ///
    /// With `run_once_immediately` the listener is called straight away with the current value
    /// as both old and new.
    pub fn bind_value_changed<F>(&self, on_change: F, run_once_immediately: bool) -> Result<ListenerId>
    where F: Fn(&ValueChanged<T>) + Send + Sync + 'static {
        self.bind_value_listener(on_change, run_once_immediately)
    }

    /// Like [`Bindable::bind_value_changed`] for anything convertible to a listener
    /// (fallible listeners, channel senders).
    pub fn bind_value_listener<L>(&self, listener: L, run_once_immediately: bool) -> Result<ListenerId>
    where L: IntoListener<ValueChanged<T>> {
        let listener = listener.into_listener();
        let id = self.0.value_changed.listen(listener.clone());
        if run_once_immediately {
            let value = self.value();
            if let Err(err) = listener.call(&ValueChanged { old: value.clone(), new: value }) {
                self.0.value_changed.remove(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    /// Adds a disabled-changed listener
    pub fn bind_disabled_changed<F>(&self, on_change: F, run_once_immediately: bool) -> ListenerId
    where F: Fn(bool) + Send + Sync + 'static {
        let on_change = Arc::new(on_change);
        let id = self.0.disabled_changed.listen({
            let on_change = on_change.clone();
            move |disabled: &bool| on_change(*disabled)
        });
        if run_once_immediately {
            on_change(self.is_disabled());
        }
        id
    }

    /// Adds a value listener that is removed when the returned guard is dropped
    pub fn subscribe<L>(&self, listener: L) -> SubscriptionGuard
    where L: IntoListener<ValueChanged<T>> {
        let id = self.0.value_changed.listen(listener);
        let weak = Arc::downgrade(&self.0);
        SubscriptionGuard::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.value_changed.remove(id);
            }
        })
    }
}

impl Bindable<bool> {
    pub fn toggle(&self) -> Result<()> { self.set_value(!self.value()) }
}

/// Inserts the mutual weak link between two cells
fn link<T>(a: &Arc<Inner<T>>, b: &Arc<Inner<T>>) {
    a.peers.insert(b);
    b.peers.insert(a);
}

/// Walks the binding group breadth-first from `origin`, visiting each live member once.
///
/// `visit` is called for every newly reached peer; returning false leaves the peer (and
/// anything only reachable through it) out of the group. Returns the group in discovery
/// order, `origin` first.
fn relax<T>(origin: &Arc<Inner<T>>, mut visit: impl FnMut(&Arc<Inner<T>>) -> bool) -> Vec<Arc<Inner<T>>> {
    let mut seen: HashSet<*const Inner<T>> = HashSet::from([Arc::as_ptr(origin)]);
    let mut group = vec![Arc::clone(origin)];
    let mut next = 0;
    while next < group.len() {
        let member = Arc::clone(&group[next]);
        next += 1;
        for peer in member.peers.live() {
            if !seen.insert(Arc::as_ptr(&peer)) {
                continue;
            }
            if visit(&peer) {
                group.push(peer);
            }
        }
    }
    group
}

/// Pushes `origin`'s current value to its group, then notifies farthest members first
/// and `origin` last.
fn propagate_value<T: BindableValue>(origin: &Arc<Inner<T>>, previous: T) -> Result<()> {
    let value = origin.cell.value();
    let group = relax(origin, |peer| {
        if peer.cell.is_disabled() {
            warn!(value = ?value, "skipping disabled peer during propagation");
            return false;
        }
        peer.cell.set(value.clone());
        true
    });
    trace!(members = group.len(), value = ?value, "propagated value");

    let event = ValueChanged { old: previous, new: value };
    let mut first_error = None;
    for member in group.iter().rev() {
        // a listener earlier in this pass already moved the group on and notified it
        if !member.cell.holds(&event.new) {
            continue;
        }
        if let Err(err) = member.value_changed.send(&event) {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}

impl<T: std::fmt::Display> std::fmt::Display for Bindable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.cell.with(|value| write!(f, "{value}")) }
}

impl<T: BindableValue> std::fmt::Debug for Bindable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindable")
            .field("value", &self.value())
            .field("default", &self.default_value())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

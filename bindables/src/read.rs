use crate::{
    bindable::{Bindable, BindableValue, ValueChanged},
    broadcast::{IntoListener, ListenerId},
    error::Result,
    subscription::SubscriptionGuard,
};

/// Read-only view of a bindable.
///
/// Exposes observation but no mutation or binding, so whoever owns the underlying
/// [`Bindable`] stays its only writer. Aggregate results are handed out this way.
pub struct ReadBindable<T>(pub(crate) Bindable<T>);

impl<T> Clone for ReadBindable<T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> From<Bindable<T>> for ReadBindable<T> {
    fn from(bindable: Bindable<T>) -> Self { Self(bindable) }
}

impl<T> From<&Bindable<T>> for ReadBindable<T> {
    fn from(bindable: &Bindable<T>) -> Self { Self(bindable.clone()) }
}

impl<T> From<&ReadBindable<T>> for ReadBindable<T> {
    fn from(read: &ReadBindable<T>) -> Self { read.clone() }
}

impl<T> ReadBindable<T> {
    pub fn ptr_eq(&self, other: &ReadBindable<T>) -> bool { self.0.ptr_eq(&other.0) }

    pub fn remove_value_listener(&self, id: ListenerId) -> bool { self.0.remove_value_listener(id) }

    pub fn remove_disabled_listener(&self, id: ListenerId) -> bool { self.0.remove_disabled_listener(id) }

    /// Whether this view looks at `bindable`
    pub fn is_view_of(&self, bindable: &Bindable<T>) -> bool { self.0.ptr_eq(bindable) }
}

impl<T: BindableValue> ReadBindable<T> {
    pub fn value(&self) -> T { self.0.value() }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { self.0.with(f) }

    pub fn default_value(&self) -> T { self.0.default_value() }

    pub fn is_default(&self) -> bool { self.0.is_default() }

    pub fn is_disabled(&self) -> bool { self.0.is_disabled() }

    pub fn bind_value_changed<F>(&self, on_change: F, run_once_immediately: bool) -> Result<ListenerId>
    where F: Fn(&ValueChanged<T>) + Send + Sync + 'static {
        self.0.bind_value_changed(on_change, run_once_immediately)
    }

    pub fn bind_value_listener<L>(&self, listener: L, run_once_immediately: bool) -> Result<ListenerId>
    where L: IntoListener<ValueChanged<T>> {
        self.0.bind_value_listener(listener, run_once_immediately)
    }

    pub fn bind_disabled_changed<F>(&self, on_change: F, run_once_immediately: bool) -> ListenerId
    where F: Fn(bool) + Send + Sync + 'static {
        self.0.bind_disabled_changed(on_change, run_once_immediately)
    }

    pub fn subscribe<L>(&self, listener: L) -> SubscriptionGuard
    where L: IntoListener<ValueChanged<T>> {
        self.0.subscribe(listener)
    }

    /// A new, writable cell holding a snapshot of this one's state
    pub fn get_unbound_copy(&self) -> Bindable<T> { self.0.get_unbound_copy() }
}

impl<T: std::fmt::Display> std::fmt::Display for ReadBindable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { std::fmt::Display::fmt(&self.0, f) }
}

impl<T: BindableValue> std::fmt::Debug for ReadBindable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_tuple("ReadBindable").field(&self.0).finish() }
}

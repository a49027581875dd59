use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    bindable::{Bindable, BindableValue, propagation_guard},
    broadcast::{Listener, ListenerId},
    error::{BindableError, Result},
    read::ReadBindable,
};

/// Values an [`AggregateBindable`] can fold.
///
/// Absent values are skipped by the fold rather than combined.
pub trait Aggregatable: BindableValue {
    fn is_absent(&self) -> bool { false }
}

macro_rules! impl_aggregatable {
    ($($t:ty),*) => {$( impl Aggregatable for $t {} )*};
}

impl_aggregatable!(i32, i64, u32, u64, usize, bool, String);

impl Aggregatable for f32 {
    fn is_absent(&self) -> bool { self.is_nan() }
}

impl Aggregatable for f64 {
    fn is_absent(&self) -> bool { self.is_nan() }
}

impl<T: BindableValue> Aggregatable for Option<T> {
    fn is_absent(&self) -> bool { self.is_none() }
}

struct Source<T> {
    bindable: ReadBindable<T>,
    listener: ListenerId,
}

struct Inner<T> {
    combine: Box<dyn Fn(&T, &T) -> T + Send + Sync>,
    /// Seeds the fold; listened to like any source
    default_source: Source<T>,
    sources: RwLock<Vec<Source<T>>>,
    result: Bindable<T>,
}

/// A read-only value derived from an ordered list of source bindables.
///
/// The result is `combine(...combine(combine(default, s1), s2)..., sN)`: the fold starts from
/// the default source's current value and visits sources in the order they were added,
/// skipping absent values. It is recomputed synchronously whenever a source (or the
/// default source) changes.
///
/// Sources only hold a weak reference back to the aggregate, and dropping the aggregate
/// removes every listener it installed.
///
/// # Example
/// ```
/// use tether_bindables::*;
///
/// let volume = AggregateBindable::new(|a: &f64, b: &f64| a * b, Bindable::new(1.0));
/// let master = Bindable::new(0.5);
/// let track = Bindable::new(0.8);
/// volume.add_source(&master).unwrap();
/// volume.add_source(&track).unwrap();
/// assert_eq!(volume.value(), 0.4);
///
/// track.set_value(0.2).unwrap();
/// assert_eq!(volume.value(), 0.1);
/// ```
pub struct AggregateBindable<T>(Arc<Inner<T>>);

impl<T: Aggregatable> AggregateBindable<T> {
    pub fn new<F>(combine: F, default_source: impl Into<ReadBindable<T>>) -> Self
    where F: Fn(&T, &T) -> T + Send + Sync + 'static {
        let default_source = default_source.into();
        let result = Bindable::new(default_source.value());
        Self(Arc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let listener = default_source.0.listen_value(recompute_listener(weak.clone()));
            Inner { combine: Box::new(combine), default_source: Source { bindable: default_source, listener }, sources: RwLock::new(Vec::new()), result }
        }))
    }

    /// The derived value. Observe it; only the aggregate writes to it.
    pub fn result(&self) -> ReadBindable<T> { self.0.result.read() }

    pub fn value(&self) -> T { self.0.result.value() }

    pub fn default_source(&self) -> ReadBindable<T> { self.0.default_source.bindable.clone() }

    /// Appends a source and recomputes. Adding a source that is already present does nothing.
    pub fn add_source(&self, source: impl Into<ReadBindable<T>>) -> Result<()> {
        let source = source.into();
        let _guard = propagation_guard();
        if source.is_view_of(&self.0.result) {
            return Err(BindableError::InvalidArgument("an aggregate cannot be its own source".into()));
        }
        {
            let mut sources = self.0.sources.write();
            if sources.iter().any(|entry| entry.bindable.ptr_eq(&source)) {
                return Ok(());
            }
            let listener = source.0.listen_value(recompute_listener(Arc::downgrade(&self.0)));
            sources.push(Source { bindable: source, listener });
            debug!(sources = sources.len(), "added aggregate source");
        }
        self.0.recompute()
    }

    /// Removes a source and recomputes. Removing an unknown source does nothing.
    pub fn remove_source(&self, source: impl Into<ReadBindable<T>>) -> Result<()> {
        let source = source.into();
        let _guard = propagation_guard();
        let removed = {
            let mut sources = self.0.sources.write();
            let position = sources.iter().position(|entry| entry.bindable.ptr_eq(&source));
            position.map(|index| sources.remove(index))
        };
        match removed {
            Some(entry) => {
                entry.bindable.remove_value_listener(entry.listener);
                debug!("removed aggregate source");
                self.0.recompute()
            }
            None => Ok(()),
        }
    }

    /// Removes every source; the result falls back to the default source's value
    pub fn remove_all_sources(&self) -> Result<()> {
        let _guard = propagation_guard();
        let removed = std::mem::take(&mut *self.0.sources.write());
        for entry in removed {
            entry.bindable.remove_value_listener(entry.listener);
        }
        self.0.recompute()
    }

    pub fn source_count(&self) -> usize { self.0.sources.read().len() }

    pub fn contains_source(&self, source: impl Into<ReadBindable<T>>) -> bool {
        let source = source.into();
        self.0.sources.read().iter().any(|entry| entry.bindable.ptr_eq(&source))
    }
}

impl<T: Aggregatable> Inner<T> {
    fn recompute(&self) -> Result<()> {
        let _guard = propagation_guard();
        // Snapshot so no lock is held while the result notifies its listeners
        let values: Vec<T> = self.sources.read().iter().map(|entry| entry.bindable.value()).collect();

        let mut aggregate = self.default_source.bindable.value();
        for value in values.iter().filter(|value| !value.is_absent()) {
            aggregate = (self.combine)(&aggregate, value);
        }
        self.result.set_value(aggregate)
    }
}

fn recompute_listener<T: Aggregatable>(weak: Weak<Inner<T>>) -> Listener<crate::ValueChanged<T>> {
    Listener::fallible(move |_| match weak.upgrade() {
        Some(inner) => inner.recompute(),
        None => Ok(()),
    })
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        for entry in self.sources.get_mut().drain(..) {
            entry.bindable.remove_value_listener(entry.listener);
        }
        self.default_source.bindable.remove_value_listener(self.default_source.listener);
    }
}

impl<T: Aggregatable> std::fmt::Debug for AggregateBindable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateBindable").field("value", &self.value()).field("sources", &self.source_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindableDouble;

    fn product() -> AggregateBindable<f64> { AggregateBindable::new(|a: &f64, b: &f64| a * b, Bindable::new(1.0)) }

    #[test]
    fn test_fold_add_remove() {
        let aggregate = product();
        let a = Bindable::new(2.0);
        let b = Bindable::new(3.0);

        aggregate.add_source(&a).unwrap();
        aggregate.add_source(&b).unwrap();
        assert_eq!(aggregate.value(), 6.0);

        aggregate.remove_source(&b).unwrap();
        assert_eq!(aggregate.value(), 2.0);

        aggregate.remove_all_sources().unwrap();
        assert_eq!(aggregate.value(), 1.0);
    }

    #[test]
    fn test_duplicate_source_ignored() {
        let aggregate = product();
        let a = Bindable::new(2.0);
        aggregate.add_source(&a).unwrap();
        aggregate.add_source(&a).unwrap();
        assert_eq!(aggregate.source_count(), 1);
        assert_eq!(aggregate.value(), 2.0);
    }

    #[test]
    fn test_source_change_recomputes() {
        let aggregate = product();
        let a = BindableDouble::new(2.0);
        aggregate.add_source(&a).unwrap();

        a.set_value(4.0).unwrap();
        assert_eq!(aggregate.value(), 4.0);

        // removed sources no longer drive the result
        aggregate.remove_source(&a).unwrap();
        a.set_value(10.0).unwrap();
        assert_eq!(aggregate.value(), 1.0);
        assert_eq!(a.0.value_changed.len(), 0);
    }

    #[test]
    fn test_fold_order_is_insertion_order() {
        let joined = AggregateBindable::new(|a: &String, b: &String| format!("{a}{b}"), Bindable::new(">".to_string()));
        let x = Bindable::new("x".to_string());
        let y = Bindable::new("y".to_string());
        joined.add_source(&y).unwrap();
        joined.add_source(&x).unwrap();
        assert_eq!(joined.value(), ">yx");
    }

    #[test]
    fn test_absent_values_skipped() {
        let sum = AggregateBindable::new(|a: &Option<i32>, b: &Option<i32>| Some(a.unwrap_or(0) + b.unwrap_or(0)), Bindable::new(Some(0)));
        let a = Bindable::new(Some(4));
        let b = Bindable::new(None);
        sum.add_source(&a).unwrap();
        sum.add_source(&b).unwrap();
        assert_eq!(sum.value(), Some(4));

        b.set_value(Some(1)).unwrap();
        assert_eq!(sum.value(), Some(5));
    }

    #[test]
    fn test_nan_source_skipped() {
        let aggregate = product();
        let a = Bindable::new(f64::NAN);
        let b = Bindable::new(3.0);
        aggregate.add_source(&a).unwrap();
        aggregate.add_source(&b).unwrap();
        assert_eq!(aggregate.value(), 3.0);
    }

    #[test]
    fn test_default_source_change_recomputes() {
        let base = Bindable::new(1.0);
        let aggregate = AggregateBindable::new(|a: &f64, b: &f64| a * b, &base);
        let a = Bindable::new(3.0);
        aggregate.add_source(&a).unwrap();

        base.set_value(2.0).unwrap();
        assert_eq!(aggregate.value(), 6.0);
    }

    #[test]
    fn test_drop_detaches_listeners() {
        let a = Bindable::new(2.0);
        let aggregate = product();
        aggregate.add_source(&a).unwrap();
        assert_eq!(a.0.value_changed.len(), 1);

        drop(aggregate);
        assert_eq!(a.0.value_changed.len(), 0);
        a.set_value(5.0).unwrap();
    }

    #[test]
    fn test_own_result_rejected_as_source() {
        let aggregate = product();
        assert!(matches!(aggregate.add_source(aggregate.result()), Err(BindableError::InvalidArgument(_))));
    }

    #[test]
    fn test_result_listeners_fire_on_recompute() {
        let aggregate = product();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            aggregate.result().bind_value_changed(move |e| seen.lock().push(e.new), false).unwrap();
        }
        let a = Bindable::new(2.0);
        aggregate.add_source(&a).unwrap();
        a.set_value(5.0).unwrap();
        assert_eq!(*seen.lock(), vec![2.0, 5.0]);
    }
}

use std::any::Any;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{
    bindable::{Bindable, BindableValue, Constraint, propagation_guard},
    error::{BindableError, Result},
    read::ReadBindable,
};

/// Numeric types a [`BindableNumber`] can hold
pub trait Number: BindableValue + Copy + PartialOrd {
    /// Addition that stays within the type's range
    fn bounded_add(self, rhs: Self) -> Self;

    /// Rounds to the nearest multiple of `precision`
    fn round_to(self, precision: Self) -> Self;
}

/// Floating point numbers, which additionally support a precision
pub trait Float: Number {
    fn is_valid_precision(self) -> bool;
}

macro_rules! impl_integer {
    ($($t:ty),*) => {$(
        impl Number for $t {
            fn bounded_add(self, rhs: Self) -> Self { self.saturating_add(rhs) }
            fn round_to(self, _precision: Self) -> Self { self }
        }
    )*};
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl Number for $t {
            fn bounded_add(self, rhs: Self) -> Self { self + rhs }
            fn round_to(self, precision: Self) -> Self { (self / precision).round() * precision }
        }

        impl Float for $t {
            fn is_valid_precision(self) -> bool { self.is_finite() && self > 0.0 }
        }
    )*};
}

impl_integer!(i32, i64);
impl_float!(f32, f64);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Limits<T> {
    min: Option<T>,
    max: Option<T>,
    precision: Option<T>,
}

impl<T> Default for Limits<T> {
    fn default() -> Self { Self { min: None, max: None, precision: None } }
}

impl<T: Number> Limits<T> {
    /// Rounds to precision, then clamps into range
    fn apply(&self, mut value: T) -> T {
        if let Some(precision) = self.precision {
            value = value.round_to(precision);
        }
        if let Some(min) = self.min {
            if value < min {
                value = min;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                value = max;
            }
        }
        value
    }
}

/// Limits installed on every cell of a numeric binding group
struct SharedLimits<T>(RwLock<Limits<T>>);

impl<T: Number> Constraint<T> for SharedLimits<T> {
    fn apply(&self, value: T) -> T { self.0.read().apply(value) }

    fn duplicate(&self) -> Arc<dyn Constraint<T>> { Arc::new(SharedLimits(RwLock::new(*self.0.read()))) }

    fn as_any(&self) -> &dyn Any { self }
}

/// A bindable number with an optional range and, for floating point types, a precision.
///
/// Every value written into the binding group is rounded to the precision and then clamped
/// to `[min, max]`, whichever member it is written through. Bound copies, and plain
/// [`Bindable`]s bound to a number, share one set of limits: narrowing the range on any member
/// narrows it for the whole group.
///
/// Derefs to [`Bindable`] for everything that does not involve the limits.
pub struct BindableNumber<T> {
    bindable: Bindable<T>,
}

pub type BindableInt = BindableNumber<i32>;
pub type BindableLong = BindableNumber<i64>;
pub type BindableFloat = BindableNumber<f32>;
pub type BindableDouble = BindableNumber<f64>;
pub type BindableBool = Bindable<bool>;

impl<T> Clone for BindableNumber<T> {
    fn clone(&self) -> Self { Self { bindable: self.bindable.clone() } }
}

impl<T> Deref for BindableNumber<T> {
    type Target = Bindable<T>;
    fn deref(&self) -> &Bindable<T> { &self.bindable }
}

impl<T> AsRef<Bindable<T>> for BindableNumber<T> {
    fn as_ref(&self) -> &Bindable<T> { &self.bindable }
}

impl<T> From<&BindableNumber<T>> for ReadBindable<T> {
    fn from(number: &BindableNumber<T>) -> Self { ReadBindable::from(&number.bindable) }
}

impl<T: Number + Default> Default for BindableNumber<T> {
    fn default() -> Self { Self::new(T::default()) }
}

impl<T: Number> BindableNumber<T> {
    pub fn new(value: T) -> Self {
        let bindable = Bindable::new(value);
        bindable.set_constraint(Arc::new(SharedLimits(RwLock::new(Limits::default()))));
        Self { bindable }
    }

    /// Runs `f` on the group's limits, installing empty ones if the cell has none
    fn with_limits<R>(&self, f: impl FnOnce(&RwLock<Limits<T>>) -> R) -> R {
        let shared = match self.bindable.constraint() {
            Some(constraint) if constraint.as_any().is::<SharedLimits<T>>() => constraint,
            _ => {
                let constraint: Arc<dyn Constraint<T>> = Arc::new(SharedLimits(RwLock::new(Limits::default())));
                self.bindable.set_constraint(constraint.clone());
                constraint
            }
        };
        match shared.as_any().downcast_ref::<SharedLimits<T>>() {
            Some(limits) => f(&limits.0),
            None => f(&RwLock::new(Limits::default())),
        }
    }

    fn limits(&self) -> Limits<T> { self.with_limits(|limits| *limits.read()) }

    pub fn min_value(&self) -> Option<T> { self.limits().min }

    pub fn max_value(&self) -> Option<T> { self.limits().max }

    pub fn precision(&self) -> Option<T> { self.limits().precision }

    pub fn has_limits(&self) -> bool { self.limits() != Limits::default() }

    pub fn add(&self, delta: T) -> Result<()> { self.set_value(self.value().bounded_add(delta)) }

    /// Sets the lower bound, clamping the current value if it now falls outside the range
    pub fn set_min_value(&self, min: impl Into<Option<T>>) -> Result<()> {
        let min = min.into();
        self.update_limits(|limits| {
            if let (Some(min), Some(max)) = (min, limits.max) {
                if min > max {
                    return Err(BindableError::InvalidArgument(format!("min value {min:?} is greater than max value {max:?}")));
                }
            }
            limits.min = min;
            Ok(())
        })
    }

    /// Sets the upper bound, clamping the current value if it now falls outside the range
    pub fn set_max_value(&self, max: impl Into<Option<T>>) -> Result<()> {
        let max = max.into();
        self.update_limits(|limits| {
            if let (Some(min), Some(max)) = (limits.min, max) {
                if min > max {
                    return Err(BindableError::InvalidArgument(format!("max value {max:?} is less than min value {min:?}")));
                }
            }
            limits.max = max;
            Ok(())
        })
    }

    /// Updates the group's limits and re-applies them to the current value when it no longer conforms
    fn update_limits(&self, update: impl FnOnce(&mut Limits<T>) -> Result<()>) -> Result<()> {
        let _guard = propagation_guard();
        self.with_limits(|limits| update(&mut limits.write()))?;
        let current = self.value();
        if self.limits().apply(current) != current {
            self.bindable.set_value(current)?;
        }
        Ok(())
    }

    /// Binds to another number, adopting its value, default, disabled state and limits
    pub fn bind_to(&self, other: &BindableNumber<T>) -> Result<()> { self.bindable.bind_to(&other.bindable) }

    /// A new number bound to this one, sharing its limits
    pub fn get_bound_copy(&self) -> BindableNumber<T> { Self { bindable: self.bindable.get_bound_copy() } }

    /// A new unbound number with a copy of this one's state and limits
    pub fn get_unbound_copy(&self) -> BindableNumber<T> { Self { bindable: self.bindable.get_unbound_copy() } }

    pub fn as_bindable(&self) -> &Bindable<T> { &self.bindable }

    pub fn into_bindable(self) -> Bindable<T> { self.bindable }
}

impl<T: Float> BindableNumber<T> {
    /// Sets the precision values are rounded to. `None` disables rounding.
    pub fn set_precision(&self, precision: impl Into<Option<T>>) -> Result<()> {
        let precision = precision.into();
        if let Some(precision) = precision {
            if !precision.is_valid_precision() {
                return Err(BindableError::InvalidArgument(format!("precision must be greater than 0, got {precision:?}")));
            }
        }
        self.update_limits(|limits| {
            limits.precision = precision;
            Ok(())
        })
    }
}

impl<T: std::fmt::Display> std::fmt::Display for BindableNumber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { std::fmt::Display::fmt(&self.bindable, f) }
}

impl<T: Number> std::fmt::Debug for BindableNumber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let limits = self.limits();
        f.debug_struct("BindableNumber")
            .field("value", &self.value())
            .field("min", &limits.min)
            .field("max", &limits.max)
            .field("precision", &limits.precision)
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_range() -> BindableDouble {
        let number = BindableDouble::new(0.5);
        number.set_min_value(0.0).unwrap();
        number.set_max_value(1.0).unwrap();
        number.set_precision(0.1).unwrap();
        number
    }

    #[test]
    fn test_round_then_clamp() {
        let number = unit_range();

        number.set_value(1.27).unwrap();
        assert_eq!(number.value(), 1.0);

        number.set_value(-5.0).unwrap();
        assert_eq!(number.value(), 0.0);
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let number = unit_range();
        number.set_value(0.44).unwrap();
        let first = number.value();
        number.set_value(0.44).unwrap();
        assert_eq!(number.value(), first);
        assert!((first - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_precision() {
        let number = BindableDouble::new(0.0);
        assert!(matches!(number.set_precision(0.0), Err(BindableError::InvalidArgument(_))));
        assert!(matches!(number.set_precision(-1.0), Err(BindableError::InvalidArgument(_))));
        assert!(matches!(number.set_precision(f64::NAN), Err(BindableError::InvalidArgument(_))));
        assert_eq!(number.precision(), None);
    }

    #[test]
    fn test_precision_reapplied_to_current_value() {
        let number = BindableFloat::new(0.37);
        number.set_precision(0.25).unwrap();
        assert_eq!(number.value(), 0.25);
    }

    #[test]
    fn test_narrowing_range_clamps_and_notifies() {
        let number = BindableInt::new(50);
        let peer = number.get_bound_copy();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            peer.bind_value_changed(move |e| seen.lock().push((e.old, e.new)), false).unwrap();
        }

        number.set_max_value(10).unwrap();
        assert_eq!(number.value(), 10);
        assert_eq!(peer.value(), 10);
        assert_eq!(*seen.lock(), vec![(50, 10)]);

        // already inside the new range: no notification
        number.set_min_value(0).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_min_greater_than_max_rejected() {
        let number = BindableLong::new(5);
        number.set_max_value(10).unwrap();
        assert!(matches!(number.set_min_value(11), Err(BindableError::InvalidArgument(_))));
        assert_eq!(number.min_value(), None);
    }

    #[test]
    fn test_bind_copies_limits() {
        let config = BindableDouble::new(0.8);
        config.set_min_value(0.0).unwrap();
        config.set_max_value(1.0).unwrap();

        let local = BindableDouble::new(3.0);
        local.bind_to(&config).unwrap();

        assert_eq!(local.value(), 0.8);
        assert_eq!(local.max_value(), Some(1.0));
        local.set_value(4.0).unwrap();
        assert_eq!(config.value(), 1.0);
    }

    #[test]
    fn test_unbound_copy_keeps_limits_without_link() {
        let original = BindableInt::new(3);
        original.set_max_value(5).unwrap();
        let copy = original.get_unbound_copy();

        assert_eq!(copy.max_value(), Some(5));
        copy.set_value(9).unwrap();
        assert_eq!(copy.value(), 5);
        assert_eq!(original.value(), 3);
    }

    #[test]
    fn test_narrowing_reaches_bound_copies() {
        let a = BindableInt::new(5);
        a.set_max_value(10).unwrap();
        let b = a.get_bound_copy();

        a.set_max_value(3).unwrap();
        assert_eq!(b.max_value(), Some(3));
        b.set_value(8).unwrap();
        assert_eq!((a.value(), b.value()), (3, 3));
    }

    #[test]
    fn test_plain_copy_of_number_is_clamped() {
        let number = unit_range();
        let plain = number.as_bindable().get_bound_copy();
        plain.set_value(5.0).unwrap();
        assert_eq!(number.value(), 1.0);

        let bound = Bindable::new(0.0);
        bound.bind_to(number.as_bindable()).unwrap();
        bound.set_value(-2.0).unwrap();
        assert_eq!((number.value(), bound.value()), (0.0, 0.0));
    }

    #[test]
    fn test_add_saturates_integers() {
        let number = BindableInt::new(i32::MAX - 1);
        number.add(5).unwrap();
        assert_eq!(number.value(), i32::MAX);
    }

    #[test]
    fn test_disabled_number_rejects_values() {
        let number = BindableDouble::new(1.0);
        number.set_disabled(true).unwrap();
        assert!(number.set_value(2.0).unwrap_err().is_disabled());
        assert_eq!(number.value(), 1.0);
    }
}

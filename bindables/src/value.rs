use parking_lot::RwLock;

/// The mutable slot behind a bindable: current value, default value and the disabled flag.
///
/// A `ValueCell` performs no checks and sends no notifications; the bindable layered on
/// top decides when a write is allowed and who hears about it.
pub struct ValueCell<T>(RwLock<Slot<T>>);

struct Slot<T> {
    value: T,
    default: T,
    disabled: bool,
}

impl<T> ValueCell<T> {
    pub fn new(value: T, default: T) -> Self { Self(RwLock::new(Slot { value, default, disabled: false })) }

    /// Calls a closure with a borrow of the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.0.read().value) }

    /// Calls a closure with a borrow of the default value
    pub fn with_default<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.0.read().default) }

    /// Stores `value`, returning the previous one
    pub fn replace(&self, value: T) -> T { std::mem::replace(&mut self.0.write().value, value) }

    pub fn set(&self, value: T) { self.0.write().value = value; }

    pub fn set_default(&self, default: T) { self.0.write().default = default; }

    pub fn is_disabled(&self) -> bool { self.0.read().disabled }

    pub fn set_disabled(&self, disabled: bool) { self.0.write().disabled = disabled; }
}

impl<T: Clone> ValueCell<T> {
    pub fn value(&self) -> T { self.0.read().value.clone() }

    pub fn default_value(&self) -> T { self.0.read().default.clone() }

    /// Overwrite value, default and disabled flag in one step
    pub fn copy_from(&self, other: &ValueCell<T>) {
        let (value, default, disabled) = {
            let theirs = other.0.read();
            (theirs.value.clone(), theirs.default.clone(), theirs.disabled)
        };
        let mut ours = self.0.write();
        ours.value = value;
        ours.default = default;
        ours.disabled = disabled;
    }
}

impl<T: PartialEq> ValueCell<T> {
    pub fn is_default(&self) -> bool {
        let slot = self.0.read();
        slot.value == slot.default
    }

    pub fn holds(&self, value: &T) -> bool { self.0.read().value == *value }
}

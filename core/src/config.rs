use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tether_bindables::{Bindable, BindableError, BindableNumber, BindableValue, Float, Number, ValueChanged};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Keys of a [`ConfigManager`], usually a fieldless enum declared with [`config_lookup!`](crate::config_lookup)
pub trait ConfigLookup: Copy + Eq + Hash + std::fmt::Debug + Send + Sync + 'static {
    /// The name an entry is saved under
    fn name(&self) -> &'static str;
    fn from_name(name: &str) -> Option<Self>;
}

/// Declares a fieldless enum and implements [`ConfigLookup`] for it using the variant names.
///
/// ```
/// tether_core::config_lookup! {
///     pub enum AudioSetting { VolumeMusic, VolumeEffects, Muted }
/// }
///
/// use tether_core::ConfigLookup;
/// assert_eq!(AudioSetting::Muted.name(), "Muted");
/// assert_eq!(AudioSetting::from_name("VolumeMusic"), Some(AudioSetting::VolumeMusic));
/// ```
#[macro_export]
macro_rules! config_lookup {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name { $($variant),* }

        impl $crate::ConfigLookup for $name {
            fn name(&self) -> &'static str {
                match self { $(Self::$variant => stringify!($variant)),* }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

/// Values a [`ConfigManager`] can store and persist
pub trait ConfigValue: BindableValue + Serialize + DeserializeOwned {}
impl<T> ConfigValue for T where T: BindableValue + Serialize + DeserializeOwned {}

/// A stored bindable with its type erased
trait ConfigEntry: Send + Sync {
    /// The backing `Bindable<T>`
    fn bindable(&self) -> &dyn Any;

    /// The backing `BindableNumber<T>`, for numeric entries
    fn number(&self) -> Option<&dyn Any> { None }

    fn to_json(&self) -> serde_json::Result<Value>;

    fn load_json(&self, key: &str, value: Value) -> Result<(), ConfigError>;

    /// None when `value` is not of the entry's type
    fn set_any(&self, value: Box<dyn Any>) -> Option<Result<(), BindableError>>;

    /// The loaded text of an entry that was read before its type was known
    fn raw(&self) -> Option<String> { None }
}

impl<T: ConfigValue> ConfigEntry for Bindable<T> {
    fn bindable(&self) -> &dyn Any { self }

    fn to_json(&self) -> serde_json::Result<Value> { self.with(encode) }

    fn load_json(&self, key: &str, value: Value) -> Result<(), ConfigError> { Ok(self.set_value(decode(key, value)?)?) }

    fn set_any(&self, value: Box<dyn Any>) -> Option<Result<(), BindableError>> {
        value.downcast::<T>().ok().map(|value| self.set_value(*value))
    }
}

impl<T: ConfigValue + Number> ConfigEntry for BindableNumber<T> {
    fn bindable(&self) -> &dyn Any { self.as_bindable() }

    fn number(&self) -> Option<&dyn Any> { Some(self) }

    fn to_json(&self) -> serde_json::Result<Value> { self.with(encode) }

    fn load_json(&self, key: &str, value: Value) -> Result<(), ConfigError> { Ok(self.set_value(decode(key, value)?)?) }

    fn set_any(&self, value: Box<dyn Any>) -> Option<Result<(), BindableError>> {
        value.downcast::<T>().ok().map(|value| self.set_value(*value))
    }
}

/// An entry loaded for a key that has no default yet
struct RawEntry(Bindable<String>);

impl ConfigEntry for RawEntry {
    fn bindable(&self) -> &dyn Any { &self.0 }

    fn to_json(&self) -> serde_json::Result<Value> {
        let raw = self.0.value();
        Ok(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }

    fn load_json(&self, _key: &str, value: Value) -> Result<(), ConfigError> { Ok(self.0.set_value(raw_text(value))?) }

    fn set_any(&self, value: Box<dyn Any>) -> Option<Result<(), BindableError>> {
        value.downcast::<String>().ok().map(|value| self.0.set_value(*value))
    }

    fn raw(&self) -> Option<String> { Some(self.0.value()) }
}

fn raw_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// JSON has no representation for non-finite floats
const NON_FINITE: [(&str, f64); 3] = [("inf", f64::INFINITY), ("-inf", f64::NEG_INFINITY), ("NaN", f64::NAN)];

fn as_f64<T: Any>(value: &T) -> Option<f64> {
    let value = value as &dyn Any;
    value.downcast_ref::<f64>().copied().or_else(|| value.downcast_ref::<f32>().map(|value| f64::from(*value)))
}

/// Encodes a value for saving, writing non-finite floats as strings
fn encode<T: Serialize + Any>(value: &T) -> serde_json::Result<Value> {
    match as_f64(value) {
        Some(float) if float.is_nan() => Ok(Value::String("NaN".to_owned())),
        Some(float) if float.is_infinite() => Ok(Value::String(if float > 0.0 { "inf" } else { "-inf" }.to_owned())),
        _ => serde_json::to_value(value),
    }
}

fn decode_non_finite<T: Any>(text: &str) -> Option<T> {
    let (_, float) = NON_FINITE.into_iter().find(|(name, _)| *name == text)?;
    let boxed: Box<dyn Any> = if TypeId::of::<T>() == TypeId::of::<f32>() { Box::new(float as f32) } else { Box::new(float) };
    boxed.downcast::<T>().ok().map(|value| *value)
}

/// Decodes a loaded value, accepting unquoted text for string-like types
fn decode<T: DeserializeOwned + Any>(key: &str, value: Value) -> Result<T, ConfigError> {
    if let Value::String(text) = &value {
        if let Some(float) = decode_non_finite::<T>(text) {
            return Ok(float);
        }
    }
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(source) => match value {
            Value::String(_) => Err(ConfigError::Parse { key: key.to_owned(), source }),
            other => serde_json::from_value(Value::String(other.to_string())).map_err(|_| ConfigError::Parse { key: key.to_owned(), source }),
        },
    }
}

#[derive(Debug, Default)]
struct ChangeTracker {
    count: AtomicU64,
    dirty: AtomicBool,
}

impl ChangeTracker {
    fn mark(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Release);
    }
}

/// Typed configuration store backed by bindables.
///
/// Each key owns one original bindable. Consumers get bound copies of it (or bind their own
/// bindables to it), so a change made anywhere reaches the store and every other consumer.
/// Any change marks the manager dirty; persisting is up to the caller, via
/// [`ConfigManager::save_to_string`] and [`ConfigManager::load_str`].
pub struct ConfigManager<K: ConfigLookup> {
    store: RwLock<HashMap<K, Arc<dyn ConfigEntry>>>,
    default_overrides: HashMap<K, Value>,
    add_missing_entries: bool,
    changes: Arc<ChangeTracker>,
}

impl<K: ConfigLookup> Default for ConfigManager<K> {
    fn default() -> Self { Self::new() }
}

impl<K: ConfigLookup> ConfigManager<K> {
    pub fn new() -> Self {
        Self { store: RwLock::new(HashMap::new()), default_overrides: HashMap::new(), add_missing_entries: true, changes: Arc::default() }
    }

    /// Replaces whatever default is later declared for `key`
    pub fn with_default_override<T: Serialize>(mut self, key: K, value: T) -> Result<Self, ConfigError> {
        let value = serde_json::to_value(value).map_err(|source| ConfigError::Parse { key: key.name().to_owned(), source })?;
        self.default_overrides.insert(key, value);
        Ok(self)
    }

    /// Whether loading keeps entries for keys that have no default yet. On by default.
    pub fn add_missing_entries(mut self, add: bool) -> Self {
        self.add_missing_entries = add;
        self
    }

    fn entry(&self, key: K) -> Option<Arc<dyn ConfigEntry>> { self.store.read().get(&key).cloned() }

    fn insert(&self, key: K, entry: Arc<dyn ConfigEntry>) { self.store.write().insert(key, entry); }

    fn default_for<T: ConfigValue>(&self, key: K, fallback: T) -> Result<T, ConfigError> {
        match self.default_overrides.get(&key) {
            Some(value) => decode(key.name(), value.clone()),
            None => Ok(fallback),
        }
    }

    fn track<T: ConfigValue>(&self, bindable: &Bindable<T>) -> Result<(), ConfigError> {
        let changes = self.changes.clone();
        bindable.bind_value_changed(move |_: &ValueChanged<T>| changes.mark(), false)?;
        Ok(())
    }

    fn mismatch<T>(key: K) -> ConfigError { ConfigError::TypeMismatch { key: key.name(), expected: type_name::<T>() } }

    /// Pending text loaded for `key` before it had a default, decoded as `T`
    fn pending_value<T: ConfigValue>(key: K, pending: Option<Arc<dyn ConfigEntry>>) -> Option<T> {
        let raw = pending?.raw()?;
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        match decode(key.name(), value) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = key.name(), "discarding loaded value: {err}");
                None
            }
        }
    }

    /// Declares `key` with a default value, or updates the value and default of an existing entry
    pub fn set_default<T: ConfigValue>(&self, key: K, value: T) -> Result<Bindable<T>, ConfigError> {
        let value = self.default_for(key, value)?;
        match self.entry(key) {
            Some(entry) if entry.raw().is_none() => {
                let bindable = entry.bindable().downcast_ref::<Bindable<T>>().cloned().ok_or_else(|| Self::mismatch::<T>(key))?;
                bindable.set_value(value.clone())?;
                bindable.set_default_value(value)?;
                Ok(bindable)
            }
            pending => {
                let bindable = Bindable::new(value);
                if let Some(loaded) = Self::pending_value(key, pending) {
                    bindable.set_value(loaded)?;
                }
                self.track(&bindable)?;
                self.insert(key, Arc::new(bindable.clone()));
                debug!(key = key.name(), "declared config entry");
                Ok(bindable)
            }
        }
    }

    /// Declares a numeric entry with an optional range
    pub fn set_default_number<T>(&self, key: K, value: T, min: Option<T>, max: Option<T>) -> Result<BindableNumber<T>, ConfigError>
    where T: ConfigValue + Number {
        let value = self.default_for(key, value)?;
        match self.entry(key) {
            Some(entry) if entry.raw().is_none() => {
                let number = entry
                    .number()
                    .and_then(|number| number.downcast_ref::<BindableNumber<T>>())
                    .cloned()
                    .ok_or_else(|| Self::mismatch::<BindableNumber<T>>(key))?;
                number.set_value(value)?;
                number.set_default_value(value)?;
                set_limits(&number, min, max)?;
                Ok(number)
            }
            pending => {
                let number = BindableNumber::new(value);
                set_limits(&number, min, max)?;
                if let Some(loaded) = Self::pending_value(key, pending) {
                    number.set_value(loaded)?;
                }
                self.track(number.as_bindable())?;
                self.insert(key, Arc::new(number.clone()));
                debug!(key = key.name(), "declared numeric config entry");
                Ok(number)
            }
        }
    }

    /// Declares a floating point entry with an optional range and precision
    pub fn set_default_float<T>(&self, key: K, value: T, min: Option<T>, max: Option<T>, precision: Option<T>) -> Result<BindableNumber<T>, ConfigError>
    where T: ConfigValue + Float {
        let number = self.set_default_number(key, value, min, max)?;
        if precision.is_some() {
            number.set_precision(precision)?;
        }
        Ok(number)
    }

    /// Sets the value of `key`, declaring it with `value` as its default if it does not exist yet
    pub fn set_value<T: ConfigValue>(&self, key: K, value: T) -> Result<(), ConfigError> {
        match self.entry(key) {
            Some(entry) if entry.raw().is_none() || TypeId::of::<T>() == TypeId::of::<String>() => {
                entry.set_any(Box::new(value)).ok_or_else(|| Self::mismatch::<T>(key))??;
            }
            _ => self.set_default(key, value.clone())?.set_value(value)?,
        }
        Ok(())
    }

    pub fn get<T: ConfigValue>(&self, key: K) -> Result<T, ConfigError> { Ok(self.original(key)?.value()) }

    /// A new bindable bound to the stored one. Hold on to it: the store only references it weakly.
    pub fn get_bindable<T: ConfigValue>(&self, key: K) -> Result<Bindable<T>, ConfigError> { Ok(self.original(key)?.get_bound_copy()) }

    /// Like [`ConfigManager::get_bindable`], keeping the entry's range and precision
    pub fn get_number<T: ConfigValue + Number>(&self, key: K) -> Result<BindableNumber<T>, ConfigError> {
        let entry = self.entry(key).ok_or_else(|| ConfigError::UnknownKey(key.name().to_owned()))?;
        let number = entry.number().and_then(|number| number.downcast_ref::<BindableNumber<T>>()).ok_or_else(|| Self::mismatch::<BindableNumber<T>>(key))?;
        Ok(number.get_bound_copy())
    }

    /// Binds `bindable` to the stored entry, adopting its state
    pub fn bind_with<T: ConfigValue>(&self, key: K, bindable: &Bindable<T>) -> Result<(), ConfigError> {
        bindable.bind_to(&self.original(key)?)?;
        Ok(())
    }

    fn original<T: ConfigValue>(&self, key: K) -> Result<Bindable<T>, ConfigError> {
        let entry = self.entry(key).ok_or_else(|| ConfigError::UnknownKey(key.name().to_owned()))?;
        entry.bindable().downcast_ref::<Bindable<T>>().cloned().ok_or_else(|| Self::mismatch::<T>(key))
    }

    pub fn contains(&self, key: K) -> bool { self.store.read().contains_key(&key) }

    /// Declared and loaded keys, ordered by name
    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.store.read().keys().copied().collect();
        keys.sort_by_key(|key| key.name());
        keys
    }

    /// Total number of value changes seen across all entries
    pub fn change_count(&self) -> u64 { self.changes.count.load(Ordering::Relaxed) }

    pub fn is_dirty(&self) -> bool { self.changes.dirty.load(Ordering::Acquire) }

    /// Clears the dirty flag, returning whether anything changed since it was last cleared
    pub fn take_dirty(&self) -> bool { self.changes.dirty.swap(false, Ordering::AcqRel) }

    /// One `Key = <json>` line per entry, ordered by key name. Clears the dirty flag.
    pub fn save_to_string(&self) -> Result<String, ConfigError> {
        let mut entries: Vec<(K, Arc<dyn ConfigEntry>)> = self.store.read().iter().map(|(key, entry)| (*key, entry.clone())).collect();
        entries.sort_by_key(|(key, _)| key.name());

        let mut out = String::new();
        for (key, entry) in entries {
            let value = entry.to_json().map_err(|source| ConfigError::Parse { key: key.name().to_owned(), source })?;
            out.push_str(&format!("{} = {}\n", key.name(), value));
        }
        self.changes.dirty.store(false, Ordering::Release);
        Ok(out)
    }

    /// Loads `Key = value` lines, returning how many entries were applied.
    ///
    /// Blank lines and `#` comments are skipped. Lines that cannot be applied are logged and
    /// skipped. Values are read as JSON, falling back to the raw text.
    pub fn load_str(&self, text: &str) -> usize {
        let mut applied = 0;
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, raw)) = line.split_once('=') else {
                warn!(line, "skipping malformed config line");
                continue;
            };
            match self.load_value(name.trim(), raw.trim()) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(err) => warn!(key = name.trim(), "unable to load config entry: {err}"),
            }
        }
        self.changes.dirty.store(false, Ordering::Release);
        debug!(applied, "loaded config");
        applied
    }

    /// Loads a single entry from its saved text. Returns false if the key was skipped.
    pub fn load_value(&self, name: &str, raw: &str) -> Result<bool, ConfigError> {
        let key = K::from_name(name).ok_or_else(|| ConfigError::UnknownKey(name.to_owned()))?;
        let value: Value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        match self.entry(key) {
            Some(entry) => {
                entry.load_json(key.name(), value)?;
                Ok(true)
            }
            None if self.add_missing_entries => {
                let bindable = Bindable::new(raw_text(value));
                self.track(&bindable)?;
                self.insert(key, Arc::new(RawEntry(bindable)));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn set_limits<T: Number>(number: &BindableNumber<T>, min: Option<T>, max: Option<T>) -> Result<(), BindableError> {
    if let Some(min) = min {
        number.set_min_value(min)?;
    }
    if let Some(max) = max {
        number.set_max_value(max)?;
    }
    Ok(())
}

impl<K: ConfigLookup> std::fmt::Debug for ConfigManager<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager").field("keys", &self.keys()).field("dirty", &self.is_dirty()).finish()
    }
}

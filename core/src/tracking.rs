use std::sync::Arc;

use tether_bindables::{Bindable, Broadcast, IntoListener, ListenerId, ValueChanged};
use tracing::{debug, warn};

use crate::config::{ConfigLookup, ConfigManager, ConfigValue};
use crate::error::ConfigError;

/// A human readable summary of a setting, for on-screen display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingDescription {
    pub name: String,
    pub value: String,
    pub shortcut: Option<String>,
}

impl SettingDescription {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self { Self { name: name.into(), value: value.into(), shortcut: None } }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }
}

impl std::fmt::Display for SettingDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.shortcut {
            Some(shortcut) => write!(f, "{}: {} ({})", self.name, self.value, shortcut),
            None => write!(f, "{}: {}", self.name, self.value),
        }
    }
}

type Describe<T> = Arc<dyn Fn(&T) -> SettingDescription + Send + Sync>;

/// One tracked key with its value type erased
trait TrackedSetting<K: ConfigLookup>: Send + Sync {
    fn key(&self) -> K;

    fn load(&mut self, config: &ConfigManager<K>, changed: &Arc<Broadcast<SettingDescription>>) -> Result<(), ConfigError>;

    fn unload(&mut self);

    fn description(&self) -> Option<SettingDescription>;
}

struct Tracked<K, T> {
    key: K,
    describe: Describe<T>,
    bindable: Option<Bindable<T>>,
}

impl<K: ConfigLookup, T: ConfigValue> TrackedSetting<K> for Tracked<K, T> {
    fn key(&self) -> K { self.key }

    fn load(&mut self, config: &ConfigManager<K>, changed: &Arc<Broadcast<SettingDescription>>) -> Result<(), ConfigError> {
        self.unload();
        let bindable = config.get_bindable::<T>(self.key)?;
        let describe = self.describe.clone();
        let changed = changed.clone();
        bindable.bind_value_changed(
            move |e: &ValueChanged<T>| {
                if let Err(err) = changed.send(&describe(&e.new)) {
                    warn!("setting changed listener failed: {err}");
                }
            },
            false,
        )?;
        self.bindable = Some(bindable);
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(bindable) = self.bindable.take() {
            bindable.unbind_all();
        }
    }

    fn description(&self) -> Option<SettingDescription> { self.bindable.as_ref().map(|bindable| bindable.with(|value| (self.describe)(value))) }
}

/// Config values whose changes are announced as [`SettingDescription`]s.
///
/// Settings are registered with [`TrackedSettings::add`], then attached to a config with
/// [`TrackedSettings::load_from`]. From then on every change to a tracked value, made through
/// any bindable bound to the entry, is sent to the listeners added with
/// [`TrackedSettings::on_setting_changed`].
pub struct TrackedSettings<K: ConfigLookup> {
    settings: Vec<Box<dyn TrackedSetting<K>>>,
    changed: Arc<Broadcast<SettingDescription>>,
}

impl<K: ConfigLookup> Default for TrackedSettings<K> {
    fn default() -> Self { Self::new() }
}

impl<K: ConfigLookup> TrackedSettings<K> {
    pub fn new() -> Self { Self { settings: Vec::new(), changed: Arc::new(Broadcast::new()) } }

    /// Tracks `key`, describing its values with `describe`
    pub fn add<T, F>(&mut self, key: K, describe: F)
    where
        T: ConfigValue,
        F: Fn(&T) -> SettingDescription + Send + Sync + 'static,
    {
        self.settings.push(Box::new(Tracked { key, describe: Arc::new(describe), bindable: None }));
    }

    /// Attaches every tracked setting to its entry in `config`, replacing earlier attachments
    pub fn load_from(&mut self, config: &ConfigManager<K>) -> Result<(), ConfigError> {
        for setting in &mut self.settings {
            setting.load(config, &self.changed)?;
        }
        debug!(settings = self.settings.len(), "loaded tracked settings");
        Ok(())
    }

    /// Detaches every tracked setting
    pub fn unload(&mut self) {
        for setting in &mut self.settings {
            setting.unload();
        }
    }

    pub fn on_setting_changed<L>(&self, listener: L) -> ListenerId
    where L: IntoListener<SettingDescription> {
        self.changed.listen(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool { self.changed.remove(id) }

    /// Current descriptions of the loaded settings, in registration order
    pub fn descriptions(&self) -> Vec<SettingDescription> { self.settings.iter().filter_map(|setting| setting.description()).collect() }

    pub fn keys(&self) -> Vec<K> { self.settings.iter().map(|setting| setting.key()).collect() }

    pub fn len(&self) -> usize { self.settings.len() }

    pub fn is_empty(&self) -> bool { self.settings.is_empty() }
}

impl<K: ConfigLookup> std::fmt::Debug for TrackedSettings<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedSettings").field("keys", &self.keys()).field("listeners", &self.changed.len()).finish()
    }
}

/// A config that can hand out and fill [`TrackedSettings`]
pub trait TrackableConfig {
    type Key: ConfigLookup;

    /// The settings this config tracks
    fn create_tracked_settings(&self) -> TrackedSettings<Self::Key>;

    fn load_into(&self, settings: &mut TrackedSettings<Self::Key>) -> Result<(), ConfigError>;
}

impl<K: ConfigLookup> TrackableConfig for ConfigManager<K> {
    type Key = K;

    fn create_tracked_settings(&self) -> TrackedSettings<K> { TrackedSettings::new() }

    fn load_into(&self, settings: &mut TrackedSettings<K>) -> Result<(), ConfigError> { settings.load_from(self) }
}

/*!
Application plumbing built on tether bindables.

- [`DependencyContainer`] - hierarchical, type-keyed store used to hand shared bindables and
  services to components
- [`ConfigManager`] - typed settings backed by bindables, with a line based text snapshot
- [`TrackedSettings`] - descriptions of tracked config values, announced on every change
- [`AudioAdjustments`] - per-component volume, balance, frequency and tempo, aggregated across
  a hierarchy of components

```rust
use tether_core::*;

tether_core::config_lookup! {
    pub enum Setting { VolumeUniversal, Muted }
}

let config = ConfigManager::new();
config.set_default_float(Setting::VolumeUniversal, 1.0, Some(0.0), Some(1.0), Some(0.01)).unwrap();

let dependencies = DependencyContainer::new();
dependencies.cache(std::sync::Arc::new(config)).unwrap();

let config = dependencies.resolve::<std::sync::Arc<ConfigManager<Setting>>>(None).unwrap();
let adjustments = AudioAdjustments::new();
adjustments.add_adjustment(AdjustableProperty::Volume, &config.get_number::<f64>(Setting::VolumeUniversal).unwrap()).unwrap();
```
*/

mod audio;
mod config;
mod dependencies;
mod error;
mod tracking;

pub use audio::*;
pub use config::*;
pub use dependencies::*;
pub use error::*;
pub use tracking::*;

pub use tether_bindables as bindables;

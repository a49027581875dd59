/*!
Reactive value bindings.

Re-exports [`tether_bindables`] (observable, bidirectionally bound value cells and aggregates)
and [`tether_core`] (dependency container, configuration manager, audio adjustments).

```rust
use tether::*;

let settings = ConfigManager::new();
tether::config_lookup! {
    pub enum Setting { Volume }
}
settings.set_default_float(Setting::Volume, 0.8, Some(0.0), Some(1.0), None).unwrap();

let slider = settings.get_number::<f64>(Setting::Volume).unwrap();
slider.set_value(0.5).unwrap();
assert_eq!(settings.get::<f64>(Setting::Volume).unwrap(), 0.5);
```
*/

pub use tether_bindables::*;
pub use tether_core::*;
pub use tether_core::config_lookup;

/*!
Observable value cells that can be bound bidirectionally into groups.

# Design requirements:
- A bindable owns a value, a default, and a disabled flag, and notifies listeners when they change
- Bindables of the same type can be bound into a group; a change to any member reaches every live member
- Bindings never keep a cell alive. Peers are held weakly and dead ones are pruned on traversal
- Propagation terminates on cyclic bindings and notifies each member at most once per change
- Aggregates fold an ordered list of sources into a read-only result that stays up to date
- Mutations are serialized by one reentrant lock, so listeners may mutate bindables while being notified

# Nomenclature:
- `bind_to` - link two cells; the argument is the more permanent end and its state wins
- `bind_value_changed` - listen for changes, optionally running the listener once right away
- `subscribe` - listen for changes for as long as the returned guard is alive

# Basic usage

```rust
use tether_bindables::*;

let config = Bindable::new(0.5);
let slider = Bindable::new(0.0);
slider.bind_to(&config).unwrap();
assert_eq!(slider.value(), 0.5);

config.bind_value_changed(|e: &ValueChanged<f64>| println!("volume {} -> {}", e.old, e.new), false).unwrap();
slider.set_value(0.8).unwrap();
assert_eq!(config.value(), 0.8);
```

# Numbers

```rust
use tether_bindables::*;

let volume = BindableDouble::new(0.5);
volume.set_min_value(0.0).unwrap();
volume.set_max_value(1.0).unwrap();
volume.set_precision(0.1).unwrap();

volume.set_value(1.27).unwrap();
assert_eq!(volume.value(), 1.0);
```
*/

mod aggregate;
mod bindable;
mod broadcast;
mod error;
mod number;
mod peers;
mod read;
mod subscription;
mod value;

#[cfg(feature = "tokio")]
mod wait;

pub use aggregate::*;
pub use bindable::{Bindable, BindableValue, ValueChanged};
pub use broadcast::*;
pub use error::*;
pub use number::*;
pub use peers::*;
pub use read::*;
pub use subscription::*;

#[cfg(feature = "tokio")]
pub use wait::*;

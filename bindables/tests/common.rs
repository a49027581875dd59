use std::sync::{Arc, Mutex};

use tether_bindables::ValueChanged;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init(); }

/// A listener that records `(old, new)` pairs, and a check that drains them
#[allow(unused)]
pub fn change_watcher<T: Clone + Send + Sync + 'static>()
-> (impl Fn(&ValueChanged<T>) + Send + Sync + 'static, impl Fn() -> Vec<(T, T)> + Send + Sync + 'static) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        move |e: &ValueChanged<T>| changes.lock().unwrap().push((e.old.clone(), e.new.clone()))
    };
    let check = move || changes.lock().unwrap().drain(..).collect();
    (watcher, check)
}

/// A listener that records new values, and a check that drains them
#[allow(unused)]
pub fn value_watcher<T: Clone + Send + Sync + 'static>()
-> (impl Fn(&ValueChanged<T>) + Send + Sync + 'static, impl Fn() -> Vec<T> + Send + Sync + 'static) {
    let values = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let values = values.clone();
        move |e: &ValueChanged<T>| values.lock().unwrap().push(e.new.clone())
    };
    let check = move || values.lock().unwrap().drain(..).collect();
    (watcher, check)
}

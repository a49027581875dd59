use std::sync::{Arc, Mutex};

use tether::ValueChanged;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().try_init(); }

tether::config_lookup! {
    pub enum GameSetting { VolumeUniversal, VolumeMusic, Muted, Skin, WindowMode }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum WindowMode {
    Windowed,
    Borderless,
    Fullscreen,
}

#[allow(unused)]
pub fn game_config() -> tether::ConfigManager<GameSetting> {
    let config = tether::ConfigManager::new();
    config.set_default_float(GameSetting::VolumeUniversal, 1.0, Some(0.0), Some(1.0), None).unwrap();
    config.set_default_float(GameSetting::VolumeMusic, 0.8, Some(0.0), Some(1.0), None).unwrap();
    config.set_default(GameSetting::Muted, false).unwrap();
    config.set_default(GameSetting::Skin, "default".to_string()).unwrap();
    config.set_default(GameSetting::WindowMode, WindowMode::Windowed).unwrap();
    config
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

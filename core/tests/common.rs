use tether_core::ConfigManager;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init(); }

tether_core::config_lookup! {
    pub enum DisplaySetting { Scale, Brightness, Vsync, Renderer }
}

#[allow(unused)]
pub fn display_config() -> ConfigManager<DisplaySetting> {
    let config = ConfigManager::new();
    config.set_default_float(DisplaySetting::Scale, 1.0, Some(0.5), Some(2.0), Some(0.05)).unwrap();
    config.set_default_number(DisplaySetting::Brightness, 50, Some(0), Some(100)).unwrap();
    config.set_default(DisplaySetting::Vsync, true).unwrap();
    config.set_default(DisplaySetting::Renderer, "auto".to_string()).unwrap();
    config
}

use tether_bindables::BindableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("no dependency of type {type_name} (name: {name:?}) is cached")]
    NotFound { type_name: &'static str, name: Option<String> },
    #[error("a dependency of type {type_name} (name: {name:?}) is already cached")]
    AlreadyCached { type_name: &'static str, name: Option<String> },
    #[error("{component} failed to set up its dependencies: {source}")]
    Component { component: &'static str, source: Box<dyn std::error::Error + Send + Sync> },
}

impl DependencyError {
    /// Wraps a failure of component `C` while it was being injected
    pub fn component<C: ?Sized>(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Component { component: std::any::type_name::<C>(), source: source.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Bindable(#[from] BindableError),
    #[error("config entry {key} does not hold a {expected}")]
    TypeMismatch { key: &'static str, expected: &'static str },
    #[error("unable to parse config entry {key}: {source}")]
    Parse { key: String, source: serde_json::Error },
    #[error("unknown config entry {0}")]
    UnknownKey(String),
}

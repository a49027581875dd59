use thiserror::Error;

/// Errors raised by bindable mutation, binding, and configuration.
#[derive(Error, Debug)]
pub enum BindableError {
    /// A value or default was written to a disabled bindable
    #[error("cannot set value to {attempted} as bindable is disabled")]
    Disabled { attempted: String },

    /// `bind_to` was called with a bindable that is already a peer
    #[error("an already bound bindable cannot be bound again")]
    AlreadyBound,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A value or disabled listener reported a failure while being notified
    #[error("listener failed: {0}")]
    Listener(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl BindableError {
    pub(crate) fn disabled<T: std::fmt::Debug>(attempted: &T) -> Self { BindableError::Disabled { attempted: format!("{attempted:?}") } }

    /// Wrap an arbitrary error raised from inside a listener
    pub fn listener<E>(err: E) -> Self
    where E: Into<Box<dyn std::error::Error + Send + Sync + 'static>> {
        BindableError::Listener(err.into())
    }

    pub fn is_disabled(&self) -> bool { matches!(self, BindableError::Disabled { .. }) }
}

pub type Result<T, E = BindableError> = std::result::Result<T, E>;

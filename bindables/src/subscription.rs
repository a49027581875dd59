/// Keeps a listener registered for as long as the guard is alive.
///
/// Listeners added with `bind_value_changed` stay until removed or `unbind_events` is called.
/// Listeners added with `subscribe` are removed when their guard is dropped.
#[must_use = "the listener is removed as soon as the guard is dropped"]
pub struct SubscriptionGuard {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SubscriptionGuard {
    pub(crate) fn new<F>(detach: F) -> Self
    where F: FnOnce() + Send + Sync + 'static {
        Self { detach: Some(Box::new(detach)) }
    }

    /// Keep the listener registered for the lifetime of the bindable
    pub fn forget(mut self) { self.detach = None; }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard").field("active", &self.detach.is_some()).finish()
    }
}

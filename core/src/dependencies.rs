use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::debug;

use crate::error::DependencyError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    type_id: TypeId,
    name: Option<String>,
}

struct Cached {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

struct Inner {
    entries: DashMap<CacheKey, Cached>,
    parent: Option<DependencyContainer>,
}

/// A hierarchical store of shared dependencies keyed by type and an optional name.
///
/// Lookups that miss fall through to the parent container, so a child sees everything its
/// ancestors cache and may shadow any of it. Values are cloned out on retrieval: cache
/// handles (`Arc`s, bindables, managers) rather than large values.
#[derive(Clone)]
pub struct DependencyContainer(Arc<Inner>);

impl Default for DependencyContainer {
    fn default() -> Self { Self::new() }
}

impl DependencyContainer {
    pub fn new() -> Self { Self(Arc::new(Inner { entries: DashMap::new(), parent: None })) }

    /// A new container whose lookups fall back to this one
    pub fn child(&self) -> Self { Self(Arc::new(Inner { entries: DashMap::new(), parent: Some(self.clone()) })) }

    pub fn parent(&self) -> Option<&DependencyContainer> { self.0.parent.as_ref() }

    /// Caches `value` under its own type
    pub fn cache<T>(&self, value: T) -> Result<(), DependencyError>
    where T: Clone + Send + Sync + 'static {
        self.insert(None, value)
    }

    /// Caches `value` under its type and `name`, so several values of one type can coexist
    pub fn cache_named<T>(&self, name: impl Into<String>, value: T) -> Result<(), DependencyError>
    where T: Clone + Send + Sync + 'static {
        self.insert(Some(name.into()), value)
    }

    fn insert<T>(&self, name: Option<String>, value: T) -> Result<(), DependencyError>
    where T: Clone + Send + Sync + 'static {
        let key = CacheKey { type_id: TypeId::of::<T>(), name };
        match self.0.entries.entry(key) {
            Entry::Occupied(entry) => Err(DependencyError::AlreadyCached { type_name: type_name::<T>(), name: entry.key().name.clone() }),
            Entry::Vacant(entry) => {
                debug!(type_name = type_name::<T>(), name = ?entry.key().name, "cached dependency");
                entry.insert(Cached { type_name: type_name::<T>(), value: Box::new(value) });
                Ok(())
            }
        }
    }

    /// Looks up a dependency here, then in each ancestor
    pub fn get<T>(&self, name: Option<&str>) -> Option<T>
    where T: Clone + Send + Sync + 'static {
        let key = CacheKey { type_id: TypeId::of::<T>(), name: name.map(str::to_owned) };
        let mut container = Some(self);
        while let Some(current) = container {
            if let Some(cached) = current.0.entries.get(&key) {
                return cached.value.downcast_ref::<T>().cloned();
            }
            container = current.0.parent.as_ref();
        }
        None
    }

    /// Like [`DependencyContainer::get`], failing when nothing is cached
    pub fn resolve<T>(&self, name: Option<&str>) -> Result<T, DependencyError>
    where T: Clone + Send + Sync + 'static {
        self.get::<T>(name).ok_or_else(|| DependencyError::NotFound { type_name: type_name::<T>(), name: name.map(str::to_owned) })
    }

    pub fn contains<T>(&self, name: Option<&str>) -> bool
    where T: Clone + Send + Sync + 'static {
        self.get::<T>(name).is_some()
    }

    /// Number of dependencies cached directly in this container
    pub fn len(&self) -> usize { self.0.entries.len() }

    pub fn is_empty(&self) -> bool { self.0.entries.is_empty() }

    /// Hands `target` a resolver over this container
    pub fn inject<I: Injectable + ?Sized>(&self, target: &mut I) -> Result<(), DependencyError> {
        let resolver = Resolver { container: self };
        target.inject(&resolver)?;
        debug!(target = type_name::<I>(), "injected dependencies");
        Ok(())
    }
}

impl std::fmt::Debug for DependencyContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut cached: Vec<&'static str> = self.0.entries.iter().map(|entry| entry.value().type_name).collect();
        cached.sort_unstable();
        f.debug_struct("DependencyContainer").field("cached", &cached).field("has_parent", &self.0.parent.is_some()).finish()
    }
}

/// A component that receives its dependencies from a [`DependencyContainer`]
pub trait Injectable {
    fn inject(&mut self, resolver: &Resolver<'_>) -> Result<(), DependencyError>;
}

/// The view of a container handed to [`Injectable::inject`]
pub struct Resolver<'a> {
    container: &'a DependencyContainer,
}

impl Resolver<'_> {
    /// A dependency the component cannot work without
    pub fn required<T>(&self, name: Option<&str>) -> Result<T, DependencyError>
    where T: Clone + Send + Sync + 'static {
        self.container.resolve(name)
    }

    /// A dependency the component can do without
    pub fn optional<T>(&self, name: Option<&str>) -> Option<T>
    where T: Clone + Send + Sync + 'static {
        self.container.get(name)
    }

    pub fn container(&self) -> &DependencyContainer { self.container }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_bindables::{Bindable, BindableDouble};

    #[derive(Debug, Clone, PartialEq)]
    struct Clock(u32);

    #[test]
    fn test_cache_and_get() {
        let container = DependencyContainer::new();
        container.cache(Clock(1)).unwrap();
        assert_eq!(container.get::<Clock>(None), Some(Clock(1)));
        assert_eq!(container.get::<String>(None), None);
    }

    #[test]
    fn test_duplicate_rejected() {
        let container = DependencyContainer::new();
        container.cache(Clock(1)).unwrap();
        assert!(matches!(container.cache(Clock(2)), Err(DependencyError::AlreadyCached { .. })));
        assert_eq!(container.get::<Clock>(None), Some(Clock(1)));
    }

    #[test]
    fn test_named_entries_are_distinct() {
        let container = DependencyContainer::new();
        container.cache_named("music", BindableDouble::new(0.5)).unwrap();
        container.cache_named("effects", BindableDouble::new(0.8)).unwrap();

        assert_eq!(container.resolve::<BindableDouble>(Some("music")).unwrap().value(), 0.5);
        assert_eq!(container.resolve::<BindableDouble>(Some("effects")).unwrap().value(), 0.8);
        assert!(container.get::<BindableDouble>(None).is_none());
    }

    #[test]
    fn test_child_sees_and_shadows_parent() {
        let parent = DependencyContainer::new();
        parent.cache(Clock(1)).unwrap();
        parent.cache("parent".to_string()).unwrap();

        let child = parent.child();
        child.cache(Clock(2)).unwrap();

        assert_eq!(child.get::<Clock>(None), Some(Clock(2)));
        assert_eq!(child.get::<String>(None).as_deref(), Some("parent"));
        assert_eq!(parent.get::<Clock>(None), Some(Clock(1)));
        assert_eq!(child.len(), 1);
    }

    #[test]
    fn test_resolve_missing() {
        let container = DependencyContainer::new();
        let err = container.resolve::<Clock>(Some("wall")).unwrap_err();
        assert!(matches!(err, DependencyError::NotFound { name: Some(ref name), .. } if name == "wall"));
    }

    #[test]
    fn test_cached_bindable_is_shared() {
        let container = DependencyContainer::new();
        let muted = Bindable::new(false);
        container.cache(muted.clone()).unwrap();

        container.resolve::<Bindable<bool>>(None).unwrap().set_value(true).unwrap();
        assert!(muted.value());
    }

    #[derive(Default)]
    struct Player {
        clock: Option<Clock>,
        label: Option<String>,
    }

    impl Injectable for Player {
        fn inject(&mut self, resolver: &Resolver<'_>) -> Result<(), DependencyError> {
            self.clock = Some(resolver.required(None)?);
            self.label = resolver.optional(Some("label"));
            Ok(())
        }
    }

    #[test]
    fn test_inject_required_and_optional() {
        let container = DependencyContainer::new();
        let mut player = Player::default();
        assert!(matches!(container.inject(&mut player), Err(DependencyError::NotFound { .. })));

        container.cache(Clock(3)).unwrap();
        container.inject(&mut player).unwrap();
        assert_eq!(player.clock, Some(Clock(3)));
        assert_eq!(player.label, None);
    }
}

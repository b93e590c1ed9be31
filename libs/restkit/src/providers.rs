//! Provider identity and factory resolution.
//!
//! A provider (filter, exception mapper, writer, feature) is identified by a
//! fully-qualified name. At assembly time each provider name resolves to one
//! of two factory variants:
//!
//! - singleton: the instance already exists in the [`SingletonRegistry`] and
//!   every `instance()` call returns the same `Arc`;
//! - container-managed: the [`BeanContainer`] owns a constructor and builds
//!   an instance on demand.
//!
//! Selection is a pure function of membership in the [`SingletonSet`]; it
//! never fails. Only `instance()` can fail, when the backing registry or
//! container has no entry under the name (or holds a different type).
//!
//! Storage is type-erased: values are kept as `Box<dyn Any>` wrapping an
//! `Arc<T>`, so `T` may be unsized (e.g. `dyn ExceptionMapper`).

use parking_lot::RwLock;
use std::{any::Any, collections::HashMap, collections::HashSet, fmt, marker::PhantomData, sync::Arc};

/// Fully-qualified provider identity. Lookup is exact string equality;
/// no normalization is applied.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct ProviderName(Arc<str>);

impl ProviderName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProviderName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Names known to be process-wide singletons.
pub type SingletonSet = HashSet<ProviderName>;

#[derive(Debug, thiserror::Error)]
pub enum BeanError {
    #[error("no bean registered under '{name}'")]
    NotRegistered { name: ProviderName },

    #[error("bean '{name}' is not of the requested type")]
    TypeMismatch { name: ProviderName },
}

type Boxed = Box<dyn Any + Send + Sync>;

/// Pre-existing singleton instances keyed by provider name.
#[derive(Default)]
pub struct SingletonRegistry {
    map: RwLock<HashMap<ProviderName, Boxed>>,
}

impl SingletonRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a singleton instance under `name`. Re-registering replaces
    /// the previous value; `Arc`s already handed out remain valid.
    pub fn register<T>(&self, name: &ProviderName, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.map.write().insert(name.clone(), Box::new(instance));
    }

    /// Fetch the singleton registered under `name`.
    ///
    /// # Errors
    /// `BeanError::NotRegistered` when the name is unknown,
    /// `BeanError::TypeMismatch` when the stored instance is not an `Arc<T>`.
    pub fn get<T>(&self, name: &ProviderName) -> Result<Arc<T>, BeanError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let map = self.map.read();
        let boxed = map.get(name).ok_or_else(|| BeanError::NotRegistered {
            name: name.clone(),
        })?;
        boxed
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| BeanError::TypeMismatch { name: name.clone() })
    }

    #[must_use]
    pub fn contains(&self, name: &ProviderName) -> bool {
        self.map.read().contains_key(name)
    }
}

/// Container-managed instantiation: each name maps to a constructor that is
/// invoked on every `create` call.
#[derive(Default)]
pub struct BeanContainer {
    map: RwLock<HashMap<ProviderName, Boxed>>,
}

impl BeanContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `name`.
    pub fn register<T, F>(&self, name: &ProviderName, ctor: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        let ctor: Arc<dyn Fn() -> Arc<T> + Send + Sync> = Arc::new(ctor);
        self.map.write().insert(name.clone(), Box::new(ctor));
    }

    /// Create an instance of the bean registered under `name`.
    ///
    /// # Errors
    /// `BeanError::NotRegistered` when the name is unknown,
    /// `BeanError::TypeMismatch` when the constructor builds another type.
    pub fn create<T>(&self, name: &ProviderName) -> Result<Arc<T>, BeanError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let map = self.map.read();
        let boxed = map.get(name).ok_or_else(|| BeanError::NotRegistered {
            name: name.clone(),
        })?;
        let ctor = boxed
            .downcast_ref::<Arc<dyn Fn() -> Arc<T> + Send + Sync>>()
            .ok_or_else(|| BeanError::TypeMismatch { name: name.clone() })?;
        Ok(ctor())
    }

    #[must_use]
    pub fn contains(&self, name: &ProviderName) -> bool {
        self.map.read().contains_key(name)
    }
}

enum FactorySource {
    Singleton(Arc<SingletonRegistry>),
    Managed(Arc<BeanContainer>),
}

/// Factory for provider instances: either singleton-backed or
/// container-managed. Produced by [`resolve_factory`].
pub struct ProviderFactory<T: ?Sized + Send + Sync + 'static> {
    name: ProviderName,
    source: FactorySource,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ProviderFactory<T> {
    #[must_use]
    pub fn name(&self) -> &ProviderName {
        &self.name
    }

    #[must_use]
    pub fn is_singleton(&self) -> bool {
        matches!(self.source, FactorySource::Singleton(_))
    }

    /// Produce an instance of the provider.
    ///
    /// Singleton factories return the same pre-existing `Arc` on every call;
    /// managed factories ask the container for a (possibly fresh) instance.
    ///
    /// # Errors
    /// Propagates [`BeanError`] from the backing registry or container.
    pub fn instance(&self) -> Result<Arc<T>, BeanError> {
        match &self.source {
            FactorySource::Singleton(registry) => registry.get::<T>(&self.name),
            FactorySource::Managed(container) => container.create::<T>(&self.name),
        }
    }
}

/// Resolve a provider name to a factory.
///
/// Membership in `singletons` selects the singleton variant; absence selects
/// the container-managed variant. Absence is the normal managed-bean path,
/// not a failure: this function is total and never errors.
pub fn resolve_factory<T>(
    name: &ProviderName,
    singletons: &SingletonSet,
    registry: &Arc<SingletonRegistry>,
    container: &Arc<BeanContainer>,
) -> ProviderFactory<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    let source = if singletons.contains(name) {
        FactorySource::Singleton(Arc::clone(registry))
    } else {
        FactorySource::Managed(Arc::clone(container))
    };
    ProviderFactory {
        name: name.clone(),
        source,
        _marker: PhantomData,
    }
}

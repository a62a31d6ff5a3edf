//! Service registry
//!
//! Maps a service identity (the Rust type `T`, sized or not) to a descriptor
//! and caches realized singletons per registry. Registries form a tree: a
//! scope falls back to its parent for identities it does not hold itself.
//!
//! All operations are synchronous and the handle is cheap to clone and share
//! across threads.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use super::descriptor::{downcast, Instance, Producer, ServiceDescriptor};
use super::resolution;
use super::slot::{Origin, SingletonSlot};
use super::stats::{ContainerStats, InnerStats};
use super::ServiceLifetime;
use crate::config::{RegistryConfig, ScopePolicy};
use crate::errors::{BoxError, ContainerError, DisposalFailure};
use crate::infrastructure::module::ServiceModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Active,
    Disposed,
}

/// Descriptor plus, for singletons, the cache cell it fills.
///
/// Keeping both in one map entry makes re-registration replace them
/// together, so a cached instance never outlives the descriptor it came from.
struct ServiceEntry {
    descriptor: Arc<ServiceDescriptor>,
    slot: Option<SingletonSlot>,
    /// Set once a later registration replaced this entry.
    replaced: AtomicBool,
    /// Set once the entry is on the retired list. Both flags change only
    /// under the `retired` lock.
    queued: AtomicBool,
}

impl ServiceEntry {
    fn new(descriptor: Arc<ServiceDescriptor>) -> Self {
        let slot = match (descriptor.lifetime(), &descriptor.producer) {
            (ServiceLifetime::Transient, _) => None,
            (ServiceLifetime::Singleton, Producer::Instance(instance)) => {
                Some(SingletonSlot::seeded(instance.clone()))
            }
            (ServiceLifetime::Singleton, Producer::Factory(_)) => Some(SingletonSlot::empty()),
        };
        Self::with_slot(descriptor, slot)
    }

    fn with_slot(descriptor: Arc<ServiceDescriptor>, slot: Option<SingletonSlot>) -> Self {
        Self {
            descriptor,
            slot,
            replaced: AtomicBool::new(false),
            queued: AtomicBool::new(false),
        }
    }

    /// Singleton with a disposal hook.
    fn owes_disposal(&self) -> bool {
        self.slot.is_some() && self.descriptor.disposer.is_some()
    }

    /// Copy for a child scope: same descriptor, realized singleton shared
    /// but marked as inherited, unrealized singleton left for the child.
    fn snapshot(&self) -> Self {
        let slot = self.slot.as_ref().map(|slot| match slot.get() {
            Some(instance) => SingletonSlot::inherited(instance.clone()),
            None => SingletonSlot::empty(),
        });
        Self::with_slot(self.descriptor.clone(), slot)
    }
}

struct RegistryInner {
    id: Uuid,
    config: RegistryConfig,
    entries: DashMap<TypeId, Arc<ServiceEntry>>,
    /// Replaced singleton entries whose instance still needs disposal.
    /// `None` once teardown has taken the list.
    retired: Mutex<Option<Vec<Arc<ServiceEntry>>>>,
    parent: Option<ServiceRegistry>,
    state: RwLock<LifecycleState>,
    stats: InnerStats,
}

/// Thread-safe service registry with hierarchical scopes.
///
/// ```
/// use std::sync::Arc;
/// use scoped_registry::ServiceRegistry;
///
/// struct Config { name: String }
///
/// let registry = ServiceRegistry::new();
/// registry
///     .register_singleton_factory(|_| Arc::new(Config { name: "demo".into() }))
///     .unwrap();
///
/// let scope = registry.create_scope().unwrap();
/// let config = scope.resolve::<Config>().unwrap();
/// assert_eq!(config.name, "demo");
/// ```
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// Creates a root registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a root registry. A zero resolution depth is raised to 1.
    pub fn with_config(mut config: RegistryConfig) -> Self {
        if let Err(error) = config.validate() {
            tracing::warn!(%error, "Invalid registry config, clamping resolution depth to 1");
            config.max_resolution_depth = config.max_resolution_depth.max(1);
        }
        let registry = Self::build(config, None);
        tracing::debug!(
            registry = %registry.id(),
            scope_policy = %registry.inner.config.scope_policy,
            "Created root registry"
        );
        registry
    }

    fn build(config: RegistryConfig, parent: Option<ServiceRegistry>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                id: Uuid::new_v4(),
                config,
                entries: DashMap::new(),
                retired: Mutex::new(Some(Vec::new())),
                parent,
                state: RwLock::new(LifecycleState::Active),
                stats: InnerStats::default(),
            }),
        }
    }

    // ---- registration -------------------------------------------------

    /// Stores a descriptor, replacing any previous one for the same identity.
    pub fn add(&self, descriptor: ServiceDescriptor) -> Result<(), ContainerError> {
        let state = self.inner.state.read();
        if *state == LifecycleState::Disposed {
            return Err(self.disposed_error());
        }

        let type_id = descriptor.type_id();
        let service = descriptor.type_name();
        let lifetime = descriptor.lifetime();
        let entry = Arc::new(ServiceEntry::new(Arc::new(descriptor)));

        if let Some(previous) = self.inner.entries.insert(type_id, entry) {
            tracing::debug!(registry = %self.id(), service, "Replaced existing registration");
            self.retire(previous);
        }
        drop(state);

        tracing::debug!(registry = %self.id(), service, ?lifetime, "Registered service");
        Ok(())
    }

    /// Keeps a replaced entry for teardown only if it holds an instance that
    /// needs disposal. An entry still under construction is queued by the
    /// constructing thread instead.
    fn retire(&self, entry: Arc<ServiceEntry>) {
        if !entry.owes_disposal() {
            return;
        }
        let mut retired = self.inner.retired.lock();
        entry.replaced.store(true, Ordering::Relaxed);
        let realized = entry.slot.as_ref().is_some_and(|slot| slot.get().is_some());
        if realized && !entry.queued.swap(true, Ordering::Relaxed) {
            if let Some(list) = retired.as_mut() {
                list.push(entry);
            }
        }
    }

    /// Registers a transient service that always hands out `instance`.
    pub fn register_instance<T>(&self, instance: Arc<T>) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Transient)
                .instance(instance)
                .build()?,
        )
    }

    /// Registers a transient service; every resolution calls `factory`.
    pub fn register_factory<T, F>(&self, factory: F) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceRegistry) -> Arc<T> + Send + Sync + 'static,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Transient)
                .factory(factory)
                .build()?,
        )
    }

    pub fn register_try_factory<T, F, E>(&self, factory: F) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceRegistry) -> Result<Arc<T>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Transient)
                .try_factory(factory)
                .build()?,
        )
    }

    /// Registers a singleton and seeds the cache with `instance` right away.
    pub fn register_singleton_instance<T>(&self, instance: Arc<T>) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Singleton)
                .instance(instance)
                .build()?,
        )
    }

    /// Registers a singleton built by `factory` on first resolution.
    pub fn register_singleton_factory<T, F>(&self, factory: F) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceRegistry) -> Arc<T> + Send + Sync + 'static,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Singleton)
                .factory(factory)
                .build()?,
        )
    }

    pub fn register_singleton_try_factory<T, F, E>(&self, factory: F) -> Result<(), ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceRegistry) -> Result<Arc<T>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.add(
            ServiceDescriptor::builder::<T>(ServiceLifetime::Singleton)
                .try_factory(factory)
                .build()?,
        )
    }

    /// Lets `module` register its services on this registry.
    pub fn install<M>(&self, module: &M) -> Result<(), ContainerError>
    where
        M: ServiceModule + ?Sized,
    {
        self.ensure_active()?;
        tracing::debug!(registry = %self.id(), module = module.name(), "Installing module");
        module.configure(self)
    }

    // ---- resolution ---------------------------------------------------

    /// Resolves `T` from this registry or the nearest ancestor holding it.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_resolve::<T>()?
            .ok_or_else(|| ContainerError::ServiceNotRegistered {
                type_id: TypeId::of::<T>(),
                service: std::any::type_name::<T>(),
            })
    }

    /// Like [`resolve`](Self::resolve), but an identity missing from the whole
    /// chain is `Ok(None)`. Construction failures are still errors.
    pub fn try_resolve<T>(&self) -> Result<Option<Arc<T>>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let found = {
            // teardown clears the entries under the write lock
            let state = self.inner.state.read();
            if *state == LifecycleState::Disposed {
                return Err(self.disposed_error());
            }
            self.lookup(type_id)
        };
        self.inner.stats.record_resolution();

        let Some((owner, entry)) = found else {
            self.inner.stats.record_not_found();
            tracing::trace!(
                registry = %self.id(),
                service = std::any::type_name::<T>(),
                "Service not found"
            );
            return Ok(None);
        };

        let instance = owner.produce(&entry)?;
        downcast::<T>(&instance).map(Some)
    }

    /// Finds the entry for `type_id`, walking up the parent chain. A disposed
    /// ancestor ends the walk.
    fn lookup(&self, type_id: TypeId) -> Option<(ServiceRegistry, Arc<ServiceEntry>)> {
        let mut current = self;
        loop {
            if let Some(entry) = current.inner.entries.get(&type_id) {
                return Some((current.clone(), entry.value().clone()));
            }
            match &current.inner.parent {
                Some(parent) if !parent.is_disposed() => current = parent,
                _ => return None,
            }
        }
    }

    fn produce(&self, entry: &Arc<ServiceEntry>) -> Result<Instance, ContainerError> {
        let descriptor = &entry.descriptor;

        let Some(slot) = &entry.slot else {
            return match &descriptor.producer {
                Producer::Instance(instance) => Ok(instance.clone()),
                Producer::Factory(factory) => {
                    let _guard = self.enter(descriptor)?;
                    let instance = factory(self)?;
                    self.inner.stats.record_transient_creation();
                    Ok(instance)
                }
            };
        };

        if let Some(instance) = slot.get() {
            self.inner.stats.record_singleton_hit();
            return Ok(instance.clone());
        }

        let _guard = self.enter(descriptor)?;
        let (instance, created) = slot.get_or_try_init(|| {
            // teardown marks the registry before waiting on the slot
            if self.is_disposed() {
                return Err(self.disposed_error());
            }
            match &descriptor.producer {
                Producer::Factory(factory) => factory(self),
                Producer::Instance(instance) => Ok(instance.clone()),
            }
        })?;

        if created {
            self.settle_replaced(entry, &instance);
            // teardown waited for this construction and disposes the result
            if self.is_disposed() {
                return Err(self.disposed_error());
            }
            self.inner.stats.record_singleton_creation();
            tracing::debug!(
                registry = %self.id(),
                service = descriptor.type_name(),
                "Singleton realized"
            );
        } else {
            self.inner.stats.record_singleton_hit();
        }
        Ok(instance)
    }

    /// Queues an instance realized after its entry was replaced. Once
    /// teardown has taken the queue, the instance is disposed right here.
    fn settle_replaced(&self, entry: &Arc<ServiceEntry>, instance: &Instance) {
        if !entry.owes_disposal() {
            return;
        }
        let mut retired = self.inner.retired.lock();
        if !entry.replaced.load(Ordering::Relaxed) || entry.queued.swap(true, Ordering::Relaxed) {
            return;
        }
        match retired.as_mut() {
            Some(list) => list.push(entry.clone()),
            None => {
                drop(retired);
                if let Some(Err(error)) = entry.descriptor.disposer.as_ref().map(|d| d(instance)) {
                    tracing::warn!(
                        registry = %self.id(),
                        service = entry.descriptor.type_name(),
                        %error,
                        "Late service disposal failed"
                    );
                }
            }
        }
    }

    fn enter(&self, descriptor: &ServiceDescriptor) -> Result<resolution::ResolutionGuard, ContainerError> {
        resolution::enter(
            self.inner.id,
            descriptor.type_id(),
            descriptor.type_name(),
            self.inner.config.max_resolution_depth,
        )
    }

    // ---- scopes -------------------------------------------------------

    /// Creates a child registry whose parent is `self`.
    ///
    /// With [`ScopePolicy::Snapshot`] the child starts with a copy of every
    /// descriptor and every singleton realized so far; later changes on
    /// either side are not copied. With [`ScopePolicy::Delegate`] the child
    /// starts empty and resolves everything it does not register through
    /// its ancestors.
    pub fn create_scope(&self) -> Result<ServiceRegistry, ContainerError> {
        let state = self.inner.state.read();
        if *state == LifecycleState::Disposed {
            return Err(self.disposed_error());
        }

        let scope = Self::build(self.inner.config.clone(), Some(self.clone()));
        if self.inner.config.scope_policy == ScopePolicy::Snapshot {
            for item in self.inner.entries.iter() {
                scope
                    .inner
                    .entries
                    .insert(*item.key(), Arc::new(item.value().snapshot()));
            }
        }
        drop(state);

        tracing::debug!(
            registry = %scope.id(),
            parent = %self.id(),
            copied = scope.len(),
            "Created scope"
        );
        Ok(scope)
    }

    // ---- teardown -----------------------------------------------------

    /// Tears the registry down: runs the disposal hook of every singleton
    /// this registry realized, then clears all registrations.
    ///
    /// Singleton constructions already running are waited for and their
    /// instances disposed too. Every hook is attempted; failures are
    /// returned together. Calling `dispose` again is a no-op. Parent and
    /// scopes are unaffected.
    pub fn dispose(&self) -> Result<(), ContainerError> {
        let (entries, retired) = {
            let mut state = self.inner.state.write();
            if *state == LifecycleState::Disposed {
                return Ok(());
            }
            *state = LifecycleState::Disposed;

            let entries: Vec<Arc<ServiceEntry>> = self
                .inner
                .entries
                .iter()
                .map(|item| item.value().clone())
                .collect();
            self.inner.entries.clear();
            let retired = self.inner.retired.lock().take().unwrap_or_default();
            (entries, retired)
        };

        let mut visited = HashSet::new();
        let mut failures = Vec::new();
        let mut disposed = 0usize;

        for entry in retired.iter().chain(entries.iter()) {
            let (Some(slot), Some(disposer)) = (&entry.slot, &entry.descriptor.disposer) else {
                continue;
            };
            if slot.origin() != Origin::Local {
                continue;
            }
            let Some(instance) = slot.settled() else {
                continue;
            };
            if let Some(address) = entry.descriptor.instance_address(instance) {
                if !visited.insert(address) {
                    continue;
                }
            }

            disposed += 1;
            if let Err(error) = disposer(instance) {
                let service = entry.descriptor.type_name();
                tracing::warn!(registry = %self.id(), service, %error, "Service disposal failed");
                failures.push(DisposalFailure { service, error });
            }
        }

        tracing::debug!(
            registry = %self.id(),
            disposed,
            failed = failures.len(),
            "Registry disposed"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::DisposalFailed { failures })
        }
    }

    // ---- introspection ------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn parent(&self) -> Option<&ServiceRegistry> {
        self.inner.parent.as_ref()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn is_disposed(&self) -> bool {
        *self.inner.state.read() == LifecycleState::Disposed
    }

    /// Whether `T` can be resolved from here (locally or via ancestors).
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        !self.is_disposed() && self.lookup(TypeId::of::<T>()).is_some()
    }

    /// Whether this registry itself holds a descriptor for `T`.
    pub fn contains_local<T: ?Sized + 'static>(&self) -> bool {
        self.inner.entries.contains_key(&TypeId::of::<T>())
    }

    /// Type names of the locally registered services, sorted.
    pub fn registered_services(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .inner
            .entries
            .iter()
            .map(|item| item.value().descriptor.type_name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of local descriptors.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Number of singletons currently realized in this registry's cache,
    /// inherited ones included.
    pub fn singleton_count(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|item| item.value().slot.as_ref().is_some_and(|slot| slot.get().is_some()))
            .count()
    }

    pub fn stats(&self) -> ContainerStats {
        self.inner.stats.snapshot()
    }

    fn ensure_active(&self) -> Result<(), ContainerError> {
        if self.is_disposed() {
            Err(self.disposed_error())
        } else {
            Ok(())
        }
    }

    fn disposed_error(&self) -> ContainerError {
        ContainerError::ContainerDisposed { id: self.inner.id }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent.as_ref().map(|p| p.id()))
            .field("services", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestService {
        id: usize,
    }

    struct Left;
    struct Right;

    #[test]
    fn test_transient_service() {
        let registry = ServiceRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        registry
            .register_factory(move |_| {
                let id = counter_clone.fetch_add(1, Ordering::SeqCst);
                Arc::new(TestService { id })
            })
            .unwrap();

        let service1 = registry.resolve::<TestService>().unwrap();
        let service2 = registry.resolve::<TestService>().unwrap();

        assert_ne!(service1.id, service2.id);
        assert!(!Arc::ptr_eq(&service1, &service2));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(registry.stats().transient_creations, 2);
    }

    #[test]
    fn test_singleton_service() {
        let registry = ServiceRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        registry
            .register_singleton_factory(move |_| {
                let id = counter_clone.fetch_add(1, Ordering::SeqCst);
                Arc::new(TestService { id })
            })
            .unwrap();
        assert_eq!(registry.singleton_count(), 0);

        let service1 = registry.resolve::<TestService>().unwrap();
        let service2 = registry.resolve::<TestService>().unwrap();
        let service3 = registry.resolve::<TestService>().unwrap();

        assert!(Arc::ptr_eq(&service1, &service2));
        assert!(Arc::ptr_eq(&service2, &service3));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.singleton_count(), 1);

        let stats = registry.stats();
        assert_eq!(stats.total_resolutions, 3);
        assert_eq!(stats.singleton_creations, 1);
        assert_eq!(stats.singleton_hits, 2);
    }

    #[test]
    fn test_singleton_instance_is_seeded() {
        let registry = ServiceRegistry::new();
        let instance = Arc::new(TestService { id: 9 });
        registry.register_singleton_instance(instance.clone()).unwrap();

        assert_eq!(registry.singleton_count(), 1);
        assert!(Arc::ptr_eq(&registry.resolve::<TestService>().unwrap(), &instance));
    }

    #[test]
    fn test_service_not_registered() {
        let registry = ServiceRegistry::new();

        let result = registry.resolve::<TestService>();
        match result {
            Err(ContainerError::ServiceNotRegistered { type_id, service }) => {
                assert_eq!(type_id, TypeId::of::<TestService>());
                assert!(service.contains("TestService"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(registry.try_resolve::<TestService>().unwrap().is_none());
        assert_eq!(registry.stats().not_found, 2);
    }

    #[test]
    fn test_factory_resolves_dependencies() {
        struct Repository {
            service: Arc<TestService>,
        }

        let registry = ServiceRegistry::new();
        registry
            .register_singleton_instance(Arc::new(TestService { id: 5 }))
            .unwrap();
        registry
            .register_try_factory(|r: &ServiceRegistry| {
                Ok::<_, ContainerError>(Arc::new(Repository {
                    service: r.resolve::<TestService>()?,
                }))
            })
            .unwrap();

        let repository = registry.resolve::<Repository>().unwrap();
        assert_eq!(repository.service.id, 5);
    }

    #[test]
    fn test_missing_dependency_is_not_reported_as_missing_service() {
        struct Repository;

        let registry = ServiceRegistry::new();
        registry
            .register_try_factory(|r: &ServiceRegistry| {
                r.resolve::<TestService>()?;
                Ok::<_, ContainerError>(Arc::new(Repository))
            })
            .unwrap();

        match registry.try_resolve::<Repository>() {
            Err(ContainerError::ServiceNotRegistered { service, .. }) => {
                assert!(service.contains("TestService"));
            }
            other => panic!("unexpected result: {:?}", other.map(|o| o.is_some())),
        }
    }

    #[test]
    fn test_circular_dependency() {
        let registry = ServiceRegistry::new();
        registry
            .register_singleton_try_factory(|r: &ServiceRegistry| {
                r.resolve::<Right>()?;
                Ok::<_, ContainerError>(Arc::new(Left))
            })
            .unwrap();
        registry
            .register_singleton_try_factory(|r: &ServiceRegistry| {
                r.resolve::<Left>()?;
                Ok::<_, ContainerError>(Arc::new(Right))
            })
            .unwrap();

        match registry.resolve::<Left>() {
            Err(ContainerError::CircularDependency { chain }) => {
                assert_eq!(chain.len(), 3);
                assert!(chain[0].ends_with("Left"));
                assert!(chain[1].ends_with("Right"));
                assert!(chain[2].ends_with("Left"));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        // the failed construction left both caches empty
        assert_eq!(registry.singleton_count(), 0);
    }

    #[test]
    fn test_depth_limit() {
        struct Top;

        let registry =
            ServiceRegistry::with_config(RegistryConfig::default().with_max_resolution_depth(1));
        registry
            .register_factory(|_| Arc::new(TestService { id: 0 }))
            .unwrap();
        registry
            .register_try_factory(|r: &ServiceRegistry| {
                r.resolve::<TestService>()?;
                Ok::<_, ContainerError>(Arc::new(Top))
            })
            .unwrap();

        assert!(matches!(
            registry.resolve::<Top>(),
            Err(ContainerError::ResolutionDepthExceeded { limit: 1, .. })
        ));
        assert!(registry.resolve::<TestService>().is_ok());
    }

    fn retired_len(registry: &ServiceRegistry) -> usize {
        registry.inner.retired.lock().as_ref().map_or(0, Vec::len)
    }

    #[test]
    fn test_replacement_keeps_only_realized_disposables() {
        let registry = ServiceRegistry::new();
        let disposable = || {
            ServiceDescriptor::builder::<TestService>(ServiceLifetime::Singleton)
                .factory(|_| Arc::new(TestService { id: 0 }))
                .dispose_with(|_| Ok(()))
                .build()
                .unwrap()
        };

        // never realized
        registry.add(disposable()).unwrap();
        registry.add(disposable()).unwrap();
        assert_eq!(retired_len(&registry), 0);

        // realized but nothing to dispose
        registry
            .register_singleton_factory(|_| Arc::new(TestService { id: 1 }))
            .unwrap();
        registry.resolve::<TestService>().unwrap();
        registry.add(disposable()).unwrap();
        assert_eq!(retired_len(&registry), 0);

        registry.resolve::<TestService>().unwrap();
        registry.add(disposable()).unwrap();
        assert_eq!(retired_len(&registry), 1);

        registry.dispose().unwrap();
        assert!(registry.inner.retired.lock().is_none());
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let registry =
            ServiceRegistry::with_config(RegistryConfig::default().with_max_resolution_depth(0));
        assert_eq!(registry.config().max_resolution_depth, 1);

        registry
            .register_factory(|_| Arc::new(TestService { id: 3 }))
            .unwrap();
        assert_eq!(registry.resolve::<TestService>().unwrap().id, 3);
    }

    #[test]
    fn test_introspection() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_empty());
        registry.register_instance(Arc::new(TestService { id: 1 })).unwrap();
        registry.register_instance(Arc::new(7u32)).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains_local::<u32>());
        assert!(registry.is_registered::<TestService>());
        assert!(!registry.is_registered::<String>());
        assert_eq!(registry.registered_services().len(), 2);
        assert!(registry.parent().is_none());

        let debug = format!("{:?}", registry);
        assert!(debug.contains("services: 2"));
    }
}

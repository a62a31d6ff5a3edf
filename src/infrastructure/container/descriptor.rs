//! Service descriptors
//!
//! A descriptor is the immutable (lifetime, producer) pair registered for one
//! service identity. Descriptors are type-erased once built so that a single
//! registry can hold services of any type; the typed [`DescriptorBuilder`]
//! is the only way to create one.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::dispose::Disposable;
use super::registry::ServiceRegistry;
use super::ServiceLifetime;
use crate::errors::{BoxError, ContainerError};

/// Type-erased service instance. The payload is always an `Arc<T>` for the
/// identity `T`, which lets unsized identities such as `dyn Trait` be stored.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type ErasedFactory =
    Arc<dyn Fn(&ServiceRegistry) -> Result<Instance, ContainerError> + Send + Sync>;

pub(crate) type ErasedDisposer = Arc<dyn Fn(&Instance) -> Result<(), BoxError> + Send + Sync>;

/// Exactly one way of producing the service.
#[derive(Clone)]
pub(crate) enum Producer {
    Instance(Instance),
    Factory(ErasedFactory),
}

/// Registered (lifetime, producer) pair for one service identity.
#[derive(Clone)]
pub struct ServiceDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    lifetime: ServiceLifetime,
    pub(crate) producer: Producer,
    pub(crate) disposer: Option<ErasedDisposer>,
    address: fn(&Instance) -> Option<usize>,
}

impl ServiceDescriptor {
    /// Starts building a descriptor for the service identity `T`.
    pub fn builder<T>(lifetime: ServiceLifetime) -> DescriptorBuilder<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        DescriptorBuilder {
            lifetime,
            instance: None,
            factory: None,
            disposer: None,
            _marker: PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn lifetime(&self) -> ServiceLifetime {
        self.lifetime
    }

    /// Whether the producer is a factory rather than a ready-made instance.
    pub fn is_factory(&self) -> bool {
        matches!(self.producer, Producer::Factory(_))
    }

    pub fn has_disposer(&self) -> bool {
        self.disposer.is_some()
    }

    /// Address of the `T` behind an erased instance, used to visit each
    /// shared instance once during teardown.
    pub(crate) fn instance_address(&self, instance: &Instance) -> Option<usize> {
        (self.address)(instance)
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service", &self.type_name)
            .field("lifetime", &self.lifetime)
            .field("factory", &self.is_factory())
            .field("disposer", &self.has_disposer())
            .finish()
    }
}

/// Typed builder for [`ServiceDescriptor`].
///
/// ```
/// use std::sync::Arc;
/// use scoped_registry::{ServiceDescriptor, ServiceLifetime, ServiceRegistry};
///
/// struct Clock;
///
/// let registry = ServiceRegistry::new();
/// let descriptor = ServiceDescriptor::builder::<Clock>(ServiceLifetime::Singleton)
///     .factory(|_| Arc::new(Clock))
///     .build()
///     .unwrap();
/// registry.add(descriptor).unwrap();
/// assert!(registry.is_registered::<Clock>());
/// ```
pub struct DescriptorBuilder<T: ?Sized> {
    lifetime: ServiceLifetime,
    instance: Option<Arc<T>>,
    factory: Option<ErasedFactory>,
    disposer: Option<ErasedDisposer>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T> DescriptorBuilder<T>
where
    T: ?Sized + Send + Sync + 'static,
{
    /// Uses a ready-made instance as the producer.
    pub fn instance(mut self, instance: Arc<T>) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Uses an infallible factory as the producer.
    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Arc<T> + Send + Sync + 'static,
    {
        self.try_factory(move |registry| Ok::<_, std::convert::Infallible>(factory(registry)))
    }

    /// Uses a fallible factory as the producer. Registry errors returned from
    /// nested resolution are propagated unchanged; anything else becomes
    /// [`ContainerError::CreationFailed`].
    pub fn try_factory<F, E>(mut self, factory: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<Arc<T>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let service = std::any::type_name::<T>();
        self.factory = Some(Arc::new(move |registry: &ServiceRegistry| {
            let service_instance = factory(registry)
                .map_err(|e| ContainerError::from_factory(service, e.into()))?;
            Ok(Arc::new(service_instance) as Instance)
        }));
        self
    }

    /// Runs `hook` on the instance when the owning registry is torn down.
    /// Only valid for singletons.
    pub fn dispose_with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let service = std::any::type_name::<T>();
        self.disposer = Some(Arc::new(move |instance: &Instance| {
            match (**instance).downcast_ref::<Arc<T>>() {
                Some(service_instance) => hook(service_instance),
                None => Err(format!("stored instance is not a '{}'", service).into()),
            }
        }));
        self
    }

    pub fn build(self) -> Result<ServiceDescriptor, ContainerError> {
        let service = std::any::type_name::<T>();
        let producer = match (self.instance, self.factory) {
            (Some(instance), None) => Producer::Instance(Arc::new(instance) as Instance),
            (None, Some(factory)) => Producer::Factory(factory),
            (None, None) => {
                return Err(ContainerError::InvalidRegistration {
                    service,
                    reason: "descriptor has neither an instance nor a factory".to_string(),
                })
            }
            (Some(_), Some(_)) => {
                return Err(ContainerError::InvalidRegistration {
                    service,
                    reason: "descriptor has both an instance and a factory".to_string(),
                })
            }
        };

        if self.disposer.is_some() && self.lifetime != ServiceLifetime::Singleton {
            return Err(ContainerError::InvalidRegistration {
                service,
                reason: "disposal hooks are only supported for singletons".to_string(),
            });
        }

        Ok(ServiceDescriptor {
            type_id: TypeId::of::<T>(),
            type_name: service,
            lifetime: self.lifetime,
            producer,
            disposer: self.disposer,
            address: instance_address::<T>,
        })
    }
}

impl<T> DescriptorBuilder<T>
where
    T: ?Sized + Disposable + 'static,
{
    /// Runs [`Disposable::dispose`] on the instance at teardown.
    pub fn disposable(self) -> Self {
        self.dispose_with(|service| service.dispose())
    }
}

fn instance_address<T: ?Sized + 'static>(instance: &Instance) -> Option<usize> {
    (**instance)
        .downcast_ref::<Arc<T>>()
        .map(|service| Arc::as_ptr(service) as *const () as usize)
}

/// Recovers the typed handle from an erased instance.
pub(crate) fn downcast<T>(instance: &Instance) -> Result<Arc<T>, ContainerError>
where
    T: ?Sized + 'static,
{
    (**instance)
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ContainerError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            reason: "stored instance does not match its service identity".to_string(),
        })
}

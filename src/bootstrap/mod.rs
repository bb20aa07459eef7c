use crate::error::{LifecastError, Result};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Type-keyed registry shared with listeners before the execution context exists.
///
/// Listeners of the `starting` and `environment_prepared` phases can register
/// expensive components here so later phases reuse them. The registry is closed
/// once the execution context has been prepared; lookups keep working after that
/// but registration is refused.
pub struct BootstrapContext {
    instances: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    closed: AtomicBool,
}

impl BootstrapContext {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register `instance`, replacing any previous instance of the same type.
    pub fn register<T: 'static + Send + Sync>(&self, instance: T) -> Result<()> {
        self.ensure_open::<T>()?;
        self.instances.insert(TypeId::of::<T>(), Arc::new(instance));
        Ok(())
    }

    /// Register `instance` unless one of the same type is already present.
    ///
    /// Returns `true` if the instance was stored.
    pub fn register_if_absent<T: 'static + Send + Sync>(&self, instance: T) -> Result<bool> {
        self.ensure_open::<T>()?;
        let mut inserted = false;
        self.instances.entry(TypeId::of::<T>()).or_insert_with(|| {
            inserted = true;
            Arc::new(instance)
        });
        Ok(inserted)
    }

    pub fn get<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        // Keyed by `TypeId`, so a stored entry always downcasts.
        self.instances
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value().clone().downcast::<T>().ok())
            .ok_or_else(|| LifecastError::ComponentNotFound {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Look up `T`, falling back to `default` when nothing is registered.
    pub fn get_or_else<T, F>(&self, default: F) -> Arc<T>
    where
        T: 'static + Send + Sync,
        F: FnOnce() -> T,
    {
        self.get::<T>().unwrap_or_else(|_| Arc::new(default()))
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.instances.contains_key(&TypeId::of::<T>())
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(
                "Bootstrap context closed with {} registered components",
                self.len()
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn ensure_open<T>(&self) -> Result<()> {
        if self.is_closed() {
            return Err(LifecastError::BootstrapClosed {
                type_name: std::any::type_name::<T>().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BootstrapContext {
    fn default() -> Self {
        Self::new()
    }
}

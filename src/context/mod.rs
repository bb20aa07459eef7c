//! Execution context
//!
//! The fully initialized process object. Once it exists it owns its own listener
//! registry and publish capability, which take over from the bootstrap-time
//! dispatcher after the hand-off in `context_loaded`.
//!
//! # States
//!
//! ```text
//! Created ──refresh()──▶ Refreshing ──hooks ok──▶ Active ──close()──▶ Closed
//!                             │
//!                             └──hook failed──▶ Failed ──close()──▶ Closed
//! ```

use crate::config::Environment;
use crate::error::{LifecastError, Result};
use crate::event::LifecycleEvent;
use crate::event::availability::{ReadinessState, publish_availability};
use crate::listener::ApplicationListener;
use crate::multicaster::EventMulticaster;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use strum_macros::Display;

/// Capabilities the lifecycle machinery needs from an execution context.
pub trait ExecutionContext: Send + Sync {
    fn id(&self) -> &str;

    /// Whether the context has been refreshed and not yet closed.
    fn is_active(&self) -> bool;

    /// Register a listener in the context's own registry.
    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>);

    /// Deliver an event through the context's own registry.
    fn publish_event(&self, event: LifecycleEvent) -> Result<()>;

    /// The listeners accumulated in the context's registry, if the context exposes them.
    fn application_listeners(&self) -> Option<Vec<Arc<dyn ApplicationListener>>> {
        None
    }
}

/// Shared handle to an execution context.
pub type ContextRef = Arc<dyn ExecutionContext>;

/// Identity comparison for context handles.
pub fn same_context(a: &ContextRef, b: &ContextRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ContextState {
    Created,
    Refreshing,
    Active,
    Failed,
    Closed,
}

/// Hook run while the context refreshes.
pub type RefreshHook = Arc<dyn Fn(&ApplicationContext) -> anyhow::Result<()> + Send + Sync>;

/// The default execution context.
pub struct ApplicationContext {
    id: String,
    environment: Environment,
    startup_time: DateTime<Utc>,
    state: RwLock<ContextState>,
    multicaster: RwLock<EventMulticaster>,
    early_events: Mutex<Option<Vec<LifecycleEvent>>>,
    refresh_hooks: Mutex<Vec<RefreshHook>>,
}

impl ApplicationContext {
    pub fn new(name: &str, environment: Environment) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("{}-{}", name, &suffix[..8]),
            environment,
            startup_time: Utc::now(),
            state: RwLock::new(ContextState::Created),
            multicaster: RwLock::new(EventMulticaster::new()),
            early_events: Mutex::new(None),
            refresh_hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn startup_time(&self) -> DateTime<Utc> {
        self.startup_time
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    pub fn add_refresh_hook(&self, hook: RefreshHook) {
        self.refresh_hooks.lock().push(hook);
    }

    /// Run the refresh hooks and activate the context.
    ///
    /// Events published while hooks run are held back and delivered, in order,
    /// once the context is active. If a hook fails the held events are dropped
    /// and the context moves to [`ContextState::Failed`]. A listener error while
    /// delivering held events leaves the context active and drops the remaining ones.
    pub fn refresh(&self) -> Result<()> {
        self.transition(ContextState::Created, ContextState::Refreshing, "refresh")?;
        *self.early_events.lock() = Some(Vec::new());
        tracing::debug!("Refreshing {}", self.id);

        let hooks = self.refresh_hooks.lock().clone();
        for hook in hooks {
            if let Err(e) = hook(self) {
                *self.early_events.lock() = None;
                *self.state.write() = ContextState::Failed;
                tracing::warn!("Refresh of {} failed: {:#}", self.id, e);
                return Err(LifecastError::RefreshFailed {
                    context: self.id.clone(),
                    source: e,
                });
            }
        }

        *self.state.write() = ContextState::Active;
        let early = self.early_events.lock().take().unwrap_or_default();
        for (delivered, event) in early.iter().enumerate() {
            if let Err(e) = self.multicast(event) {
                let dropped = early.len() - delivered - 1;
                if dropped > 0 {
                    tracing::warn!(
                        "Dropped {} early events of {} after a listener failure",
                        dropped,
                        self.id
                    );
                }
                return Err(e);
            }
        }
        tracing::debug!("Refreshed {} ({} early events)", self.id, early.len());
        Ok(())
    }

    /// Close the context.
    ///
    /// An active context announces that it refuses traffic and publishes
    /// a `ContextClosed` event first. Closing an already closed context does nothing.
    pub fn close(self: &Arc<Self>) -> Result<()> {
        let previous = self.state();
        if previous == ContextState::Closed {
            return Ok(());
        }

        let result = if previous == ContextState::Active {
            tracing::info!("Closing {}", self.id);
            let context: ContextRef = Arc::clone(self) as ContextRef;
            publish_availability(&context, ReadinessState::RefusingTraffic).and_then(|_| {
                self.publish_event(LifecycleEvent::context_closed(Arc::clone(&context)))
            })
        } else {
            Ok(())
        };

        *self.state.write() = ContextState::Closed;
        result
    }

    fn transition(
        &self,
        from: ContextState,
        to: ContextState,
        operation: &'static str,
    ) -> Result<()> {
        let mut state = self.state.write();
        if *state != from {
            return Err(LifecastError::InvalidContextState {
                context: self.id.clone(),
                state: state.to_string(),
                operation,
            });
        }
        *state = to;
        Ok(())
    }

    fn multicast(&self, event: &LifecycleEvent) -> Result<()> {
        // Snapshot so listeners can register or publish while being called.
        let multicaster = self.multicaster.read().clone();
        multicaster.multicast_event(event)
    }
}

impl ExecutionContext for ApplicationContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) {
        self.multicaster.write().add_listener(listener);
    }

    fn publish_event(&self, event: LifecycleEvent) -> Result<()> {
        match self.state() {
            ContextState::Created | ContextState::Failed => {
                Err(LifecastError::EventRegistryNotReady {
                    context: self.id.clone(),
                })
            }
            ContextState::Refreshing => {
                let mut early = self.early_events.lock();
                match early.as_mut() {
                    Some(events) => {
                        events.push(event);
                        Ok(())
                    }
                    None => Err(LifecastError::EventRegistryNotReady {
                        context: self.id.clone(),
                    }),
                }
            }
            ContextState::Active | ContextState::Closed => self.multicast(&event),
        }
    }

    fn application_listeners(&self) -> Option<Vec<Arc<dyn ApplicationListener>>> {
        Some(self.multicaster.read().listeners().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::event::availability::LivenessState;
    use crate::listener::listener_fn;

    fn recording(log: &Arc<Mutex<Vec<EventType>>>) -> Arc<dyn ApplicationListener> {
        let log = Arc::clone(log);
        listener_fn("recording", EventType::ALL, move |event| {
            log.lock().push(event.event_type());
            Ok(())
        })
    }

    fn context() -> Arc<ApplicationContext> {
        Arc::new(ApplicationContext::new("ctx", Environment::new()))
    }

    #[test]
    fn test_id_is_prefixed_with_name() {
        let context = context();
        assert!(context.id().starts_with("ctx-"));
        assert_eq!(context.id().len(), "ctx-".len() + 8);
        assert_eq!(context.state(), ContextState::Created);
        assert!(!context.is_active());
    }

    #[test]
    fn test_publish_requires_refresh() {
        let context = context();
        let event = LifecycleEvent::context_closed(Arc::clone(&context) as ContextRef);
        assert!(matches!(
            context.publish_event(event),
            Err(LifecastError::EventRegistryNotReady { .. })
        ));
    }

    #[test]
    fn test_events_published_during_refresh_are_delivered_after_activation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = context();
        context.add_application_listener(recording(&log));

        let observed_during_hook = Arc::new(Mutex::new(None));
        let observed = Arc::clone(&observed_during_hook);
        let handle = Arc::downgrade(&context);
        context.add_refresh_hook(Arc::new(move |ctx: &ApplicationContext| -> anyhow::Result<()> {
            if let Some(context) = handle.upgrade() {
                ctx.publish_event(LifecycleEvent::context_closed(context as ContextRef))?;
            }
            *observed.lock() = Some(ctx.state());
            Ok(())
        }));
        let during_hook = Arc::clone(&log);
        context.add_refresh_hook(Arc::new(move |_ctx: &ApplicationContext| -> anyhow::Result<()> {
            assert!(during_hook.lock().is_empty());
            Ok(())
        }));

        context.refresh().unwrap();

        assert_eq!(*observed_during_hook.lock(), Some(ContextState::Refreshing));
        assert_eq!(*log.lock(), vec![EventType::ContextClosed]);
        assert!(context.is_active());
    }

    #[test]
    fn test_failed_refresh_leaves_context_inactive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = context();
        context.add_application_listener(recording(&log));
        context.add_refresh_hook(Arc::new(|_ctx: &ApplicationContext| -> anyhow::Result<()> {
            anyhow::bail!("datasource unavailable")
        }));

        let err = context.refresh().unwrap_err();
        assert!(matches!(err, LifecastError::RefreshFailed { .. }));
        assert_eq!(context.state(), ContextState::Failed);
        assert!(!context.is_active());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_listener_error_on_early_event_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = context();
        context.add_application_listener(recording(&log));
        context.add_application_listener(listener_fn(
            "closing-guard",
            &[EventType::ContextClosed],
            |_| anyhow::bail!("not yet"),
        ));

        let handle = Arc::downgrade(&context);
        context.add_refresh_hook(Arc::new(move |ctx: &ApplicationContext| -> anyhow::Result<()> {
            if let Some(context) = handle.upgrade() {
                let context = context as ContextRef;
                ctx.publish_event(LifecycleEvent::context_closed(Arc::clone(&context)))?;
                ctx.publish_event(LifecycleEvent::availability_change(
                    context,
                    LivenessState::Correct.into(),
                ))?;
            }
            Ok(())
        }));

        let err = context.refresh().unwrap_err();
        assert!(matches!(
            err,
            LifecastError::ListenerFailed {
                event_type: EventType::ContextClosed,
                ..
            }
        ));
        assert!(context.is_active());
        assert_eq!(*log.lock(), vec![EventType::ContextClosed]);
    }

    #[test]
    fn test_refresh_twice_is_rejected() {
        let context = context();
        context.refresh().unwrap();
        assert!(matches!(
            context.refresh(),
            Err(LifecastError::InvalidContextState {
                operation: "refresh",
                ..
            })
        ));
    }

    #[test]
    fn test_close_active_context_announces_shutdown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = context();
        context.add_application_listener(recording(&log));
        context.refresh().unwrap();

        context.close().unwrap();
        context.close().unwrap();

        assert_eq!(
            *log.lock(),
            vec![EventType::AvailabilityChange, EventType::ContextClosed]
        );
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[test]
    fn test_close_inactive_context_is_silent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = context();
        context.add_application_listener(recording(&log));

        context.close().unwrap();
        assert!(log.lock().is_empty());
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[test]
    fn test_registry_is_exposed_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = recording(&log);
        let second = recording(&log);
        let context = context();
        context.add_application_listener(Arc::clone(&first));
        context.add_application_listener(Arc::clone(&second));
        context.add_application_listener(Arc::clone(&first));

        let listeners = context.application_listeners().unwrap();
        assert_eq!(listeners.len(), 2);
        assert!(Arc::ptr_eq(&listeners[0], &first));
        assert!(Arc::ptr_eq(&listeners[1], &second));
    }
}

//! Event Multicaster
//!
//! Synchronous fan-out of a lifecycle event to an ordered list of listeners.

use crate::error::{LifecastError, Result};
use crate::event::LifecycleEvent;
use crate::listener::{ApplicationListener, same_listener};
use std::sync::Arc;

/// Strategy applied when a listener returns an error during dispatch.
///
/// Returning `Err` aborts the remaining dispatch; returning `Ok` moves on to the
/// next listener.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(
        &self,
        listener: &str,
        event: &LifecycleEvent,
        error: anyhow::Error,
    ) -> Result<()>;
}

/// Converts the listener's error into [`LifecastError::ListenerFailed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagatingErrorHandler;

impl ErrorHandler for PropagatingErrorHandler {
    fn handle_error(
        &self,
        listener: &str,
        event: &LifecycleEvent,
        error: anyhow::Error,
    ) -> Result<()> {
        Err(LifecastError::listener_failed(
            listener,
            event.event_type(),
            error,
        ))
    }
}

/// Logs the listener's error as a warning and lets dispatch continue.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(
        &self,
        listener: &str,
        event: &LifecycleEvent,
        error: anyhow::Error,
    ) -> Result<()> {
        tracing::warn!(
            listener,
            event = %event.event_type(),
            "Error calling application listener: {:#}",
            error
        );
        Ok(())
    }
}

/// Holds an ordered, deduplicated list of listeners and dispatches events to them.
///
/// # Example
///
/// ```rust,ignore
/// use lifecast::multicaster::{EventMulticaster, LoggingErrorHandler};
///
/// let mut multicaster = EventMulticaster::new();
/// multicaster.add_listener(Arc::new(LoggingListener));
/// multicaster.set_error_handler(Arc::new(LoggingErrorHandler));
/// multicaster.multicast_event(&event)?;
/// ```
pub struct EventMulticaster {
    listeners: Vec<Arc<dyn ApplicationListener>>,
    error_handler: Arc<dyn ErrorHandler>,
}

impl Default for EventMulticaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventMulticaster {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            error_handler: Arc::clone(&self.error_handler),
        }
    }
}

impl EventMulticaster {
    /// Create an empty multicaster that propagates listener errors
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            error_handler: Arc::new(PropagatingErrorHandler),
        }
    }

    /// Create a multicaster seeded with `listeners`, keeping the first occurrence of duplicates
    pub fn with_listeners<I>(listeners: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ApplicationListener>>,
    {
        let mut multicaster = Self::new();
        for listener in listeners {
            multicaster.add_listener(listener);
        }
        multicaster
    }

    /// Append a listener. Returns `false` if it was already registered.
    pub fn add_listener(&mut self, listener: Arc<dyn ApplicationListener>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    pub fn contains(&self, listener: &Arc<dyn ApplicationListener>) -> bool {
        self.listeners.iter().any(|l| same_listener(l, listener))
    }

    pub fn listeners(&self) -> &[Arc<dyn ApplicationListener>] {
        &self.listeners
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Replace the error handling strategy
    pub fn set_error_handler(&mut self, handler: Arc<dyn ErrorHandler>) {
        self.error_handler = handler;
    }

    /// Listeners that support `event`, in registration order
    pub fn listeners_for(&self, event: &LifecycleEvent) -> Vec<Arc<dyn ApplicationListener>> {
        self.listeners
            .iter()
            .filter(|l| l.supports(event))
            .cloned()
            .collect()
    }

    /// Deliver `event` to every supporting listener in registration order.
    ///
    /// Listener errors go through the error handler; an `Err` from the handler
    /// stops delivery and is returned.
    pub fn multicast_event(&self, event: &LifecycleEvent) -> Result<()> {
        for listener in self.listeners_for(event) {
            tracing::trace!("Dispatching {} to {}", event.event_type(), listener.name());
            if let Err(e) = listener.on_event(event) {
                self.error_handler
                    .handle_error(listener.name(), event, e)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::context::{ApplicationContext, ContextRef};
    use crate::event::EventType;
    use crate::listener::listener_fn;
    use parking_lot::Mutex;

    fn closed_event() -> LifecycleEvent {
        let context: ContextRef =
            Arc::new(ApplicationContext::new("multicaster", Environment::new()));
        LifecycleEvent::context_closed(context)
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    ) -> Arc<dyn ApplicationListener> {
        let log = Arc::clone(log);
        listener_fn(name, EventType::ALL, move |_| {
            log.lock().push(name);
            if fail {
                anyhow::bail!("{name} refused the event");
            }
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let multicaster = EventMulticaster::with_listeners([
            recorder("first", &log, false),
            recorder("second", &log, false),
            recorder("third", &log, false),
        ]);

        multicaster.multicast_event(&closed_event()).unwrap();
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder("only", &log, false);

        let mut multicaster = EventMulticaster::new();
        assert!(multicaster.add_listener(Arc::clone(&listener)));
        assert!(!multicaster.add_listener(Arc::clone(&listener)));
        assert_eq!(multicaster.len(), 1);

        multicaster.multicast_event(&closed_event()).unwrap();
        assert_eq!(*log.lock(), vec!["only"]);
    }

    #[test]
    fn test_unsupported_events_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&log);
        let starting_only = listener_fn("starting-only", &[EventType::Starting], move |_| {
            inner.lock().push("starting-only");
            Ok(())
        });
        let multicaster = EventMulticaster::with_listeners([starting_only]);

        let event = closed_event();
        assert!(multicaster.listeners_for(&event).is_empty());
        multicaster.multicast_event(&event).unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_default_handler_aborts_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let multicaster = EventMulticaster::with_listeners([
            recorder("failing", &log, true),
            recorder("never-reached", &log, false),
        ]);

        let err = multicaster.multicast_event(&closed_event()).unwrap_err();
        match err {
            LifecastError::ListenerFailed {
                listener,
                event_type,
                ..
            } => {
                assert_eq!(listener, "failing");
                assert_eq!(event_type, EventType::ContextClosed);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*log.lock(), vec!["failing"]);
    }

    #[test]
    fn test_logging_handler_isolates_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut multicaster = EventMulticaster::with_listeners([
            recorder("failing", &log, true),
            recorder("still-called", &log, false),
        ]);
        multicaster.set_error_handler(Arc::new(LoggingErrorHandler));

        multicaster.multicast_event(&closed_event()).unwrap();
        assert_eq!(*log.lock(), vec!["failing", "still-called"]);
    }
}

//! Observer capabilities
//!
//! An observer declares which events it accepts through a static descriptor
//! ([`ApplicationListener::supported_events`] and
//! [`ApplicationListener::supported_payloads`]). Dispatchers query the descriptor
//! and skip unsupported events silently.
//!
//! # Example
//!
//! ```rust,ignore
//! use lifecast::prelude::*;
//!
//! struct BannerPrinter;
//!
//! #[listener(events(starting, failed))]
//! impl ApplicationListener for BannerPrinter {
//!     fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
//!         tracing::info!("{} phase reached", event.event_type());
//!         Ok(())
//!     }
//! }
//! ```

mod logging;

pub use logging::LoggingListener;

use crate::context::ContextRef;
use crate::event::{EventType, LifecycleEvent, PayloadType};
use std::sync::Arc;

/// Result returned by observer callbacks.
pub type ListenerResult = anyhow::Result<()>;

/// A component registered to receive lifecycle events.
pub trait ApplicationListener: Send + Sync {
    /// Handle an event this listener supports.
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult;

    /// Event types this listener accepts. Defaults to every type.
    fn supported_events(&self) -> &'static [EventType] {
        EventType::ALL
    }

    /// Payload types this listener accepts, for events that carry one.
    /// `None` accepts any payload.
    fn supported_payloads(&self) -> Option<&'static [PayloadType]> {
        None
    }

    /// Whether this listener should receive `event`.
    fn supports(&self, event: &LifecycleEvent) -> bool {
        if !self.supported_events().contains(&event.event_type()) {
            return false;
        }
        match (event.payload_type(), self.supported_payloads()) {
            (Some(payload), Some(accepted)) => accepted.contains(&payload),
            _ => true,
        }
    }

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The context-aware capability, if this listener has it.
    fn as_context_aware(&self) -> Option<&dyn ContextAware> {
        None
    }
}

/// Listeners that want a handle to the execution context once it is loaded.
pub trait ContextAware: Send + Sync {
    fn set_application_context(&self, context: ContextRef);
}

/// Identity comparison for shared listeners.
pub(crate) fn same_listener(
    a: &Arc<dyn ApplicationListener>,
    b: &Arc<dyn ApplicationListener>,
) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A listener backed by a closure.
pub struct FnListener<F> {
    name: String,
    events: &'static [EventType],
    handler: F,
}

impl<F> ApplicationListener for FnListener<F>
where
    F: Fn(&LifecycleEvent) -> ListenerResult + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        (self.handler)(event)
    }

    fn supported_events(&self) -> &'static [EventType] {
        self.events
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Create a shared listener from a closure.
///
/// ```rust,ignore
/// let listener = listener_fn("ready-hook", &[EventType::Ready], |_| {
///     tracing::info!("ready");
///     Ok(())
/// });
/// ```
pub fn listener_fn<F>(
    name: impl Into<String>,
    events: &'static [EventType],
    handler: F,
) -> Arc<dyn ApplicationListener>
where
    F: Fn(&LifecycleEvent) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(FnListener {
        name: name.into(),
        events,
        handler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::context::ApplicationContext;
    use crate::event::availability::{LivenessState, ReadinessState};

    struct LivenessOnly;

    impl ApplicationListener for LivenessOnly {
        fn on_event(&self, _event: &LifecycleEvent) -> ListenerResult {
            Ok(())
        }

        fn supported_events(&self) -> &'static [EventType] {
            &[EventType::AvailabilityChange]
        }

        fn supported_payloads(&self) -> Option<&'static [PayloadType]> {
            Some(&[PayloadType::Liveness])
        }
    }

    fn context() -> ContextRef {
        Arc::new(ApplicationContext::new("listener", Environment::new()))
    }

    #[test]
    fn test_supports_filters_by_payload_type() {
        let listener = LivenessOnly;
        let context = context();
        let liveness =
            LifecycleEvent::availability_change(Arc::clone(&context), LivenessState::Correct.into());
        let readiness = LifecycleEvent::availability_change(
            Arc::clone(&context),
            ReadinessState::AcceptingTraffic.into(),
        );
        let closed = LifecycleEvent::context_closed(context);

        assert!(listener.supports(&liveness));
        assert!(!listener.supports(&readiness));
        assert!(!listener.supports(&closed));
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(LivenessOnly.name().ends_with("LivenessOnly"));
        assert!(LivenessOnly.as_context_aware().is_none());
    }

    #[test]
    fn test_listener_fn_uses_declared_events() {
        let listener = listener_fn("closed-only", &[EventType::ContextClosed], |_| Ok(()));
        let context = context();

        assert_eq!(listener.name(), "closed-only");
        assert!(listener.supports(&LifecycleEvent::context_closed(Arc::clone(&context))));
        assert!(!listener.supports(&LifecycleEvent::availability_change(
            context,
            LivenessState::Broken.into()
        )));
    }

    #[test]
    fn test_same_listener_compares_allocation() {
        let a = listener_fn("a", EventType::ALL, |_| Ok(()));
        let b = listener_fn("a", EventType::ALL, |_| Ok(()));
        assert!(same_listener(&a, &Arc::clone(&a)));
        assert!(!same_listener(&a, &b));
    }
}

//! Event-publishing run listener
//!
//! Turns each phase of the run into a [`LifecycleEvent`] and delivers it to the
//! application's listeners.
//!
//! Up to and including `context_loaded` the context's own registry cannot be
//! trusted yet, so events go through an internal [`EventMulticaster`] seeded
//! with the application's listeners. `context_loaded` hands every listener over
//! to the context; `started` and `running` then publish through the context.

use super::{Application, RunListener};
use crate::bootstrap::BootstrapContext;
use crate::config::Environment;
use crate::context::ContextRef;
use crate::error::Result;
use crate::event::availability::{LivenessState, ReadinessState, publish_availability};
use crate::event::{EventSource, LifecycleEvent};
use crate::listener::ApplicationListener;
use crate::multicaster::{EventMulticaster, LoggingErrorHandler};
use std::sync::Arc;
use std::time::Duration;

/// Broadcasts lifecycle events to the application's listeners.
pub struct EventPublishingRunListener {
    application: Arc<Application>,
    args: Arc<[String]>,
    initial_multicaster: EventMulticaster,
}

impl EventPublishingRunListener {
    pub fn new(application: Arc<Application>, args: Arc<[String]>) -> Self {
        let initial_multicaster =
            EventMulticaster::with_listeners(application.listeners().iter().cloned());
        Self {
            application,
            args,
            initial_multicaster,
        }
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    /// The dispatcher used before the context registry takes over.
    pub fn initial_multicaster(&self) -> &EventMulticaster {
        &self.initial_multicaster
    }

    fn source(&self) -> EventSource {
        EventSource::new(Arc::clone(&self.application), Arc::clone(&self.args))
    }

    fn initial_listeners(&self) -> &[Arc<dyn ApplicationListener>] {
        self.application.listeners()
    }
}

impl RunListener for EventPublishingRunListener {
    fn order(&self) -> i32 {
        0
    }

    fn starting(&mut self, bootstrap: &Arc<BootstrapContext>) -> Result<()> {
        self.initial_multicaster
            .multicast_event(&LifecycleEvent::starting(self.source(), Arc::clone(bootstrap)))
    }

    fn environment_prepared(
        &mut self,
        bootstrap: &Arc<BootstrapContext>,
        environment: &Environment,
    ) -> Result<()> {
        self.initial_multicaster
            .multicast_event(&LifecycleEvent::environment_prepared(
                self.source(),
                Arc::clone(bootstrap),
                environment.clone(),
            ))
    }

    fn context_prepared(&mut self, context: &ContextRef) -> Result<()> {
        self.initial_multicaster
            .multicast_event(&LifecycleEvent::context_initialized(
                self.source(),
                Arc::clone(context),
            ))
    }

    fn context_loaded(&mut self, context: &ContextRef) -> Result<()> {
        for listener in self.initial_listeners() {
            if let Some(aware) = listener.as_context_aware() {
                aware.set_application_context(Arc::clone(context));
            }
            context.add_application_listener(Arc::clone(listener));
        }
        tracing::debug!(
            "Handed {} listeners over to {}",
            self.initial_listeners().len(),
            context.id()
        );
        self.initial_multicaster
            .multicast_event(&LifecycleEvent::prepared(self.source(), Arc::clone(context)))
    }

    fn started(&mut self, context: &ContextRef, time_taken: Duration) -> Result<()> {
        context.publish_event(LifecycleEvent::started(
            self.source(),
            Arc::clone(context),
            Some(time_taken),
        ))?;
        publish_availability(context, LivenessState::Correct)
    }

    fn running(&mut self, context: &ContextRef, time_taken: Duration) -> Result<()> {
        context.publish_event(LifecycleEvent::ready(
            self.source(),
            Arc::clone(context),
            Some(time_taken),
        ))?;
        publish_availability(context, ReadinessState::AcceptingTraffic)
    }

    fn failed(&mut self, context: Option<&ContextRef>, cause: &Arc<anyhow::Error>) -> Result<()> {
        let event = LifecycleEvent::failed(self.source(), context.cloned(), Arc::clone(cause));

        if let Some(context) = context.filter(|c| c.is_active()) {
            // Every listener was registered with the context in `context_loaded`.
            return context.publish_event(event);
        }

        // An inactive context cannot dispatch; deliver to its listeners ourselves.
        if let Some(listeners) = context.and_then(|c| c.application_listeners()) {
            for listener in listeners {
                self.initial_multicaster.add_listener(listener);
            }
        }
        self.initial_multicaster
            .set_error_handler(Arc::new(LoggingErrorHandler));
        self.initial_multicaster.multicast_event(&event)
    }
}

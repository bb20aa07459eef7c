//! # Lifecast
//!
//! Staged lifecycle event broadcasting for application bootstrap sequences.
//!
//! An [`Application`] is run through a fixed sequence of phases. Each phase
//! is turned into a [`LifecycleEvent`] and delivered, synchronously and in
//! registration order, to every [`ApplicationListener`] that declares support
//! for it.
//!
//! ## Features
//!
//! - **Ordered fan-out**: listeners run in the order they were registered, exactly once per phase
//! - **Two-registry hand-off**: a bootstrap dispatcher serves the early phases, the
//!   execution context's own registry takes over once it is loaded
//! - **Declarative routing**: listeners declare supported events with `#[listener(...)]`
//! - **Isolated failure reporting**: a listener that fails while a startup failure is
//!   being reported cannot hide the original cause
//! - **Availability signals**: liveness and readiness changes published alongside the phases
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lifecast::prelude::*;
//!
//! // 1. Define a listener
//! struct StartupBanner;
//!
//! #[listener(events(starting, ready))]
//! impl ApplicationListener for StartupBanner {
//!     fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
//!         tracing::info!("Reached {}", event.event_type());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> lifecast::Result<()> {
//!     // 2. Configure the application
//!     let app = Application::builder()
//!         .name("inventory")
//!         .listener(Arc::new(StartupBanner))
//!         .listener(Arc::new(LoggingListener))
//!         .build();
//!
//!     // 3. Run it and wait for Ctrl+C / SIGTERM
//!     let running = app.run(std::env::args().skip(1))?;
//!     running.wait_for_shutdown().await
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod listener;
pub mod multicaster;

// Re-export core types
pub use bootstrap::BootstrapContext;
pub use config::Environment;
pub use context::{ApplicationContext, ContextRef, ExecutionContext};
pub use error::{LifecastError, Result};
pub use event::{EventType, LifecycleEvent, PayloadType};
pub use lifecycle::{Application, ApplicationBuilder, RunningApplication};
pub use listener::{ApplicationListener, ContextAware, ListenerResult};
pub use multicaster::EventMulticaster;

// Re-export macros
pub use lifecast_macro::listener;

/// Prelude module for convenient imports
///
/// ```
/// use lifecast::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bootstrap::BootstrapContext;
    pub use crate::config::Environment;
    pub use crate::context::{ApplicationContext, ContextRef, ContextState, ExecutionContext};
    pub use crate::error::{LifecastError, Result};
    pub use crate::event::availability::{
        ApplicationAvailability, AvailabilityState, LivenessState, ReadinessState,
        publish_availability,
    };
    pub use crate::event::{EventPayload, EventSource, EventType, LifecycleEvent, PayloadType};
    pub use crate::lifecycle::{
        Application, ApplicationBuilder, EventPublishingRunListener, RunListener, RunListeners,
        RunningApplication, shutdown_signal,
    };
    pub use crate::listener::{
        ApplicationListener, ContextAware, ListenerResult, LoggingListener, listener_fn,
    };
    pub use crate::multicaster::{
        ErrorHandler, EventMulticaster, LoggingErrorHandler, PropagatingErrorHandler,
    };
    pub use lifecast_macro::listener;
    pub use std::sync::Arc;
}

//! Lifecycle Module
//!
//! Drives an application through its bootstrap sequence and announces each
//! phase to the registered listeners.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. starting               ← internal dispatcher
//!    ↓
//! 2. environment_prepared   ← internal dispatcher
//!    ↓
//! 3. context_prepared       ← internal dispatcher
//!    ↓
//! 4. context_loaded         ← listeners handed over to the context
//!    ↓
//!    Context refresh
//!    ↓
//! 5. started                ← context registry (+ liveness CORRECT)
//!    ↓
//!    Runners
//!    ↓
//! 6. running                ← context registry (+ readiness ACCEPTING_TRAFFIC)
//!    ↓
//! [Running...]
//!    ↓
//!    Shutdown Signal (SIGTERM/SIGINT)
//!    ↓
//!    Context close          ← readiness REFUSING_TRAFFIC, context_closed
//!
//! Any failure after `starting`:
//!    failed                 ← context registry if active,
//!                             otherwise internal dispatcher with logged errors
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use lifecast::prelude::*;
//!
//! struct StartupAudit;
//!
//! #[listener(events(started, failed))]
//! impl ApplicationListener for StartupAudit {
//!     fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
//!         tracing::info!("Startup audit: {}", event.event_type());
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::builder()
//!     .name("billing")
//!     .listener(Arc::new(StartupAudit))
//!     .build();
//! let running = app.run(std::env::args().skip(1))?;
//! ```

mod application;
mod publishing;
mod run_listener;
mod shutdown;

pub use application::{
    Application, ApplicationBuilder, Initializer, RunListenerFactory, Runner, RunningApplication,
};
pub use publishing::EventPublishingRunListener;
pub use run_listener::{RunListener, RunListeners};
pub use shutdown::shutdown_signal;

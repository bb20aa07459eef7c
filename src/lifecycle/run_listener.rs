//! Run listeners
//!
//! The inbound contract between the run driver and whatever wants to observe the
//! bootstrap sequence.

use crate::bootstrap::BootstrapContext;
use crate::config::Environment;
use crate::context::ContextRef;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Receives the phase transitions of a single application run.
///
/// The run driver calls `starting`, `environment_prepared`, `context_prepared`,
/// `context_loaded`, `started` and `running` exactly once each, in that order.
/// `failed` is called instead of the remaining phases when the run aborts.
///
/// # Example
///
/// ```rust,ignore
/// use lifecast::lifecycle::RunListener;
///
/// struct StartupTimer;
///
/// impl RunListener for StartupTimer {
///     fn started(&mut self, _context: &ContextRef, time_taken: Duration) -> Result<()> {
///         tracing::info!("Context refreshed after {:?}", time_taken);
///         Ok(())
///     }
/// }
/// ```
pub trait RunListener: Send {
    /// Lower values run first.
    fn order(&self) -> i32 {
        0
    }

    fn starting(&mut self, _bootstrap: &Arc<BootstrapContext>) -> Result<()> {
        Ok(())
    }

    fn environment_prepared(
        &mut self,
        _bootstrap: &Arc<BootstrapContext>,
        _environment: &Environment,
    ) -> Result<()> {
        Ok(())
    }

    fn context_prepared(&mut self, _context: &ContextRef) -> Result<()> {
        Ok(())
    }

    fn context_loaded(&mut self, _context: &ContextRef) -> Result<()> {
        Ok(())
    }

    fn started(&mut self, _context: &ContextRef, _time_taken: Duration) -> Result<()> {
        Ok(())
    }

    fn running(&mut self, _context: &ContextRef, _time_taken: Duration) -> Result<()> {
        Ok(())
    }

    fn failed(&mut self, _context: Option<&ContextRef>, _cause: &Arc<anyhow::Error>) -> Result<()> {
        Ok(())
    }
}

/// The run listeners of one run, ordered by [`RunListener::order`].
///
/// Phases stop at the first listener error. `failed` reports every listener's
/// error and keeps going.
pub struct RunListeners {
    listeners: Vec<Box<dyn RunListener>>,
}

impl RunListeners {
    pub fn new(mut listeners: Vec<Box<dyn RunListener>>) -> Self {
        listeners.sort_by_key(|l| l.order());
        Self { listeners }
    }

    pub fn starting(&mut self, bootstrap: &Arc<BootstrapContext>) -> Result<()> {
        tracing::debug!("Run step: starting");
        for listener in &mut self.listeners {
            listener.starting(bootstrap)?;
        }
        Ok(())
    }

    pub fn environment_prepared(
        &mut self,
        bootstrap: &Arc<BootstrapContext>,
        environment: &Environment,
    ) -> Result<()> {
        tracing::debug!("Run step: environment prepared");
        for listener in &mut self.listeners {
            listener.environment_prepared(bootstrap, environment)?;
        }
        Ok(())
    }

    pub fn context_prepared(&mut self, context: &ContextRef) -> Result<()> {
        tracing::debug!("Run step: context prepared ({})", context.id());
        for listener in &mut self.listeners {
            listener.context_prepared(context)?;
        }
        Ok(())
    }

    pub fn context_loaded(&mut self, context: &ContextRef) -> Result<()> {
        tracing::debug!("Run step: context loaded ({})", context.id());
        for listener in &mut self.listeners {
            listener.context_loaded(context)?;
        }
        Ok(())
    }

    pub fn started(&mut self, context: &ContextRef, time_taken: Duration) -> Result<()> {
        tracing::debug!("Run step: started ({})", context.id());
        for listener in &mut self.listeners {
            listener.started(context, time_taken)?;
        }
        Ok(())
    }

    pub fn running(&mut self, context: &ContextRef, time_taken: Duration) -> Result<()> {
        tracing::debug!("Run step: running ({})", context.id());
        for listener in &mut self.listeners {
            listener.running(context, time_taken)?;
        }
        Ok(())
    }

    pub fn failed(&mut self, context: Option<&ContextRef>, cause: &Arc<anyhow::Error>) {
        tracing::debug!("Run step: failed");
        for listener in &mut self.listeners {
            if let Err(e) = listener.failed(context, cause) {
                // Keep going: the original cause is what matters.
                tracing::warn!("Error handling failed: {}", e);
            }
        }
    }
}

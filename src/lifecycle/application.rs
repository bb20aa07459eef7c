//! Application Bootstrap
//!
//! The owning process: holds the configured listeners and drives a run through
//! every lifecycle phase.

use super::{EventPublishingRunListener, RunListener, RunListeners, shutdown_signal};
use crate::bootstrap::BootstrapContext;
use crate::config::Environment;
use crate::context::{ApplicationContext, ContextRef, ExecutionContext, RefreshHook};
use crate::error::{LifecastError, Result};
use crate::listener::{ApplicationListener, same_listener};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Applied to the fresh context before `context_prepared`.
pub type Initializer = Arc<dyn Fn(&ApplicationContext) -> anyhow::Result<()> + Send + Sync>;

/// Runs once the context is refreshed, before the application reports ready.
pub type Runner =
    Arc<dyn Fn(&Arc<ApplicationContext>, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// Creates an additional run listener for each run.
pub type RunListenerFactory =
    Arc<dyn Fn(&Arc<Application>, &Arc<[String]>) -> Box<dyn RunListener> + Send + Sync>;

/// An application whose startup is announced to its listeners
///
/// # Example
///
/// ```rust,ignore
/// use lifecast::prelude::*;
///
/// #[tokio::main]
/// async fn main() {
///     let app = Application::builder()
///         .name("orders")
///         .listener(Arc::new(LoggingListener))
///         .refresh_hook(Arc::new(|ctx| connect_database(ctx.environment())))
///         .build();
///
///     let running = app.run(std::env::args().skip(1))
///         .expect("Failed to start application");
///
///     running.wait_for_shutdown().await.ok();
/// }
/// ```
pub struct Application {
    name: String,
    listeners: Vec<Arc<dyn ApplicationListener>>,
    initializers: Vec<Initializer>,
    refresh_hooks: Vec<RefreshHook>,
    runners: Vec<Runner>,
    run_listener_factories: Vec<RunListenerFactory>,
    log_startup_info: bool,
    load_process_env: bool,
}

impl Application {
    /// Create a new application builder
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured listeners, in registration order
    pub fn listeners(&self) -> &[Arc<dyn ApplicationListener>] {
        &self.listeners
    }

    /// Run the application through every lifecycle phase.
    ///
    /// A listener error during `starting` is returned as is. Any later failure is
    /// reported to the run listeners through `failed`, the context (if one was
    /// created) is closed and [`LifecastError::StartupFailed`] is returned.
    pub fn run<I, S>(self: &Arc<Self>, args: I) -> Result<RunningApplication>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let started_at = Instant::now();
        let args: Arc<[String]> = args.into_iter().map(Into::into).collect();
        let bootstrap = Arc::new(BootstrapContext::new());
        let mut listeners = self.run_listeners(&args);

        listeners.starting(&bootstrap)?;

        let mut context = None;
        match self.run_phases(&args, &bootstrap, &mut listeners, &mut context, started_at) {
            Ok(context) => Ok(RunningApplication {
                application: Arc::clone(self),
                context,
                args,
            }),
            Err(cause) => Err(self.handle_run_failure(context, &mut listeners, cause)),
        }
    }

    fn run_listeners(self: &Arc<Self>, args: &Arc<[String]>) -> RunListeners {
        let mut listeners: Vec<Box<dyn RunListener>> = vec![Box::new(
            EventPublishingRunListener::new(Arc::clone(self), Arc::clone(args)),
        )];
        for factory in &self.run_listener_factories {
            listeners.push(factory(self, args));
        }
        RunListeners::new(listeners)
    }

    fn run_phases(
        &self,
        args: &Arc<[String]>,
        bootstrap: &Arc<BootstrapContext>,
        listeners: &mut RunListeners,
        context_slot: &mut Option<Arc<ApplicationContext>>,
        started_at: Instant,
    ) -> anyhow::Result<Arc<ApplicationContext>> {
        let environment = self.prepare_environment(args);
        listeners.environment_prepared(bootstrap, &environment)?;
        if self.log_startup_info {
            tracing::info!("Starting {} with {} arguments", self.name, args.len());
        }

        let context = Arc::new(ApplicationContext::new(&self.name, environment));
        *context_slot = Some(Arc::clone(&context));
        let handle: ContextRef = Arc::clone(&context) as ContextRef;

        for initializer in &self.initializers {
            initializer(context.as_ref())?;
        }
        listeners.context_prepared(&handle)?;
        bootstrap.close();
        listeners.context_loaded(&handle)?;

        for hook in &self.refresh_hooks {
            context.add_refresh_hook(Arc::clone(hook));
        }
        context.refresh()?;

        let time_taken = started_at.elapsed();
        if self.log_startup_info {
            tracing::info!("Started {} in {:?}", self.name, time_taken);
        }
        listeners.started(&handle, time_taken)?;

        for runner in &self.runners {
            runner(&context, &args[..])?;
        }

        listeners.running(&handle, started_at.elapsed())?;
        Ok(context)
    }

    fn prepare_environment(&self, args: &[String]) -> Environment {
        let environment = if self.load_process_env {
            Environment::from_process_env()
        } else {
            Environment::new()
        };
        environment.apply_command_line_args(args);
        environment
    }

    fn handle_run_failure(
        &self,
        context: Option<Arc<ApplicationContext>>,
        listeners: &mut RunListeners,
        cause: anyhow::Error,
    ) -> LifecastError {
        let cause = Arc::new(cause);
        tracing::error!("Application run failed: {:#}", cause);

        let handle = context.as_ref().map(|c| Arc::clone(c) as ContextRef);
        listeners.failed(handle.as_ref(), &cause);

        if let Some(context) = &context {
            if let Err(e) = context.close() {
                tracing::warn!("Unable to close {}: {}", context.id(), e);
            }
        }

        LifecastError::StartupFailed {
            application: self.name.clone(),
            cause,
        }
    }
}

/// Handle to an application that finished its startup sequence
pub struct RunningApplication {
    application: Arc<Application>,
    context: Arc<ApplicationContext>,
    args: Arc<[String]>,
}

impl RunningApplication {
    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    pub fn context(&self) -> &Arc<ApplicationContext> {
        &self.context
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Close the context, announcing the shutdown to its listeners
    pub fn close(&self) -> Result<()> {
        tracing::info!("Shutting down {}...", self.application.name());
        self.context.close()?;
        tracing::info!("{} shutdown complete", self.application.name());
        Ok(())
    }

    /// Wait for `signal` to complete, then close the context
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.close()
    }

    /// Wait for Ctrl+C or SIGTERM, then close the context
    pub async fn wait_for_shutdown(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }
}

/// Builder for Application
pub struct ApplicationBuilder {
    name: String,
    listeners: Vec<Arc<dyn ApplicationListener>>,
    initializers: Vec<Initializer>,
    refresh_hooks: Vec<RefreshHook>,
    runners: Vec<Runner>,
    run_listener_factories: Vec<RunListenerFactory>,
    log_startup_info: bool,
    load_process_env: bool,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Create a new application builder
    pub fn new() -> Self {
        Self {
            name: "application".to_string(),
            listeners: Vec::new(),
            initializers: Vec::new(),
            refresh_hooks: Vec::new(),
            runners: Vec::new(),
            run_listener_factories: Vec::new(),
            log_startup_info: true,
            load_process_env: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a listener. Registering the same listener twice has no effect.
    pub fn listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        if !self.listeners.iter().any(|l| same_listener(l, &listener)) {
            self.listeners.push(listener);
        }
        self
    }

    pub fn initializer(mut self, initializer: Initializer) -> Self {
        self.initializers.push(initializer);
        self
    }

    pub fn refresh_hook(mut self, hook: RefreshHook) -> Self {
        self.refresh_hooks.push(hook);
        self
    }

    pub fn runner(mut self, runner: Runner) -> Self {
        self.runners.push(runner);
        self
    }

    pub fn run_listener(mut self, factory: RunListenerFactory) -> Self {
        self.run_listener_factories.push(factory);
        self
    }

    /// Log "Starting"/"Started" messages during the run
    pub fn log_startup_info(mut self, enabled: bool) -> Self {
        self.log_startup_info = enabled;
        self
    }

    /// Seed the environment with the process environment variables
    pub fn load_process_env(mut self, enabled: bool) -> Self {
        self.load_process_env = enabled;
        self
    }

    pub fn build(self) -> Arc<Application> {
        Arc::new(Application {
            name: self.name,
            listeners: self.listeners,
            initializers: self.initializers,
            refresh_hooks: self.refresh_hooks,
            runners: self.runners,
            run_listener_factories: self.run_listener_factories,
            log_startup_info: self.log_startup_info,
            load_process_env: self.load_process_env,
        })
    }
}

use lifecast::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prints a banner while the application boots.
struct StartupBanner;

#[listener(events(starting, ready))]
impl ApplicationListener for StartupBanner {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        match event.event_type() {
            EventType::Starting => tracing::info!("🚀 Booting sample app..."),
            _ => tracing::info!("✅ Sample app is ready"),
        }
        Ok(())
    }
}

/// Keeps a handle on the context and counts the events it observes there.
#[derive(Default)]
struct ContextWatcher {
    observed: AtomicUsize,
}

#[listener(events(prepared, started, ready, context_closed))]
impl ApplicationListener for ContextWatcher {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        let seen = self.observed.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Watcher saw {} ({} so far)", event.event_type(), seen);
        Ok(())
    }

    fn as_context_aware(&self) -> Option<&dyn ContextAware> {
        Some(self)
    }
}

impl ContextAware for ContextWatcher {
    fn set_application_context(&self, context: ContextRef) {
        tracing::info!("Watching context {}", context.id());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let availability = Arc::new(ApplicationAvailability::new());

    let app = Application::builder()
        .name("sample-app")
        .listener(Arc::new(StartupBanner))
        .listener(Arc::new(LoggingListener))
        .listener(Arc::new(ContextWatcher::default()))
        .listener(availability.clone())
        .refresh_hook(Arc::new(|ctx: &ApplicationContext| -> anyhow::Result<()> {
            let port = ctx.environment().get_or("server.port", "3000");
            tracing::info!("Binding to port {}", port);
            Ok(())
        }))
        .runner(Arc::new(
            |_: &Arc<ApplicationContext>, args: &[String]| -> anyhow::Result<()> {
                tracing::info!("Runner invoked with {:?}", args);
                Ok(())
            },
        ))
        .build();

    // 1. Run through every phase
    let running = app.run(std::env::args().skip(1))?;
    tracing::info!(
        "Liveness: {}, readiness: {}",
        availability.liveness_state(),
        availability.readiness_state()
    );

    // 2. Wait for Ctrl+C / SIGTERM
    tracing::info!("Press Ctrl+C to stop");
    running.wait_for_shutdown().await?;

    Ok(())
}

use lifecast::prelude::*;
use lifecast_testing::{EventLog, FailingListener, RecordingListener};
use parking_lot::Mutex;

fn quiet_builder(name: &str) -> ApplicationBuilder {
    Application::builder()
        .name(name)
        .log_startup_info(false)
        .load_process_env(false)
}

#[test]
fn test_full_run_announces_every_phase_in_order() {
    let log = EventLog::new();
    let app = quiet_builder("inventory")
        .listener(RecordingListener::new("all", &log))
        .build();

    let running = app.run(["--server.port=8080"]).unwrap();

    assert_eq!(
        log.events_for("all"),
        vec![
            EventType::Starting,
            EventType::EnvironmentPrepared,
            EventType::ContextInitialized,
            EventType::Prepared,
            EventType::Started,
            EventType::AvailabilityChange,
            EventType::Ready,
            EventType::AvailabilityChange,
        ]
    );
    assert_eq!(running.context().state(), ContextState::Active);
    assert_eq!(
        running.context().environment().get("server.port").as_deref(),
        Some("8080")
    );

    running.close().unwrap();
    let events = log.events_for("all");
    assert_eq!(
        &events[events.len() - 2..],
        &[EventType::AvailabilityChange, EventType::ContextClosed]
    );
}

#[test]
fn test_listeners_are_called_in_registration_order() {
    let log = EventLog::new();
    let app = quiet_builder("ordering")
        .listener(RecordingListener::new("first", &log))
        .listener(RecordingListener::new("second", &log))
        .listener(RecordingListener::new("third", &log))
        .build();

    app.run(Vec::<String>::new()).unwrap();

    for event_type in [EventType::Starting, EventType::Prepared, EventType::Ready] {
        assert_eq!(log.listeners_for(event_type), vec!["first", "second", "third"]);
    }
}

#[test]
fn test_failure_reaches_every_listener_even_when_one_fails() {
    let log = EventLog::new();
    let app = quiet_builder("orders")
        .listener(FailingListener::new(
            "a",
            &[EventType::Starting, EventType::Failed],
            &[EventType::Failed],
            &log,
        ))
        .listener(RecordingListener::new("b", &log))
        .initializer(Arc::new(|_: &ApplicationContext| -> anyhow::Result<()> {
            anyhow::bail!("database unreachable")
        }))
        .build();

    let err = app.run(Vec::<String>::new()).err().unwrap();

    match err {
        LifecastError::StartupFailed { application, cause } => {
            assert_eq!(application, "orders");
            assert!(cause.to_string().contains("database unreachable"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.events_for("a"), vec![EventType::Starting, EventType::Failed]);
    assert_eq!(
        log.events_for("b"),
        vec![
            EventType::Starting,
            EventType::EnvironmentPrepared,
            EventType::Failed,
        ]
    );
    assert_eq!(log.listeners_for(EventType::Failed), vec!["a", "b"]);
}

#[test]
fn test_refresh_failure_is_reported_once_per_listener() {
    let log = EventLog::new();
    let app = quiet_builder("catalog")
        .listener(RecordingListener::new("a", &log))
        .listener(RecordingListener::new("b", &log))
        .refresh_hook(Arc::new(|_: &ApplicationContext| -> anyhow::Result<()> {
            anyhow::bail!("schema mismatch")
        }))
        .build();

    assert!(app.run(Vec::<String>::new()).is_err());

    assert_eq!(log.count(EventType::Failed), 2);
    assert_eq!(log.listeners_for(EventType::Failed), vec!["a", "b"]);
    assert_eq!(log.count(EventType::Started), 0);
    assert_eq!(log.count(EventType::ContextClosed), 0);
}

#[test]
fn test_starting_failure_is_returned_without_failed_event() {
    let log = EventLog::new();
    let app = quiet_builder("billing")
        .listener(FailingListener::new(
            "strict",
            EventType::ALL,
            &[EventType::Starting],
            &log,
        ))
        .listener(RecordingListener::new("after", &log))
        .build();

    let err = app.run(Vec::<String>::new()).err().unwrap();

    assert!(matches!(err, LifecastError::ListenerFailed { .. }));
    assert_eq!(log.events_for("strict"), vec![EventType::Starting]);
    assert!(log.events_for("after").is_empty());
}

#[test]
fn test_listener_added_to_context_after_loading_receives_started() {
    let log = EventLog::new();
    let late = RecordingListener::new("late", &log);
    let late_for_hook = Arc::clone(&late);
    let app = quiet_builder("late-registration")
        .refresh_hook(Arc::new(move |ctx: &ApplicationContext| -> anyhow::Result<()> {
            ctx.add_application_listener(late_for_hook.clone());
            Ok(())
        }))
        .build();

    app.run(Vec::<String>::new()).unwrap();

    assert_eq!(
        log.events_for("late"),
        vec![
            EventType::Started,
            EventType::AvailabilityChange,
            EventType::Ready,
            EventType::AvailabilityChange,
        ]
    );
}

struct PhaseCounter {
    seen: Mutex<Vec<EventType>>,
}

#[listener(events(started, ready))]
impl ApplicationListener for PhaseCounter {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        self.seen.lock().push(event.event_type());
        Ok(())
    }
}

#[test]
fn test_declared_events_filter_delivery() {
    let counter = Arc::new(PhaseCounter {
        seen: Mutex::new(Vec::new()),
    });
    let app = quiet_builder("filtered").listener(counter.clone()).build();

    app.run(Vec::<String>::new()).unwrap();

    assert_eq!(
        *counter.seen.lock(),
        vec![EventType::Started, EventType::Ready]
    );
}

struct ContextTracker {
    context_id: Mutex<Option<String>>,
}

#[listener(events(prepared))]
impl ApplicationListener for ContextTracker {
    fn on_event(&self, _event: &LifecycleEvent) -> ListenerResult {
        Ok(())
    }

    fn as_context_aware(&self) -> Option<&dyn ContextAware> {
        Some(self)
    }
}

impl ContextAware for ContextTracker {
    fn set_application_context(&self, context: ContextRef) {
        *self.context_id.lock() = Some(context.id().to_string());
    }
}

#[test]
fn test_context_aware_listener_receives_context_on_load() {
    let tracker = Arc::new(ContextTracker {
        context_id: Mutex::new(None),
    });
    let app = quiet_builder("aware").listener(tracker.clone()).build();

    let running = app.run(Vec::<String>::new()).unwrap();

    assert_eq!(
        tracker.context_id.lock().as_deref(),
        Some(running.context().id())
    );
}

struct ConnectionPool {
    size: usize,
}

#[derive(Default)]
struct PoolConfigurer {
    bootstrap: Mutex<Option<Arc<BootstrapContext>>>,
    pool_size_seen: Mutex<Option<usize>>,
    closed_at_prepared: Mutex<Option<bool>>,
}

#[listener(events(starting, environment_prepared, prepared))]
impl ApplicationListener for PoolConfigurer {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        match event.event_type() {
            EventType::Starting => {
                if let Some(bootstrap) = event.bootstrap() {
                    bootstrap.register(ConnectionPool { size: 16 })?;
                    *self.bootstrap.lock() = Some(Arc::clone(bootstrap));
                }
            }
            EventType::EnvironmentPrepared => {
                if let Some(environment) = event.environment() {
                    environment.set("datasource.pool", "primary");
                }
                if let Some(bootstrap) = event.bootstrap() {
                    *self.pool_size_seen.lock() = Some(bootstrap.get::<ConnectionPool>()?.size);
                }
            }
            EventType::Prepared => {
                let closed = self.bootstrap.lock().as_ref().map(|b| b.is_closed());
                *self.closed_at_prepared.lock() = closed;
            }
            _ => {}
        }
        Ok(())
    }
}

#[test]
fn test_environment_and_bootstrap_flow_into_the_context() {
    let configurer = Arc::new(PoolConfigurer::default());
    let app = quiet_builder("pooled").listener(configurer.clone()).build();

    let running = app.run(Vec::<String>::new()).unwrap();

    assert_eq!(
        running.context().environment().get("datasource.pool").as_deref(),
        Some("primary")
    );
    assert_eq!(*configurer.pool_size_seen.lock(), Some(16));
    assert_eq!(*configurer.closed_at_prepared.lock(), Some(true));
}

//! Test helpers for lifecast applications
//!
//! Listeners that record what they receive into a shared [`EventLog`], so a
//! test can assert on delivery order across several observers.

use lifecast::event::{EventType, LifecycleEvent};
use lifecast::listener::{ApplicationListener, ListenerResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// One delivery: which listener saw which event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub listener: String,
    pub event_type: EventType,
}

/// Shared, ordered record of deliveries.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<Delivery>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, listener: &str, event_type: EventType) {
        self.entries.lock().push(Delivery {
            listener: listener.to_string(),
            event_type,
        });
    }

    pub fn entries(&self) -> Vec<Delivery> {
        self.entries.lock().clone()
    }

    /// Events seen by `listener`, in delivery order.
    pub fn events_for(&self, listener: &str) -> Vec<EventType> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.listener == listener)
            .map(|d| d.event_type)
            .collect()
    }

    /// Listeners that saw `event_type`, in delivery order.
    pub fn listeners_for(&self, event_type: EventType) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.event_type == event_type)
            .map(|d| d.listener.clone())
            .collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.event_type == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Records every supported event it receives.
pub struct RecordingListener {
    name: String,
    events: &'static [EventType],
    log: EventLog,
}

impl RecordingListener {
    /// A recorder accepting every event type.
    pub fn new(name: impl Into<String>, log: &EventLog) -> Arc<Self> {
        Self::for_events(name, EventType::ALL, log)
    }

    pub fn for_events(
        name: impl Into<String>,
        events: &'static [EventType],
        log: &EventLog,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            events,
            log: log.clone(),
        })
    }
}

impl ApplicationListener for RecordingListener {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        self.log.record(&self.name, event.event_type());
        Ok(())
    }

    fn supported_events(&self) -> &'static [EventType] {
        self.events
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Records like [`RecordingListener`], then fails on selected event types.
pub struct FailingListener {
    name: String,
    events: &'static [EventType],
    fail_on: &'static [EventType],
    log: EventLog,
}

impl FailingListener {
    pub fn new(
        name: impl Into<String>,
        events: &'static [EventType],
        fail_on: &'static [EventType],
        log: &EventLog,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            events,
            fail_on,
            log: log.clone(),
        })
    }
}

impl ApplicationListener for FailingListener {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        let event_type = event.event_type();
        self.log.record(&self.name, event_type);
        if self.fail_on.contains(&event_type) {
            anyhow::bail!("{} refused {}", self.name, event_type);
        }
        Ok(())
    }

    fn supported_events(&self) -> &'static [EventType] {
        self.events
    }

    fn name(&self) -> &str {
        &self.name
    }
}

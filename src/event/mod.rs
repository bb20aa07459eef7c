//! Lifecycle events
//!
//! Every phase of the bootstrap sequence is announced by a fresh [`LifecycleEvent`].
//! The event is a timestamped, immutable record whose [`EventPayload`] carries what the
//! phase knows about the application at that point:
//!
//! ```text
//! Starting              source, bootstrap context
//! EnvironmentPrepared   source, bootstrap context, environment
//! ContextInitialized    source, execution context (created, not populated)
//! Prepared              source, execution context (loaded, not refreshed)
//! Started               source, execution context, time taken
//! Ready                 source, execution context, time taken
//! Failed                source, execution context (if any), failure cause
//! AvailabilityChange    execution context, liveness or readiness state
//! ContextClosed         execution context
//! ```

pub mod availability;

use crate::bootstrap::BootstrapContext;
use crate::config::Environment;
use crate::context::{ContextRef, same_context};
use crate::lifecycle::Application;
use availability::AvailabilityState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strum_macros::{AsRefStr, Display, EnumIter};

/// The concrete type of a lifecycle event, used for routing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Starting,
    EnvironmentPrepared,
    ContextInitialized,
    Prepared,
    Started,
    Ready,
    Failed,
    AvailabilityChange,
    ContextClosed,
}

impl EventType {
    /// Every event type, in bootstrap order.
    pub const ALL: &'static [EventType] = &[
        EventType::Starting,
        EventType::EnvironmentPrepared,
        EventType::ContextInitialized,
        EventType::Prepared,
        EventType::Started,
        EventType::Ready,
        EventType::Failed,
        EventType::AvailabilityChange,
        EventType::ContextClosed,
    ];
}

/// Runtime type of a payload, for event types that carry more than one kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    Liveness,
    Readiness,
}

/// The process that emitted an event and the arguments it was run with.
#[derive(Clone)]
pub struct EventSource {
    application: Arc<Application>,
    args: Arc<[String]>,
}

impl EventSource {
    pub fn new(application: Arc<Application>, args: Arc<[String]>) -> Self {
        Self { application, args }
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl PartialEq for EventSource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.application, &other.application) && self.args == other.args
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("application", &self.application.name())
            .field("args", &self.args)
            .finish()
    }
}

/// Phase-specific content of a [`LifecycleEvent`].
#[derive(Clone)]
pub enum EventPayload {
    Starting {
        source: EventSource,
        bootstrap: Arc<BootstrapContext>,
    },
    EnvironmentPrepared {
        source: EventSource,
        bootstrap: Arc<BootstrapContext>,
        environment: Environment,
    },
    ContextInitialized {
        source: EventSource,
        context: ContextRef,
    },
    Prepared {
        source: EventSource,
        context: ContextRef,
    },
    Started {
        source: EventSource,
        context: ContextRef,
        time_taken: Option<Duration>,
    },
    Ready {
        source: EventSource,
        context: ContextRef,
        time_taken: Option<Duration>,
    },
    Failed {
        source: EventSource,
        context: Option<ContextRef>,
        cause: Arc<anyhow::Error>,
    },
    AvailabilityChange {
        context: ContextRef,
        state: AvailabilityState,
    },
    ContextClosed {
        context: ContextRef,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::Starting { .. } => EventType::Starting,
            EventPayload::EnvironmentPrepared { .. } => EventType::EnvironmentPrepared,
            EventPayload::ContextInitialized { .. } => EventType::ContextInitialized,
            EventPayload::Prepared { .. } => EventType::Prepared,
            EventPayload::Started { .. } => EventType::Started,
            EventPayload::Ready { .. } => EventType::Ready,
            EventPayload::Failed { .. } => EventType::Failed,
            EventPayload::AvailabilityChange { .. } => EventType::AvailabilityChange,
            EventPayload::ContextClosed { .. } => EventType::ContextClosed,
        }
    }
}

impl PartialEq for EventPayload {
    fn eq(&self, other: &Self) -> bool {
        use EventPayload::*;
        match (self, other) {
            (
                Starting { source: s1, bootstrap: b1 },
                Starting { source: s2, bootstrap: b2 },
            ) => s1 == s2 && Arc::ptr_eq(b1, b2),
            (
                EnvironmentPrepared {
                    source: s1,
                    bootstrap: b1,
                    environment: e1,
                },
                EnvironmentPrepared {
                    source: s2,
                    bootstrap: b2,
                    environment: e2,
                },
            ) => s1 == s2 && Arc::ptr_eq(b1, b2) && e1.same_snapshot(e2),
            (
                ContextInitialized { source: s1, context: c1 },
                ContextInitialized { source: s2, context: c2 },
            )
            | (Prepared { source: s1, context: c1 }, Prepared { source: s2, context: c2 }) => {
                s1 == s2 && same_context(c1, c2)
            }
            (
                Started {
                    source: s1,
                    context: c1,
                    time_taken: t1,
                },
                Started {
                    source: s2,
                    context: c2,
                    time_taken: t2,
                },
            )
            | (
                Ready {
                    source: s1,
                    context: c1,
                    time_taken: t1,
                },
                Ready {
                    source: s2,
                    context: c2,
                    time_taken: t2,
                },
            ) => s1 == s2 && same_context(c1, c2) && t1 == t2,
            (
                Failed {
                    source: s1,
                    context: c1,
                    cause: e1,
                },
                Failed {
                    source: s2,
                    context: c2,
                    cause: e2,
                },
            ) => {
                let contexts_match = match (c1, c2) {
                    (Some(c1), Some(c2)) => same_context(c1, c2),
                    (None, None) => true,
                    _ => false,
                };
                s1 == s2 && contexts_match && Arc::ptr_eq(e1, e2)
            }
            (
                AvailabilityChange { context: c1, state: a1 },
                AvailabilityChange { context: c2, state: a2 },
            ) => same_context(c1, c2) && a1 == a2,
            (ContextClosed { context: c1 }, ContextClosed { context: c2 }) => {
                same_context(c1, c2)
            }
            _ => false,
        }
    }
}

/// An immutable lifecycle event.
///
/// Two events are equal when they carry the same phase, source and payload; the
/// creation timestamp is not compared.
#[derive(Clone)]
pub struct LifecycleEvent {
    timestamp: DateTime<Utc>,
    payload: EventPayload,
}

impl LifecycleEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn starting(source: EventSource, bootstrap: Arc<BootstrapContext>) -> Self {
        Self::new(EventPayload::Starting { source, bootstrap })
    }

    pub fn environment_prepared(
        source: EventSource,
        bootstrap: Arc<BootstrapContext>,
        environment: Environment,
    ) -> Self {
        Self::new(EventPayload::EnvironmentPrepared {
            source,
            bootstrap,
            environment,
        })
    }

    pub fn context_initialized(source: EventSource, context: ContextRef) -> Self {
        Self::new(EventPayload::ContextInitialized { source, context })
    }

    pub fn prepared(source: EventSource, context: ContextRef) -> Self {
        Self::new(EventPayload::Prepared { source, context })
    }

    pub fn started(source: EventSource, context: ContextRef, time_taken: Option<Duration>) -> Self {
        Self::new(EventPayload::Started {
            source,
            context,
            time_taken,
        })
    }

    pub fn ready(source: EventSource, context: ContextRef, time_taken: Option<Duration>) -> Self {
        Self::new(EventPayload::Ready {
            source,
            context,
            time_taken,
        })
    }

    pub fn failed(
        source: EventSource,
        context: Option<ContextRef>,
        cause: Arc<anyhow::Error>,
    ) -> Self {
        Self::new(EventPayload::Failed {
            source,
            context,
            cause,
        })
    }

    pub fn availability_change(context: ContextRef, state: AvailabilityState) -> Self {
        Self::new(EventPayload::AvailabilityChange { context, state })
    }

    pub fn context_closed(context: ContextRef) -> Self {
        Self::new(EventPayload::ContextClosed { context })
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// The payload's runtime type, for event types that have more than one.
    pub fn payload_type(&self) -> Option<PayloadType> {
        match &self.payload {
            EventPayload::AvailabilityChange { state, .. } => Some(state.payload_type()),
            _ => None,
        }
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> Option<&EventSource> {
        match &self.payload {
            EventPayload::Starting { source, .. }
            | EventPayload::EnvironmentPrepared { source, .. }
            | EventPayload::ContextInitialized { source, .. }
            | EventPayload::Prepared { source, .. }
            | EventPayload::Started { source, .. }
            | EventPayload::Ready { source, .. }
            | EventPayload::Failed { source, .. } => Some(source),
            EventPayload::AvailabilityChange { .. } | EventPayload::ContextClosed { .. } => None,
        }
    }

    pub fn context(&self) -> Option<&ContextRef> {
        match &self.payload {
            EventPayload::ContextInitialized { context, .. }
            | EventPayload::Prepared { context, .. }
            | EventPayload::Started { context, .. }
            | EventPayload::Ready { context, .. }
            | EventPayload::AvailabilityChange { context, .. }
            | EventPayload::ContextClosed { context } => Some(context),
            EventPayload::Failed { context, .. } => context.as_ref(),
            EventPayload::Starting { .. } | EventPayload::EnvironmentPrepared { .. } => None,
        }
    }

    pub fn bootstrap(&self) -> Option<&Arc<BootstrapContext>> {
        match &self.payload {
            EventPayload::Starting { bootstrap, .. }
            | EventPayload::EnvironmentPrepared { bootstrap, .. } => Some(bootstrap),
            _ => None,
        }
    }

    pub fn environment(&self) -> Option<&Environment> {
        match &self.payload {
            EventPayload::EnvironmentPrepared { environment, .. } => Some(environment),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&Arc<anyhow::Error>> {
        match &self.payload {
            EventPayload::Failed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn availability(&self) -> Option<AvailabilityState> {
        match &self.payload {
            EventPayload::AvailabilityChange { state, .. } => Some(*state),
            _ => None,
        }
    }

    pub fn time_taken(&self) -> Option<Duration> {
        match &self.payload {
            EventPayload::Started { time_taken, .. } | EventPayload::Ready { time_taken, .. } => {
                *time_taken
            }
            _ => None,
        }
    }

    /// A flat, serializable view of this event for structured logging.
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            event_type: self.event_type(),
            timestamp: self.timestamp,
            application: self.source().map(|s| s.application().name().to_string()),
            args: self
                .source()
                .map(|s| s.args().to_vec())
                .unwrap_or_default(),
            context: self.context().map(|c| c.id().to_string()),
            availability: self.availability().map(|a| a.to_string()),
            time_taken_ms: self.time_taken().map(|d| d.as_millis()),
            cause: self.cause().map(|c| format!("{c:#}")),
        }
    }
}

impl PartialEq for LifecycleEvent {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("event_type", &self.event_type())
            .field("timestamp", &self.timestamp)
            .field("source", &self.source())
            .field("context", &self.context().map(|c| c.id().to_string()))
            .field("availability", &self.availability())
            .finish()
    }
}

/// Serializable summary of a [`LifecycleEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_taken_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

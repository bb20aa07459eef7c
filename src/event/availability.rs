//! Availability signals
//!
//! A side channel next to the main lifecycle stream: once the execution context
//! exists, liveness and readiness changes are published through it as
//! [`EventType::AvailabilityChange`] events.

use super::{EventType, LifecycleEvent, PayloadType};
use crate::context::ContextRef;
use crate::error::Result;
use crate::listener::{ApplicationListener, ListenerResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display};

/// Whether the application's internal state is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LivenessState {
    Correct,
    Broken,
}

/// Whether the application is willing to receive traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    AcceptingTraffic,
    RefusingTraffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum AvailabilityState {
    Liveness(LivenessState),
    Readiness(ReadinessState),
}

impl fmt::Display for AvailabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityState::Liveness(state) => write!(f, "liveness={state}"),
            AvailabilityState::Readiness(state) => write!(f, "readiness={state}"),
        }
    }
}

impl AvailabilityState {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            AvailabilityState::Liveness(_) => PayloadType::Liveness,
            AvailabilityState::Readiness(_) => PayloadType::Readiness,
        }
    }
}

impl From<LivenessState> for AvailabilityState {
    fn from(state: LivenessState) -> Self {
        AvailabilityState::Liveness(state)
    }
}

impl From<ReadinessState> for AvailabilityState {
    fn from(state: ReadinessState) -> Self {
        AvailabilityState::Readiness(state)
    }
}

/// Publish an availability change through the context's own registry.
pub fn publish_availability(
    context: &ContextRef,
    state: impl Into<AvailabilityState>,
) -> Result<()> {
    let state = state.into();
    tracing::debug!("Publishing availability change {} on {}", state, context.id());
    context.publish_event(LifecycleEvent::availability_change(
        Arc::clone(context),
        state,
    ))
}

/// Tracks the most recent liveness and readiness states.
///
/// Before any change is observed the application is reported as broken and
/// refusing traffic.
#[derive(Debug)]
pub struct ApplicationAvailability {
    liveness: RwLock<LivenessState>,
    readiness: RwLock<ReadinessState>,
}

impl Default for ApplicationAvailability {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationAvailability {
    pub fn new() -> Self {
        Self {
            liveness: RwLock::new(LivenessState::Broken),
            readiness: RwLock::new(ReadinessState::RefusingTraffic),
        }
    }

    pub fn liveness_state(&self) -> LivenessState {
        *self.liveness.read()
    }

    pub fn readiness_state(&self) -> ReadinessState {
        *self.readiness.read()
    }
}

impl ApplicationListener for ApplicationAvailability {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        match event.availability() {
            Some(AvailabilityState::Liveness(state)) => *self.liveness.write() = state,
            Some(AvailabilityState::Readiness(state)) => *self.readiness.write() = state,
            None => {}
        }
        Ok(())
    }

    fn supported_events(&self) -> &'static [EventType] {
        &[EventType::AvailabilityChange]
    }

    fn name(&self) -> &str {
        "ApplicationAvailability"
    }
}

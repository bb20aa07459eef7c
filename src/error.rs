use crate::event::EventType;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecastError>;

#[derive(Debug, Error)]
pub enum LifecastError {
    #[error("Listener '{listener}' failed while handling {event_type}")]
    ListenerFailed {
        listener: String,
        event_type: EventType,
        #[source]
        source: anyhow::Error,
    },

    #[error("Event registry of context '{context}' is not ready; the context has not been refreshed")]
    EventRegistryNotReady { context: String },

    #[error("Cannot {operation} context '{context}' in state {state}")]
    InvalidContextState {
        context: String,
        state: String,
        operation: &'static str,
    },

    #[error("Refresh of context '{context}' failed")]
    RefreshFailed {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Bootstrap context is closed; cannot register {type_name}")]
    BootstrapClosed { type_name: String },

    #[error("Component not found: {type_name}")]
    ComponentNotFound { type_name: String },

    #[error("Application '{application}' failed to start: {cause:#}")]
    StartupFailed {
        application: String,
        cause: Arc<anyhow::Error>,
    },
}

impl LifecastError {
    /// Wrap an observer error raised while handling an event of `event_type`.
    pub fn listener_failed(
        listener: impl Into<String>,
        event_type: EventType,
        source: anyhow::Error,
    ) -> Self {
        Self::ListenerFailed {
            listener: listener.into(),
            event_type,
            source,
        }
    }
}

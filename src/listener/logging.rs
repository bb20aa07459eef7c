use crate::event::{EventType, LifecycleEvent};
use crate::listener::{ApplicationListener, ListenerResult};

/// A listener that logs every lifecycle event as a JSON summary
///
/// Milestones (`started`, `ready`, `failed`) are logged at `info`, everything
/// else at `debug`.
#[derive(Clone, Default)]
pub struct LoggingListener;

impl ApplicationListener for LoggingListener {
    fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
        let summary = serde_json::to_string(&event.summary())?;

        match event.event_type() {
            EventType::Started | EventType::Ready | EventType::Failed => {
                tracing::info!(event = %summary, "Lifecycle event: {}", event.event_type());
            }
            _ => {
                tracing::debug!(event = %summary, "Lifecycle event: {}", event.event_type());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LoggingListener"
    }
}

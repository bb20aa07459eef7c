use proc_macro::TokenStream;

mod listener;

/// Attribute macro declaring which lifecycle events a listener accepts
///
/// Placed on an `impl ApplicationListener for ...` block, it generates the
/// `supported_events` (and, with `payloads(...)`, `supported_payloads`) methods.
/// Event names may be written in snake_case or as the `EventType` variant.
///
/// # Example
/// ```ignore
/// use lifecast::prelude::*;
///
/// struct ReadinessProbe;
///
/// #[listener(events(availability_change, context_closed), payloads(readiness))]
/// impl ApplicationListener for ReadinessProbe {
///     fn on_event(&self, event: &LifecycleEvent) -> ListenerResult {
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn listener(attr: TokenStream, item: TokenStream) -> TokenStream {
    listener::listener_attribute(attr, item)
}

//! Host port - attach 先の抽象化

use std::sync::Arc;

use super::EventSink;

/// A host object the barrier can be attached to.
///
/// Event forwarding is capability-checked: hosts that cannot emit events
/// keep the default `None` and forwarding is skipped without error. A host
/// still observes a latched failure through the delegate's `ready()`, even
/// without an event sink.
pub trait Host: Send + Sync + 'static {
    fn event_sink(&self) -> Option<Arc<dyn EventSink>> {
        None
    }
}
